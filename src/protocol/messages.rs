//! 各种消息类型的请求构造与响应解码
//!
//! 解码函数的输入是去掉帧头、已解压的数据域。所有价格累加状态都是解码循环内的局部变量，
//! 每次调用从0开始，解码函数可以在多线程中并发调用。

use crate::protocol::{
    codec::{decode_code, encode_code, gbk_to_utf8, price_divisor, u16_to_bytes_le, u32_to_bytes_le, MessageError, Reader},
    constants::{Exchange, KlineType, MessageType, MAX_KLINE_PAGE},
    frame::{RequestFrame, ResponseFrame},
    types::{
        CallAuction, CallAuctionResponse, CodeResponse, Gbbq, GbbqDetail, GbbqResponse, Kline, KlineCache,
        KlineResponse, MinuteResponse, Price, PriceLevel, PriceNumber, QuoteInfo, StockCode, Trade, TradeCache,
        TradeResponse, TradeStatus, K,
    },
};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, warn};

/// 连接消息
pub struct Connect;

impl Connect {
    pub fn request(msg_id: u32) -> RequestFrame {
        RequestFrame::new(msg_id, MessageType::Connect, vec![0x01])
    }

    /// 前68字节含义未知，之后是 GBK 编码的服务器信息
    pub fn decode_response(data: &[u8]) -> Result<String, MessageError> {
        let mut r = Reader::new(data);
        r.skip(68)?;
        Ok(gbk_to_utf8(r.rest()))
    }
}

/// 心跳消息
pub struct Heartbeat;

impl Heartbeat {
    pub fn request(msg_id: u32) -> RequestFrame {
        RequestFrame::new(msg_id, MessageType::Heart, vec![])
    }
}

/// 证券数量
pub struct Count;

impl Count {
    pub fn request(msg_id: u32, exchange: Exchange) -> RequestFrame {
        let data = vec![exchange.as_u8(), 0x00, 0x75, 0xC7, 0x33, 0x01];
        RequestFrame::new(msg_id, MessageType::Count, data)
    }

    pub fn decode_response(data: &[u8]) -> Result<u16, MessageError> {
        Reader::new(data).u16_le()
    }
}

/// 证券代码列表（每页最多1000条）
pub struct Code;

impl Code {
    const ENTRY_LEN: usize = 29;

    pub fn request(msg_id: u32, exchange: Exchange, start: u16) -> RequestFrame {
        let mut data = vec![exchange.as_u8(), 0x00];
        data.extend_from_slice(&u16_to_bytes_le(start));
        RequestFrame::new(msg_id, MessageType::Code, data)
    }

    /// 每条29字节：代码(6) 每手(2) 名称(8) 未知(4) 小数位(1) 昨收(4) 未知(4)
    pub fn decode_response(data: &[u8]) -> Result<CodeResponse, MessageError> {
        let mut r = Reader::new(data);
        let count = r.u16_le()?;
        let mut codes = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let entry = r.take(Self::ENTRY_LEN)?;
            let mut e = Reader::new(entry);
            let code = String::from_utf8_lossy(e.take(6)?).to_string();
            let multiple = e.u16_le()?;
            let name = gbk_to_utf8(e.take(8)?);
            e.skip(4)?;
            let decimal = e.u8()? as i8;
            let last_price = e.volume()?;

            codes.push(StockCode {
                name,
                code,
                multiple,
                decimal,
                last_price,
            });
        }

        ensure_consumed(&r, "证券代码", count)?;
        Ok(CodeResponse { count, codes })
    }
}

/// 五档行情
pub struct Quote;

impl Quote {
    pub fn request<S: AsRef<str>>(msg_id: u32, codes: &[S]) -> Result<RequestFrame, MessageError> {
        let mut data = vec![0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        data.extend_from_slice(&u16_to_bytes_le(codes.len() as u16));

        for code in codes {
            let (exchange, number) = decode_code(code.as_ref())?;
            data.push(exchange.as_u8());
            data.extend_from_slice(number.as_bytes());
        }

        Ok(RequestFrame::new(msg_id, MessageType::Quote, data))
    }

    /// 解码行情响应
    ///
    /// 前2字节未知，之后是数量。买卖价是相对本条现价的差值（分），不跨档累加。
    pub fn decode_response(data: &[u8]) -> Result<Vec<QuoteInfo>, MessageError> {
        let mut r = Reader::new(data);
        r.skip(2)?;
        let count = r.u16_le()?;
        let mut quotes = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let exchange_val = r.u8()?;
            let exchange = Exchange::from_u8(exchange_val)
                .ok_or_else(|| MessageError::Decode(format!("无效的交易所: {}", exchange_val)))?;
            let code = gbk_to_utf8(r.take(6)?);
            let active1 = r.u16_le()?;

            let k = decode_k(&mut r)?;

            let server_time = r.varint()?;
            let _reversed1 = r.varint()?;
            let total_hand = r.varint()?;
            let intuition = r.varint()?;
            let amount = r.volume()?;
            let inside_dish = r.varint()?;
            let outer_disc = r.varint()?;
            let _reversed2 = r.varint()?;
            let _reversed3 = r.varint()?;

            let mut buy_level = [PriceLevel { buy: true, price: Price::ZERO, number: 0 }; 5];
            let mut sell_level = [PriceLevel { buy: false, price: Price::ZERO, number: 0 }; 5];
            for i in 0..5 {
                buy_level[i].price = Price(r.price()?.0 * 10) + k.close;
                sell_level[i].price = Price(r.price()?.0 * 10) + k.close;
                buy_level[i].number = r.varint()?;
                sell_level[i].number = r.varint()?;
            }

            r.skip(2)?;
            for _ in 0..4 {
                r.varint()?;
            }
            let rate = r.u16_le()? as f64 / 100.0;
            let active2 = r.u16_le()?;

            quotes.push(QuoteInfo {
                exchange,
                code,
                active1,
                k,
                server_time,
                total_hand,
                intuition,
                amount,
                inside_dish,
                outer_disc,
                buy_level,
                sell_level,
                rate,
                active2,
            });
        }

        if r.remaining() > 0 {
            debug!("行情响应尾部剩余 {} 字节", r.remaining());
        }

        Ok(quotes)
    }
}

/// 解码行情里的价格块：现价、昨收/开/高/低相对现价的差值（分）
fn decode_k(r: &mut Reader<'_>) -> Result<K, MessageError> {
    let close = Price(r.price()?.0 * 10);
    let last = close + Price(r.price()?.0 * 10);
    let open = close + Price(r.price()?.0 * 10);
    let high = close + Price(r.price()?.0 * 10);
    let low = close + Price(r.price()?.0 * 10);
    Ok(K {
        last,
        open,
        high,
        low,
        close,
    })
}

// ==================== K线 ====================

/// K线消息
pub struct KlineMsg;

impl KlineMsg {
    /// 单次最多800条
    pub fn request(
        msg_id: u32,
        kline_type: KlineType,
        code: &str,
        start: u16,
        count: u16,
    ) -> Result<RequestFrame, MessageError> {
        if count > MAX_KLINE_PAGE {
            return Err(MessageError::Decode(format!("单次数量不能超过{}", MAX_KLINE_PAGE)));
        }

        let (exchange, number) = decode_code(code)?;

        let mut data = vec![exchange.as_u8(), 0x00];
        data.extend_from_slice(number.as_bytes());
        data.push(kline_type.as_u8());
        data.push(0x00);
        data.extend_from_slice(&[0x01, 0x00]);
        data.extend_from_slice(&u16_to_bytes_le(start));
        data.extend_from_slice(&u16_to_bytes_le(count));
        data.extend_from_slice(&[0u8; 10]);

        Ok(RequestFrame::new(msg_id, MessageType::Kline, data))
    }

    /// 解码K线响应
    ///
    /// 开盘价是相对上一条收盘价的差值，收/高/低是相对本条开盘价的差值。
    pub fn decode_response(data: &[u8], cache: KlineCache) -> Result<KlineResponse, MessageError> {
        let mut r = Reader::new(data);
        let count = r.u16_le()?;
        let mut list = Vec::with_capacity(count as usize);
        let mut last = Price::ZERO;

        for _ in 0..count {
            let (kline, close) = decode_kline(&mut r, cache, last)?;
            last = close;
            list.push(kline);
        }

        ensure_consumed(&r, "K线", count)?;
        Ok(KlineResponse { count, list })
    }
}

/// 解码一条K线，返回 (K线, 作为下一条基准的收盘价)
fn decode_kline(r: &mut Reader<'_>, cache: KlineCache, last: Price) -> Result<(Kline, Price), MessageError> {
    let time = decode_kline_time(r.u32_le()?, cache.kline_type)?;

    let open = last + r.price()?;
    let close = open + r.price()?;
    let high = open + r.price()?;
    let low = open + r.price()?;

    let raw_volume = r.volume()? as i64;
    let volume = match (cache.kline_type.scales_volume(), cache.is_index) {
        // 指数的 ÷100 与 ×100 抵消
        (true, true) => raw_volume,
        (true, false) => raw_volume / 100,
        (false, true) => raw_volume * 100,
        (false, false) => raw_volume,
    };

    // 元转为厘
    let amount = Price((r.volume()? * 1000.0) as i64);

    let (up_count, down_count) = if cache.is_index {
        (r.u16_le()? as i32, r.u16_le()? as i32)
    } else {
        (0, 0)
    };

    let kline = Kline {
        last,
        open,
        high,
        low,
        close,
        volume,
        amount,
        time,
        up_count,
        down_count,
    };
    Ok((kline, close))
}

/// 解码K线时间
///
/// 分钟级：低2字节为 `(年-2004)<<11 | 月*100+日`，高2字节为 `时*60+分`；
/// 日线及以上：`YYYYMMDD`，时间记为15:00。
pub fn decode_kline_time(word: u32, kline_type: KlineType) -> Result<NaiveDateTime, MessageError> {
    if kline_type.is_intraday() {
        let ymd = (word & 0xFFFF) as u16;
        let hm = (word >> 16) as u16;
        let year = (ymd >> 11) as i32 + 2004;
        let month = ((ymd % 2048) / 100) as u32;
        let day = ((ymd % 2048) % 100) as u32;
        let hour = (hm / 60) as u32;
        let minute = (hm % 60) as u32;
        date_time(year, month, day, hour, minute, 0)
    } else {
        yyyymmdd_close(word)
    }
}

/// `YYYYMMDD` 日期，时间记为收盘15:00
fn yyyymmdd_close(value: u32) -> Result<NaiveDateTime, MessageError> {
    let year = (value / 10000) as i32;
    let month = (value % 10000) / 100;
    let day = value % 100;
    date_time(year, month, day, 15, 0, 0)
}

fn date_time(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Result<NaiveDateTime, MessageError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .ok_or_else(|| {
            MessageError::Decode(format!(
                "无效的时间: {:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            ))
        })
}

/// 按数量解完记录后数据必须正好用完
fn ensure_consumed(r: &Reader<'_>, what: &str, count: u16) -> Result<(), MessageError> {
    match r.remaining() {
        0 => Ok(()),
        n => Err(MessageError::Decode(format!("{}数量 {} 与数据长度不符，多出 {} 字节", what, count, n))),
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// 修正午盘时段获取的分钟K线时间
///
/// 13:00~15:00 之间请求当天的分钟线时，上午最后一根会被标成13:00，实际应为11:30。
/// 只检查最近120条，并且只在最后一条K线也落在该时段时修正。
pub fn fix_kline_time(list: &mut [Kline], now: NaiveDateTime) {
    let (start, end) = (hm(13, 0), hm(15, 0));
    let in_session = |t: NaiveTime| t >= start && t <= end;

    let Some(last) = list.last() else {
        return;
    };
    if last.time.date() != now.date() || !in_session(last.time.time()) || !in_session(now.time()) {
        return;
    }

    let today = now.date();
    let from = list.len().saturating_sub(120);
    for k in &mut list[from..] {
        if k.time.date() == today && k.time.time() == start {
            debug!("修正K线时间 {} -> 11:30", k.time);
            k.time = today.and_time(hm(11, 30));
        }
    }
}

// ==================== 分时数据 ====================

/// 分时数据消息
pub struct MinuteMsg;

impl MinuteMsg {
    pub fn request(msg_id: u32, code: &str) -> Result<RequestFrame, MessageError> {
        let (exchange, number) = decode_code(code)?;

        let mut data = vec![exchange.as_u8(), 0x00];
        data.extend_from_slice(number.as_bytes());
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

        Ok(RequestFrame::new(msg_id, MessageType::Minute, data))
    }

    /// 数量(2) 未知(2) 之后为记录
    pub fn decode_response(data: &[u8]) -> Result<MinuteResponse, MessageError> {
        decode_minute(data, 2)
    }
}

/// 历史分时数据消息
pub struct HistoryMinuteMsg;

impl HistoryMinuteMsg {
    pub fn request(msg_id: u32, date: NaiveDate, code: &str) -> Result<RequestFrame, MessageError> {
        let (exchange, number) = decode_code(code)?;

        let mut data = u32_to_bytes_le(date_number(date)).to_vec();
        data.push(exchange.as_u8());
        data.extend_from_slice(number.as_bytes());

        Ok(RequestFrame::new(msg_id, MessageType::HistoryMinute, data))
    }

    /// 数量(2) 未知(4) 之后为记录
    pub fn decode_response(data: &[u8]) -> Result<MinuteResponse, MessageError> {
        decode_minute(data, 4)
    }
}

/// 日期转为 YYYYMMDD 数字
fn date_number(date: NaiveDate) -> u32 {
    date.year() as u32 * 10000 + date.month() * 100 + date.day()
}

/// 每天的分时点数：09:31~11:30、13:01~15:00
const MINUTE_POINTS: usize = 240;

/// 分时记录：价格差值(分)、未知差值、成交量；时间从09:31开始，第121条起从13:01开始
fn decode_minute(data: &[u8], skip: usize) -> Result<MinuteResponse, MessageError> {
    let mut r = Reader::new(data);
    let count = r.u16_le()?;
    if count as usize > MINUTE_POINTS {
        return Err(MessageError::Decode(format!("分时记录过多: {}", count)));
    }
    r.skip(skip)?;

    let mut list = Vec::with_capacity(count as usize);
    let mut last = Price::ZERO;

    for i in 0..count as u32 {
        last += r.price()?;
        let _unknown = r.price()?;
        let number = r.varint()?;

        let minutes = if i < 120 { 9 * 60 + 30 + i + 1 } else { 11 * 60 + i + 1 };
        let time = NaiveTime::from_num_seconds_from_midnight_opt(minutes * 60, 0)
            .ok_or_else(|| MessageError::Decode(format!("无效的分时时间: {}", minutes)))?;

        list.push(PriceNumber {
            time,
            price: Price(last.0 * 10),
            number,
        });
    }

    ensure_consumed(&r, "分时", count)?;
    Ok(MinuteResponse { count, list })
}

// ==================== 分时成交 ====================

/// 分时成交消息（单次最多1800条）
pub struct TradeMsg;

impl TradeMsg {
    pub fn request(msg_id: u32, code: &str, start: u16, count: u16) -> Result<RequestFrame, MessageError> {
        let (exchange, number) = decode_code(code)?;

        let mut data = vec![exchange.as_u8(), 0x00];
        data.extend_from_slice(number.as_bytes());
        data.extend_from_slice(&u16_to_bytes_le(start));
        data.extend_from_slice(&u16_to_bytes_le(count));

        Ok(RequestFrame::new(msg_id, MessageType::MinuteTrade, data))
    }

    /// 每条：时间(2) 价格差值 成交量 单数 方向 未知
    pub fn decode_response(data: &[u8], cache: &TradeCache) -> Result<TradeResponse, MessageError> {
        let mut r = Reader::new(data);
        let count = r.u16_le()?;
        decode_trades(&mut r, count, cache, true)
    }
}

/// 历史分时成交消息（单次最多2000条，比实时少了单数）
pub struct HistoryTradeMsg;

impl HistoryTradeMsg {
    pub fn request(
        msg_id: u32,
        date: NaiveDate,
        code: &str,
        start: u16,
        count: u16,
    ) -> Result<RequestFrame, MessageError> {
        let (exchange, number) = decode_code(code)?;

        let mut data = u32_to_bytes_le(date_number(date)).to_vec();
        data.push(exchange.as_u8());
        data.push(0x00);
        data.extend_from_slice(number.as_bytes());
        data.extend_from_slice(&u16_to_bytes_le(start));
        data.extend_from_slice(&u16_to_bytes_le(count));

        Ok(RequestFrame::new(msg_id, MessageType::HistoryMinuteTrade, data))
    }

    /// 数量(2) 未知(4)；每条：时间(2) 价格差值 成交量 方向 未知
    pub fn decode_response(data: &[u8], cache: &TradeCache) -> Result<TradeResponse, MessageError> {
        let mut r = Reader::new(data);
        let count = r.u16_le()?;
        r.skip(4)?;
        decode_trades(&mut r, count, cache, false)
    }
}

fn decode_trades(
    r: &mut Reader<'_>,
    count: u16,
    cache: &TradeCache,
    with_number: bool,
) -> Result<TradeResponse, MessageError> {
    let divisor = price_divisor(&cache.code);
    let mut list = Vec::with_capacity(count as usize);
    let mut last = Price::ZERO;

    for _ in 0..count {
        let minutes = r.u16_le()? as u32;
        let time = cache
            .date
            .and_hms_opt(minutes / 60, minutes % 60, 0)
            .ok_or_else(|| MessageError::Decode(format!("无效的成交时间: {}", minutes)))?;

        // 分转厘
        last += Price(r.price()?.0 * 10);
        let volume = r.varint()?;
        let number = if with_number { Some(r.varint()?) } else { None };
        let status = TradeStatus::from_wire(r.varint()?);
        // 固定为0的字段
        let _ = r.varint()?;

        list.push(Trade {
            time,
            price: Price(last.0 / divisor),
            volume,
            status,
            number,
        });
    }

    ensure_consumed(r, "分时成交", count)?;
    Ok(TradeResponse { count, list })
}

// ==================== 集合竞价 ====================

/// 集合竞价消息
pub struct CallAuctionMsg;

impl CallAuctionMsg {
    const ENTRY_LEN: usize = 16;

    pub fn request(msg_id: u32, code: &str) -> Result<RequestFrame, MessageError> {
        let (exchange, number) = decode_code(code)?;

        let mut data = vec![exchange.as_u8(), 0x00];
        data.extend_from_slice(number.as_bytes());
        data.extend_from_slice(&[
            0x00, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xf4,
            0x01, 0x00, 0x00,
        ]);

        Ok(RequestFrame::new(msg_id, MessageType::CallAuction, data))
    }

    /// 每条16字节：时分(2) 价格f32(4) 匹配量(4) 未匹配量i16(2) 未知(3) 秒(1)
    pub fn decode_response(data: &[u8]) -> Result<CallAuctionResponse, MessageError> {
        let mut r = Reader::new(data);
        let count = r.u16_le()?;
        let mut list = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let mut e = Reader::new(r.take(Self::ENTRY_LEN)?);
            let minutes = e.u16_le()? as u32;
            let price = Price::from_yuan(e.f32_le()? as f64);
            let matched = e.u32_le()? as i64;
            let unmatched_raw = e.i16_le()? as i64;
            e.skip(3)?;
            let second = e.u8()? as u32;

            let time = NaiveTime::from_hms_opt(minutes / 60, minutes % 60, second)
                .ok_or_else(|| MessageError::Decode(format!("无效的竞价时间: {} {}", minutes, second)))?;
            let flag = if unmatched_raw < 0 { -1 } else { 1 };

            list.push(CallAuction {
                time,
                price,
                matched,
                unmatched: unmatched_raw.abs(),
                flag,
            });
        }

        ensure_consumed(&r, "集合竞价", count)?;
        Ok(CallAuctionResponse { count, list })
    }
}

// ==================== 股本变迁 ====================

/// 股本变迁消息
pub struct GbbqMsg;

impl GbbqMsg {
    const HEADER_LEN: usize = 13;
    const FIELDS_LEN: usize = 16;

    pub fn request(msg_id: u32, code: &str) -> Result<RequestFrame, MessageError> {
        let (exchange, number) = decode_code(code)?;

        let mut data = vec![0x01, 0x00];
        data.push(exchange.as_u8());
        data.extend_from_slice(number.as_bytes());

        Ok(RequestFrame::new(msg_id, MessageType::Gbbq, data))
    }

    /// 前9字节未知，第9~10字节是数量；每条：交易所(1) 代码(6) 未知(1) 日期(4) 类别(1) 字段(16)
    pub fn decode_response(data: &[u8]) -> Result<GbbqResponse, MessageError> {
        let mut r = Reader::new(data);
        r.skip(9)?;
        let count = r.u16_le()?;
        let mut list = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let mut h = Reader::new(r.take(Self::HEADER_LEN)?);
            let exchange = h.u8()?;
            let code = encode_code(exchange, h.take(6)?)
                .map_err(|e| MessageError::Decode(format!("股本变迁代码错误: {}", e)))?;
            h.skip(1)?;
            let time = yyyymmdd_close(h.u32_le()?)?;
            let category = h.u8()?;

            // 不论类别都固定前进16字节
            let fields = r.take(Self::FIELDS_LEN)?;
            let detail = decode_gbbq_detail(category, fields)?;

            list.push(Gbbq {
                code,
                time,
                category,
                detail,
            });
        }

        ensure_consumed(&r, "股本变迁", count)?;
        Ok(GbbqResponse { count, list })
    }
}

/// 按类别解释16字节字段
pub fn decode_gbbq_detail(category: u8, fields: &[u8]) -> Result<GbbqDetail, MessageError> {
    let mut f = Reader::new(fields);
    let detail = match category {
        1 => GbbqDetail::Xrxd {
            dividend: f.f32_le()? as f64,
            rights_price: f.f32_le()? as f64,
            bonus: f.f32_le()? as f64,
            rights: f.f32_le()? as f64,
        },
        11 | 12 => {
            f.skip(8)?;
            GbbqDetail::Shrink {
                ratio: f.f32_le()? as f64,
            }
        }
        13 | 14 => {
            let strike_price = f.f32_le()? as f64;
            f.skip(4)?;
            GbbqDetail::Warrant {
                strike_price,
                ratio: f.f32_le()? as f64,
            }
        }
        2..=10 => GbbqDetail::Shares {
            pre_float: f.volume()? * 1e4,
            pre_total: f.volume()? * 1e4,
            post_float: f.volume()? * 1e4,
            post_total: f.volume()? * 1e4,
        },
        _ => {
            let raw: [u8; 16] = f
                .take(16)?
                .try_into()
                .map_err(|_| MessageError::Truncated)?;
            debug!("未知的股本变迁类别: {}", category);
            GbbqDetail::Unknown { raw }
        }
    };
    Ok(detail)
}

// ==================== 响应分发 ====================

/// 请求方期望的响应，携带解码所需的上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expect {
    Connect,
    Heartbeat,
    Count,
    Code,
    Quote,
    Minute,
    HistoryMinute,
    Kline(KlineCache),
    Trade(TradeCache),
    HistoryTrade(TradeCache),
    CallAuction,
    Gbbq,
}

impl Expect {
    pub fn message_type(&self) -> MessageType {
        match self {
            Expect::Connect => MessageType::Connect,
            Expect::Heartbeat => MessageType::Heart,
            Expect::Count => MessageType::Count,
            Expect::Code => MessageType::Code,
            Expect::Quote => MessageType::Quote,
            Expect::Minute => MessageType::Minute,
            Expect::HistoryMinute => MessageType::HistoryMinute,
            Expect::Kline(_) => MessageType::Kline,
            Expect::Trade(_) => MessageType::MinuteTrade,
            Expect::HistoryTrade(_) => MessageType::HistoryMinuteTrade,
            Expect::CallAuction => MessageType::CallAuction,
            Expect::Gbbq => MessageType::Gbbq,
        }
    }
}

/// 解码后的响应消息
#[derive(Debug, Clone)]
pub enum Message {
    Connect(String),
    Heartbeat,
    Count(u16),
    Code(CodeResponse),
    Quote(Vec<QuoteInfo>),
    Minute(MinuteResponse),
    Kline(KlineResponse),
    Trade(TradeResponse),
    CallAuction(CallAuctionResponse),
    Gbbq(GbbqResponse),
    /// 未知类型，原样交给调用方决定忽略或记录
    Unknown { msg_type: u16, data: Vec<u8> },
}

impl Message {
    pub fn name(&self) -> &'static str {
        match self {
            Message::Connect(_) => "连接",
            Message::Heartbeat => "心跳",
            Message::Count(_) => "证券数量",
            Message::Code(_) => "证券代码",
            Message::Quote(_) => "五档行情",
            Message::Minute(_) => "分时数据",
            Message::Kline(_) => "K线",
            Message::Trade(_) => "分时成交",
            Message::CallAuction(_) => "集合竞价",
            Message::Gbbq(_) => "股本变迁",
            Message::Unknown { .. } => "未知",
        }
    }
}

/// 按响应类型把数据域交给对应的解码函数
pub fn dispatch(frame: &ResponseFrame, expect: &Expect) -> Result<Message, MessageError> {
    let Some(msg_type) = frame.message_type() else {
        warn!("未知的消息类型: 0x{:04X} (msg_id={})", frame.msg_type, frame.msg_id);
        return Ok(Message::Unknown {
            msg_type: frame.msg_type,
            data: frame.data.clone(),
        });
    };

    if msg_type != expect.message_type() {
        return Err(MessageError::Decode(format!(
            "响应类型不符: 期望 {:?}, 得到 {:?}",
            expect.message_type(),
            msg_type
        )));
    }

    let data = frame.data();
    let message = match expect {
        Expect::Connect => Message::Connect(Connect::decode_response(data)?),
        Expect::Heartbeat => Message::Heartbeat,
        Expect::Count => Message::Count(Count::decode_response(data)?),
        Expect::Code => Message::Code(Code::decode_response(data)?),
        Expect::Quote => Message::Quote(Quote::decode_response(data)?),
        Expect::Minute => Message::Minute(MinuteMsg::decode_response(data)?),
        Expect::HistoryMinute => Message::Minute(HistoryMinuteMsg::decode_response(data)?),
        Expect::Kline(cache) => Message::Kline(KlineMsg::decode_response(data, *cache)?),
        Expect::Trade(cache) => Message::Trade(TradeMsg::decode_response(data, cache)?),
        Expect::HistoryTrade(cache) => Message::Trade(HistoryTradeMsg::decode_response(data, cache)?),
        Expect::CallAuction => Message::CallAuction(CallAuctionMsg::decode_response(data)?),
        Expect::Gbbq => Message::Gbbq(GbbqMsg::decode_response(data)?),
    };
    Ok(message)
}
