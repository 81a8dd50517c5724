//! 协议数据类型定义

use crate::protocol::constants::{Exchange, KlineType};
use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// 价格类型，单位为厘（1元 = 1000厘）
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub i64);

impl Price {
    pub const ZERO: Price = Price(0);

    pub fn from_yuan(yuan: f64) -> Self {
        Price((yuan * 1000.0).round() as i64)
    }

    pub fn to_yuan(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl Add for Price {
    type Output = Price;

    fn add(self, rhs: Price) -> Price {
        Price(self.0 + rhs.0)
    }
}

impl AddAssign for Price {
    fn add_assign(&mut self, rhs: Price) {
        self.0 += rhs.0;
    }
}

impl Sub for Price {
    type Output = Price;

    fn sub(self, rhs: Price) -> Price {
        Price(self.0 - rhs.0)
    }
}

impl fmt::Debug for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.to_yuan())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}元", self.to_yuan())
    }
}

/// 价格档位
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub buy: bool,
    pub price: Price,
    pub number: i64, // 手
}

impl fmt::Debug for PriceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = if self.buy { "买" } else { "卖" };
        write!(f, "{}:{:.2}x{}", side, self.price.to_yuan(), self.number)
    }
}

/// 5档价格档位
pub type PriceLevels = [PriceLevel; 5];

/// 行情中的价格块
#[derive(Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct K {
    pub last: Price,  // 昨收
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price, // 现价
}

impl fmt::Debug for K {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "K{{昨收:{:.2} 开:{:.2} 高:{:.2} 低:{:.2} 收:{:.2}}}",
            self.last.to_yuan(),
            self.open.to_yuan(),
            self.high.to_yuan(),
            self.low.to_yuan(),
            self.close.to_yuan()
        )
    }
}

/// K线
///
/// `last` 是列表中上一条的收盘价，首条为 0。
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub last: Price,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: i64,      // 成交量（手）
    pub amount: Price,    // 成交额（厘）
    pub time: NaiveDateTime,
    pub up_count: i32,    // 上涨家数（指数有效）
    pub down_count: i32,  // 下跌家数（指数有效）
}

impl Kline {
    /// 涨跌额，没有昨收时用开盘价代替
    pub fn rise_price(&self) -> Price {
        if self.last.0 == 0 {
            self.close - self.open
        } else {
            self.close - self.last
        }
    }

    /// 涨跌幅（%）
    pub fn rise_rate(&self) -> f64 {
        let base = if self.last.0 == 0 { self.open } else { self.last };
        if base.0 == 0 {
            return 0.0;
        }
        self.rise_price().0 as f64 / base.0 as f64 * 100.0
    }

    /// 振幅（最高-最低）
    pub fn max_difference(&self) -> Price {
        self.high - self.low
    }

    pub fn time_str(&self) -> String {
        self.time.format(DATETIME_FMT).to_string()
    }
}

impl fmt::Debug for Kline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} 昨收:{:.2} 开:{:.2} 高:{:.2} 低:{:.2} 收:{:.2} 量:{} 额:{:.0}",
            self.time_str(),
            self.last.to_yuan(),
            self.open.to_yuan(),
            self.high.to_yuan(),
            self.low.to_yuan(),
            self.close.to_yuan(),
            self.volume,
            self.amount.to_yuan()
        )?;
        if self.up_count > 0 || self.down_count > 0 {
            write!(f, " 涨:{}/跌:{}", self.up_count, self.down_count)?;
        }
        Ok(())
    }
}

/// 分时数据项
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceNumber {
    pub time: NaiveTime,
    pub price: Price,
    pub number: i64, // 手
}

impl fmt::Debug for PriceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2} {}手", self.time.format("%H:%M"), self.price.to_yuan(), self.number)
    }
}

/// 成交方向
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    Buy = 0,
    Sell = 1,
    Neutral = 2, // 中性/汇总，盘中也可能出现
}

impl TradeStatus {
    pub fn from_wire(value: i64) -> Self {
        match value {
            0 => TradeStatus::Buy,
            1 => TradeStatus::Sell,
            _ => TradeStatus::Neutral,
        }
    }
}

impl fmt::Debug for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::Buy => write!(f, "买"),
            TradeStatus::Sell => write!(f, "卖"),
            TradeStatus::Neutral => write!(f, "中"),
        }
    }
}

/// 分时成交
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub time: NaiveDateTime, // 精确到分钟
    pub price: Price,
    pub volume: i64, // 手
    pub status: TradeStatus,
    pub number: Option<i64>, // 单数，历史成交没有
}

impl Trade {
    /// 成交额
    pub fn amount(&self) -> Price {
        Price(self.price.0 * self.volume * 100)
    }

    pub fn is_buy(&self) -> bool {
        self.status == TradeStatus::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.status == TradeStatus::Sell
    }
}

impl fmt::Debug for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.2} {}手 {:?}",
            self.time.format("%Y-%m-%d %H:%M"),
            self.price.to_yuan(),
            self.volume,
            self.status
        )?;
        if let Some(number) = self.number {
            write!(f, " 单数:{}", number)?;
        }
        Ok(())
    }
}

/// 证券代码信息
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct StockCode {
    pub name: String,
    pub code: String,
    pub multiple: u16,   // 每手股数，基本是100
    pub decimal: i8,     // 小数位，基本是2
    pub last_price: f64, // 昨收（元，对指数有效）
}

impl fmt::Debug for StockCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} 倍数:{} 小数:{}", self.code, self.name, self.multiple, self.decimal)?;
        if self.last_price > 0.0 {
            write!(f, " 昨收:{:.2}", self.last_price)?;
        }
        Ok(())
    }
}

/// 五档行情
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteInfo {
    pub exchange: Exchange,
    pub code: String,
    pub active1: u16,
    pub k: K,
    pub server_time: i64,
    pub total_hand: i64, // 总手
    pub intuition: i64,  // 现量
    pub amount: f64,     // 金额（元）
    pub inside_dish: i64,
    pub outer_disc: i64,
    pub buy_level: PriceLevels,
    pub sell_level: PriceLevels,
    pub rate: f64, // 涨速
    pub active2: u16,
}

impl QuoteInfo {
    pub fn full_code(&self) -> String {
        format!("{}{}", self.exchange.as_str(), self.code)
    }
}

impl fmt::Debug for QuoteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let change = self.k.close - self.k.last;
        let change_pct = if self.k.last.0 != 0 {
            change.0 as f64 / self.k.last.0 as f64 * 100.0
        } else {
            0.0
        };
        write!(
            f,
            "{} 现价:{:.2} 涨跌:{:+.2}({:+.2}%) 量:{}手 额:{:.0}万 {:?}",
            self.full_code(),
            self.k.close.to_yuan(),
            change.to_yuan(),
            change_pct,
            self.total_hand,
            self.amount / 10000.0,
            self.k
        )?;
        let (buy1, sell1) = (&self.buy_level[0], &self.sell_level[0]);
        if buy1.number > 0 || sell1.number > 0 {
            write!(f, " {:?} {:?}", buy1, sell1)?;
        }
        Ok(())
    }
}

/// 集合竞价数据项
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CallAuction {
    pub time: NaiveTime,
    pub price: Price,
    pub matched: i64,
    pub unmatched: i64,
    pub flag: i8, // 1 未匹配量为买单，-1 为卖单
}

impl fmt::Debug for CallAuction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = if self.flag > 0 { "买" } else { "卖" };
        write!(
            f,
            "{} {:.2} 匹配:{} 未匹配:{}{}",
            self.time.format("%H:%M:%S"),
            self.price.to_yuan(),
            self.matched,
            self.unmatched,
            side
        )
    }
}

/// 股本变迁记录的4个字段，含义由类别决定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GbbqDetail {
    /// 类别1：除权除息
    Xrxd {
        dividend: f64,     // 每10股分红（元）
        rights_price: f64, // 配股价
        bonus: f64,        // 每10股送转股
        rights: f64,       // 每10股配股
    },
    /// 类别11/12：扩缩股
    Shrink { ratio: f64 },
    /// 类别13/14：权证
    Warrant { strike_price: f64, ratio: f64 },
    /// 类别2~10：股本变化（单位：股）
    Shares {
        pre_float: f64,
        pre_total: f64,
        post_float: f64,
        post_total: f64,
    },
    /// 未知类别，保留原始16字节
    Unknown { raw: [u8; 16] },
}

/// 股本变迁/除权除息记录
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Gbbq {
    pub code: String, // 带交易所前缀
    pub time: NaiveDateTime, // 当日15:00
    pub category: u8,
    pub detail: GbbqDetail,
}

impl Gbbq {
    pub fn category_name(&self) -> &'static str {
        match self.category {
            1 => "除权除息",
            2 => "送配股上市",
            3 => "非流通股上市",
            4 => "未知股本变动",
            5 => "股本变化",
            6 => "增发新股",
            7 => "股份回购",
            8 => "增发新股上市",
            9 => "转配股上市",
            10 => "可转债上市",
            11 => "扩缩股",
            12 => "非流通股缩股",
            13 => "送认购权证",
            14 => "送认沽权证",
            _ => "未知",
        }
    }

    /// 是否为股本变化
    pub fn is_equity(&self) -> bool {
        matches!(self.category, 2 | 3 | 5 | 7 | 8 | 9 | 10)
    }

    /// 是否为除权除息
    pub fn is_xrxd(&self) -> bool {
        self.category == 1
    }
}

impl fmt::Debug for Gbbq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ",
            self.time.format("%Y-%m-%d"),
            self.code,
            self.category_name()
        )?;
        match &self.detail {
            GbbqDetail::Xrxd { dividend, rights_price, bonus, rights } => write!(
                f,
                "分红:{:.2} 配股价:{:.2} 送转股:{:.2} 配股:{:.2}",
                dividend, rights_price, bonus, rights
            ),
            GbbqDetail::Shrink { ratio } => write!(f, "缩股:{:.2}", ratio),
            GbbqDetail::Warrant { strike_price, ratio } => {
                write!(f, "行权价:{:.2} 份数:{:.2}", strike_price, ratio)
            }
            GbbqDetail::Shares { pre_float, pre_total, post_float, post_total } => write!(
                f,
                "前流通:{:.0} 前总股本:{:.0} 后流通:{:.0} 后总股本:{:.0}",
                pre_float, pre_total, post_float, post_total
            ),
            GbbqDetail::Unknown { raw } => write!(f, "原始:{}", hex::encode(raw)),
        }
    }
}

/// 写一个带上限的列表 Debug
fn fmt_list<T: fmt::Debug>(f: &mut fmt::Formatter<'_>, title: &str, count: u16, list: &[T]) -> fmt::Result {
    writeln!(f, "{}({}):", title, count)?;
    for (i, item) in list.iter().take(10).enumerate() {
        writeln!(f, "  {:>3}. {:?}", i + 1, item)?;
    }
    if list.len() > 10 {
        writeln!(f, "  ... 还有 {} 条", list.len() - 10)?;
    }
    Ok(())
}

/// K线响应
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KlineResponse {
    pub count: u16,
    pub list: Vec<Kline>,
}

impl fmt::Debug for KlineResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_list(f, "K线数据", self.count, &self.list)
    }
}

/// 分时数据响应
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinuteResponse {
    pub count: u16,
    pub list: Vec<PriceNumber>,
}

impl fmt::Debug for MinuteResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_list(f, "分时数据", self.count, &self.list)
    }
}

/// 成交响应
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeResponse {
    pub count: u16,
    pub list: Vec<Trade>,
}

impl fmt::Debug for TradeResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_list(f, "成交数据", self.count, &self.list)
    }
}

/// 集合竞价响应
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallAuctionResponse {
    pub count: u16,
    pub list: Vec<CallAuction>,
}

impl fmt::Debug for CallAuctionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_list(f, "集合竞价数据", self.count, &self.list)
    }
}

/// 股本变迁响应
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GbbqResponse {
    pub count: u16,
    pub list: Vec<Gbbq>,
}

impl fmt::Debug for GbbqResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_list(f, "股本变迁数据", self.count, &self.list)
    }
}

/// 证券代码列表响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeResponse {
    pub count: u16,
    pub codes: Vec<StockCode>,
}

/// K线解码上下文
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KlineCache {
    pub kline_type: KlineType,
    pub is_index: bool,
}

impl fmt::Debug for KlineCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_index { "指数" } else { "股票" };
        write!(f, "{}K线({})", self.kline_type.name(), kind)
    }
}

/// 成交解码上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeCache {
    pub date: chrono::NaiveDate,
    pub code: String,
}
