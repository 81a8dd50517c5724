//! TDX 客户端实现（异步）
//!
//! 写入端由互斥锁保护，读取端在后台任务中从字节流切出响应帧，按消息ID交给等待中的请求。
//! 同一连接上可以并发发起多个请求。

use crate::analysis::{adjust_klines, merge241, trades_to_klines, Adjust, GbbqBook};
use crate::config::{ClientConfig, ConfigError};
use crate::pending::PendingRequests;
use crate::protocol::*;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use log::{debug, info, warn};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time;

/// 客户端错误
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),
    #[error("协议错误: {0}")]
    Protocol(#[from] FrameError),
    #[error("消息错误: {0}")]
    Message(#[from] MessageError),
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    #[error("超时")]
    Timeout,
    #[error("连接已关闭")]
    Disconnected,
    #[error("响应类型不符: {0}")]
    UnexpectedResponse(&'static str),
}

/// 北京时间
pub fn beijing_now() -> NaiveDateTime {
    Utc::now().naive_utc() + chrono::Duration::hours(8)
}

/// TDX 客户端（异步）
pub struct Client {
    writer: Mutex<OwnedWriteHalf>,
    pending: Arc<PendingRequests>,
    closed: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    msg_id: AtomicU32,
    config: ClientConfig,
    banner: String,
}

impl Client {
    /// 连接到指定地址，没有端口时使用7709
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        let config = ClientConfig {
            addr: addr.to_string(),
            ..ClientConfig::default()
        };
        Self::connect_with(config).await
    }

    /// 按配置连接并完成握手
    pub async fn connect_with(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let addr = config.socket_addr();

        let stream = time::timeout(config.timeout(), TcpStream::connect(&addr))
            .await
            .map_err(|_| ClientError::Timeout)??;
        stream.set_nodelay(true)?;
        let (read_half, write_half) = stream.into_split();

        let pending = Arc::new(PendingRequests::new());
        let closed = Arc::new(AtomicBool::new(false));
        let reader = tokio::spawn(read_loop(read_half, pending.clone(), closed.clone()));

        let mut client = Self {
            writer: Mutex::new(write_half),
            pending,
            closed,
            reader,
            msg_id: AtomicU32::new(0),
            config,
            banner: String::new(),
        };

        let frame = Connect::request(client.next_msg_id());
        client.banner = match client.request(frame, Expect::Connect).await? {
            Message::Connect(banner) => banner,
            other => return Err(ClientError::UnexpectedResponse(other.name())),
        };
        info!("已连接 {}: {}", addr, client.banner.trim());

        Ok(client)
    }

    /// 握手时服务器返回的信息
    pub fn banner(&self) -> &str {
        &self.banner
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// 获取下一个消息ID
    fn next_msg_id(&self) -> u32 {
        self.msg_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 发送请求并等待解码后的响应
    ///
    /// 超时后登记项被移除，之后到达的响应会被读取任务丢弃。
    pub async fn request(&self, frame: RequestFrame, expect: Expect) -> Result<Message, ClientError> {
        if self.is_closed() {
            return Err(ClientError::Disconnected);
        }

        let msg_id = frame.msg_id;
        let rx = self.pending.register(msg_id, expect);
        let data = frame.encode();
        debug!("发送请求帧 msg_id={} ({} 字节): {}", msg_id, data.len(), hex::encode(&data));

        if let Err(e) = self.write_all(&data).await {
            self.pending.remove(msg_id);
            return Err(e);
        }

        match time::timeout(self.config.timeout(), rx).await {
            Ok(Ok(delivery)) => Ok(delivery?),
            Ok(Err(_)) => Err(ClientError::Disconnected),
            Err(_) => {
                self.pending.remove(msg_id);
                debug!("请求超时 msg_id={}", msg_id);
                Err(ClientError::Timeout)
            }
        }
    }

    async fn write_all(&self, data: &[u8]) -> Result<(), ClientError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(data).await?;
        writer.flush().await?;
        Ok(())
    }

    /// 发送心跳
    pub async fn heartbeat(&self) -> Result<(), ClientError> {
        let frame = Heartbeat::request(self.next_msg_id());
        match self.request(frame, Expect::Heartbeat).await? {
            Message::Heartbeat => Ok(()),
            other => Err(ClientError::UnexpectedResponse(other.name())),
        }
    }

    // ==================== 证券代码 ====================

    /// 获取证券数量
    pub async fn get_count(&self, exchange: Exchange) -> Result<u16, ClientError> {
        let frame = Count::request(self.next_msg_id(), exchange);
        match self.request(frame, Expect::Count).await? {
            Message::Count(count) => Ok(count),
            other => Err(ClientError::UnexpectedResponse(other.name())),
        }
    }

    /// 获取证券代码（每页最多1000条）
    pub async fn get_code(&self, exchange: Exchange, start: u16) -> Result<CodeResponse, ClientError> {
        let frame = Code::request(self.next_msg_id(), exchange, start);
        match self.request(frame, Expect::Code).await? {
            Message::Code(resp) => Ok(resp),
            other => Err(ClientError::UnexpectedResponse(other.name())),
        }
    }

    /// 获取交易所全部证券代码
    pub async fn get_code_all(&self, exchange: Exchange) -> Result<CodeResponse, ClientError> {
        let mut all = CodeResponse::default();
        let mut start = 0u16;

        loop {
            let resp = self.get_code(exchange, start).await?;
            all.count = all.count.saturating_add(resp.count);
            all.codes.extend(resp.codes);

            if resp.count < MAX_CODE_PAGE {
                break;
            }
            match start.checked_add(MAX_CODE_PAGE) {
                Some(next) => start = next,
                None => break,
            }
        }

        Ok(all)
    }

    // ==================== 行情 ====================

    /// 获取行情信息（五档报价）
    pub async fn get_quote<S: AsRef<str>>(&self, codes: &[S]) -> Result<Vec<QuoteInfo>, ClientError> {
        let codes: Vec<String> = codes.iter().map(|c| add_prefix(c.as_ref())).collect();
        let frame = Quote::request(self.next_msg_id(), &codes)?;
        match self.request(frame, Expect::Quote).await? {
            Message::Quote(quotes) => Ok(quotes),
            other => Err(ClientError::UnexpectedResponse(other.name())),
        }
    }

    // ==================== K线数据 ====================

    /// 获取K线数据（单次最多800条）
    ///
    /// 分钟级K线会修正午盘时段的时间。
    pub async fn get_kline(
        &self,
        kline_type: KlineType,
        code: &str,
        start: u16,
        count: u16,
    ) -> Result<KlineResponse, ClientError> {
        let code = add_prefix(code);
        let frame = KlineMsg::request(self.next_msg_id(), kline_type, &code, start, count)?;
        let cache = KlineCache {
            kline_type,
            is_index: is_index(&code),
        };

        let mut resp = match self.request(frame, Expect::Kline(cache)).await? {
            Message::Kline(resp) => resp,
            other => return Err(ClientError::UnexpectedResponse(other.name())),
        };
        if kline_type.is_intraday() {
            fix_kline_time(&mut resp.list, beijing_now());
        }
        Ok(resp)
    }

    /// 获取全部K线数据（分页拼接，按时间升序）
    pub async fn get_kline_all(&self, kline_type: KlineType, code: &str) -> Result<KlineResponse, ClientError> {
        self.get_kline_all_until(kline_type, code, |_| true).await
    }

    /// 分页获取K线，直到遇到 `keep` 返回 false 的K线为止（该K线及更早的丢弃）
    pub async fn get_kline_all_until<F>(
        &self,
        kline_type: KlineType,
        code: &str,
        keep: F,
    ) -> Result<KlineResponse, ClientError>
    where
        F: Fn(&Kline) -> bool,
    {
        let page = self.config.kline_page;
        let mut all = KlineResponse::default();
        let mut start = 0u16;

        loop {
            let resp = self.get_kline(kline_type, code, start, page).await?;
            let full_page = resp.count >= page;

            // 每页内按时间升序，更早的页在后面取到
            let mut list = resp.list;
            // 每页单独解码，页首的昨收为0，接到更早一页的收盘价上
            if let (Some(first), Some(older)) = (all.list.first_mut(), list.last()) {
                first.last = older.close;
            }
            let cut = list.iter().rposition(|k| !keep(k));
            if let Some(i) = cut {
                list.drain(..=i);
            }
            all.count = all.count.saturating_add(list.len() as u16);
            list.append(&mut all.list);
            all.list = list;

            if cut.is_some() || !full_page {
                break;
            }
            match start.checked_add(page) {
                Some(next) => start = next,
                None => break,
            }
        }

        Ok(all)
    }

    pub async fn get_kline_minute(&self, code: &str, start: u16, count: u16) -> Result<KlineResponse, ClientError> {
        self.get_kline(KlineType::Minute, code, start, count).await
    }

    pub async fn get_kline_5minute(&self, code: &str, start: u16, count: u16) -> Result<KlineResponse, ClientError> {
        self.get_kline(KlineType::Minute5, code, start, count).await
    }

    pub async fn get_kline_day(&self, code: &str, start: u16, count: u16) -> Result<KlineResponse, ClientError> {
        self.get_kline(KlineType::Day, code, start, count).await
    }

    pub async fn get_kline_day_all(&self, code: &str) -> Result<KlineResponse, ClientError> {
        self.get_kline_all(KlineType::Day, code).await
    }

    /// 最近的分钟K线按241根对齐后，每 `n` 分钟合成一根
    pub async fn get_kline_minute241(&self, code: &str, n: usize) -> Result<Vec<Kline>, ClientError> {
        let resp = self.get_kline(KlineType::Minute, code, 0, self.config.kline_page).await?;
        Ok(merge241(&resp.list, n))
    }

    // ==================== 分时数据 ====================

    /// 获取当天分时数据
    pub async fn get_minute(&self, code: &str) -> Result<MinuteResponse, ClientError> {
        let code = add_prefix(code);
        let frame = MinuteMsg::request(self.next_msg_id(), &code)?;
        match self.request(frame, Expect::Minute).await? {
            Message::Minute(resp) => Ok(resp),
            other => Err(ClientError::UnexpectedResponse(other.name())),
        }
    }

    /// 获取历史分时数据
    pub async fn get_history_minute(&self, date: NaiveDate, code: &str) -> Result<MinuteResponse, ClientError> {
        let code = add_prefix(code);
        let frame = HistoryMinuteMsg::request(self.next_msg_id(), date, &code)?;
        match self.request(frame, Expect::HistoryMinute).await? {
            Message::Minute(resp) => Ok(resp),
            other => Err(ClientError::UnexpectedResponse(other.name())),
        }
    }

    // ==================== 交易数据 ====================

    /// 获取当天分时成交（单次最多1800条）
    pub async fn get_trade(&self, code: &str, start: u16, count: u16) -> Result<TradeResponse, ClientError> {
        let code = add_prefix(code);
        let frame = TradeMsg::request(self.next_msg_id(), &code, start, count)?;
        let cache = TradeCache {
            date: beijing_now().date(),
            code,
        };
        match self.request(frame, Expect::Trade(cache)).await? {
            Message::Trade(resp) => Ok(resp),
            other => Err(ClientError::UnexpectedResponse(other.name())),
        }
    }

    /// 获取当天全部分时成交
    pub async fn get_trade_all(&self, code: &str) -> Result<TradeResponse, ClientError> {
        let page = self.config.trade_page;
        let mut all = TradeResponse::default();
        let mut start = 0u16;

        loop {
            let resp = self.get_trade(code, start, page).await?;
            let done = resp.count < page;
            all.count = all.count.saturating_add(resp.count);
            let mut list = resp.list;
            list.append(&mut all.list);
            all.list = list;

            if done {
                break;
            }
            match start.checked_add(page) {
                Some(next) => start = next,
                None => break,
            }
        }

        Ok(all)
    }

    /// 获取历史分时成交（单次最多2000条）
    pub async fn get_history_trade(
        &self,
        date: NaiveDate,
        code: &str,
        start: u16,
        count: u16,
    ) -> Result<TradeResponse, ClientError> {
        let code = add_prefix(code);
        let frame = HistoryTradeMsg::request(self.next_msg_id(), date, &code, start, count)?;
        let cache = TradeCache { date, code };
        match self.request(frame, Expect::HistoryTrade(cache)).await? {
            Message::Trade(resp) => Ok(resp),
            other => Err(ClientError::UnexpectedResponse(other.name())),
        }
    }

    /// 获取历史某天全部分时成交
    pub async fn get_history_trade_day(&self, date: NaiveDate, code: &str) -> Result<TradeResponse, ClientError> {
        let mut all = TradeResponse::default();
        let mut start = 0u16;

        loop {
            let resp = self.get_history_trade(date, code, start, MAX_HISTORY_TRADE_PAGE).await?;
            let done = resp.count < MAX_HISTORY_TRADE_PAGE;
            all.count = all.count.saturating_add(resp.count);
            let mut list = resp.list;
            list.append(&mut all.list);
            all.list = list;

            if done {
                break;
            }
            match start.checked_add(MAX_HISTORY_TRADE_PAGE) {
                Some(next) => start = next,
                None => break,
            }
        }

        Ok(all)
    }

    /// 历史某天的成交合成的1分钟K线
    pub async fn get_history_trade_klines(&self, date: NaiveDate, code: &str) -> Result<Vec<Kline>, ClientError> {
        let trades = self.get_history_trade_day(date, code).await?;
        Ok(trades_to_klines(&trades.list))
    }

    // ==================== 集合竞价 ====================

    /// 获取集合竞价数据
    pub async fn get_call_auction(&self, code: &str) -> Result<CallAuctionResponse, ClientError> {
        let code = add_prefix(code);
        let frame = CallAuctionMsg::request(self.next_msg_id(), &code)?;
        match self.request(frame, Expect::CallAuction).await? {
            Message::CallAuction(resp) => Ok(resp),
            other => Err(ClientError::UnexpectedResponse(other.name())),
        }
    }

    // ==================== 股本变迁/除权除息 ====================

    /// 获取股本变迁/除权除息数据
    pub async fn get_gbbq(&self, code: &str) -> Result<GbbqResponse, ClientError> {
        let code = add_prefix(code);
        let frame = GbbqMsg::request(self.next_msg_id(), &code)?;
        match self.request(frame, Expect::Gbbq).await? {
            Message::Gbbq(resp) => Ok(resp),
            other => Err(ClientError::UnexpectedResponse(other.name())),
        }
    }

    /// 拉取多个代码的股本变迁，组成数据簿
    pub async fn get_gbbq_book<S: AsRef<str>>(&self, codes: &[S]) -> Result<GbbqBook, ClientError> {
        let mut book = GbbqBook::default();
        for code in codes {
            let resp = self.get_gbbq(code.as_ref()).await?;
            book.replace(code.as_ref(), resp.list);
        }
        Ok(book)
    }

    /// 复权后的全部日K线
    pub async fn get_kline_day_adjusted(&self, code: &str, adjust: Adjust) -> Result<Vec<Kline>, ClientError> {
        let klines = self.get_kline_day_all(code).await?;
        let book = self.get_gbbq_book(&[code]).await?;
        let table = book.factor_table(code, &klines.list);
        Ok(adjust_klines(&klines.list, &table, adjust))
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// 读取任务：切分响应帧并完成对应的请求，连接断开时清空请求表
async fn read_loop(mut reader: OwnedReadHalf, pending: Arc<PendingRequests>, closed: Arc<AtomicBool>) {
    let mut buf = FrameBuffer::new();
    let mut chunk = vec![0u8; 64 * 1024];

    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => {
                debug!("服务器关闭连接");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                warn!("读取失败: {}", e);
                break;
            }
        };
        buf.extend(&chunk[..n]);

        loop {
            match buf.next_frame() {
                Ok(Some(frame)) => {
                    debug!(
                        "接收响应: msg_id={} type=0x{:04X} 压缩长度={} 长度={}",
                        frame.msg_id, frame.msg_type, frame.zip_length, frame.length
                    );
                    pending.complete(&frame);
                }
                Ok(None) => break,
                // 出错的帧已从缓冲区移除
                Err(e) => {
                    warn!("响应帧错误: {}", e);
                    if let Some(msg_id) = e.msg_id() {
                        pending.fail(msg_id, MessageError::Decode(e.to_string()));
                    }
                }
            }
        }
    }

    closed.store(true, Ordering::SeqCst);
    pending.clear();
}
