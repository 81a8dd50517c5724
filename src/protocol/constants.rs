//! 协议常量定义

use serde::{Deserialize, Serialize};

/// 请求帧固定前缀
pub const PREFIX: u8 = 0x0C;

/// 响应帧固定前缀（大端序读取：B1CB7400）
pub const PREFIX_RESP: u32 = 0xB1CB7400;

/// 请求帧头长度（前缀+消息ID+控制码+两个长度+类型）
pub const REQUEST_HEADER_LEN: usize = 12;

/// 响应帧头长度
pub const RESPONSE_HEADER_LEN: usize = 16;

/// 服务器默认端口
pub const DEFAULT_PORT: u16 = 7709;

/// 单次请求上限
pub const MAX_CODE_PAGE: u16 = 1000;
pub const MAX_KLINE_PAGE: u16 = 800;
pub const MAX_TRADE_PAGE: u16 = 1800;
pub const MAX_HISTORY_TRADE_PAGE: u16 = 2000;

/// 消息类型
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Connect = 0x000D,            // 建立连接
    Heart = 0x0004,              // 心跳
    Gbbq = 0x000F,               // 股本变迁
    Count = 0x044E,              // 证券数量
    Code = 0x0450,               // 证券代码
    Quote = 0x053E,              // 五档行情
    Minute = 0x051D,             // 分时数据
    CallAuction = 0x056A,        // 集合竞价
    MinuteTrade = 0x0FC5,        // 分时成交
    HistoryMinute = 0x0FB4,      // 历史分时数据
    HistoryMinuteTrade = 0x0FB5, // 历史分时成交
    Kline = 0x052D,              // K线
}

impl MessageType {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x000D => Some(MessageType::Connect),
            0x0004 => Some(MessageType::Heart),
            0x000F => Some(MessageType::Gbbq),
            0x044E => Some(MessageType::Count),
            0x0450 => Some(MessageType::Code),
            0x053E => Some(MessageType::Quote),
            0x051D => Some(MessageType::Minute),
            0x056A => Some(MessageType::CallAuction),
            0x0FC5 => Some(MessageType::MinuteTrade),
            0x0FB4 => Some(MessageType::HistoryMinute),
            0x0FB5 => Some(MessageType::HistoryMinuteTrade),
            0x052D => Some(MessageType::Kline),
            _ => None,
        }
    }
}

/// K线类型（线上取值）
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KlineType {
    Minute5 = 0,  // 5分钟
    Minute15 = 1, // 15分钟
    Minute30 = 2, // 30分钟
    Minute60 = 3, // 60分钟
    Day2 = 4,     // 日线（成交量需除以100）
    Week = 5,     // 周线
    Month = 6,    // 月线
    Minute = 7,   // 1分钟
    Minute2 = 8,  // 1分钟（变体）
    Day = 9,      // 日线
    Quarter = 10, // 季线
    Year = 11,    // 年线
}

impl KlineType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(KlineType::Minute5),
            1 => Some(KlineType::Minute15),
            2 => Some(KlineType::Minute30),
            3 => Some(KlineType::Minute60),
            4 => Some(KlineType::Day2),
            5 => Some(KlineType::Week),
            6 => Some(KlineType::Month),
            7 => Some(KlineType::Minute),
            8 => Some(KlineType::Minute2),
            9 => Some(KlineType::Day),
            10 => Some(KlineType::Quarter),
            11 => Some(KlineType::Year),
            _ => None,
        }
    }

    /// 时间字段是否为 年月日+时分 的压缩格式
    pub fn is_intraday(self) -> bool {
        matches!(
            self,
            KlineType::Minute
                | KlineType::Minute2
                | KlineType::Minute5
                | KlineType::Minute15
                | KlineType::Minute30
                | KlineType::Minute60
        )
    }

    /// 成交量是否需要除以100
    ///
    /// 实测：1/5/15/30/60分钟需要，日/周/月/季/年不需要，Day2 同分钟线
    pub fn scales_volume(self) -> bool {
        self.is_intraday() || self == KlineType::Day2
    }

    pub fn name(self) -> &'static str {
        match self {
            KlineType::Minute5 => "5分钟",
            KlineType::Minute15 => "15分钟",
            KlineType::Minute30 => "30分钟",
            KlineType::Minute60 => "60分钟",
            KlineType::Day2 => "日线2",
            KlineType::Week => "周线",
            KlineType::Month => "月线",
            KlineType::Minute => "1分钟",
            KlineType::Minute2 => "1分钟2",
            KlineType::Day => "日线",
            KlineType::Quarter => "季线",
            KlineType::Year => "年线",
        }
    }
}

/// 交易所
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    SZ = 0, // 深圳交易所
    SH = 1, // 上海交易所
    BJ = 2, // 北京交易所
}

impl Exchange {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Exchange::SZ),
            1 => Some(Exchange::SH),
            2 => Some(Exchange::BJ),
            _ => None,
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "sz" => Some(Exchange::SZ),
            "sh" => Some(Exchange::SH),
            "bj" => Some(Exchange::BJ),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Exchange::SZ => "sz",
            Exchange::SH => "sh",
            Exchange::BJ => "bj",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Exchange::SH => "上海",
            Exchange::SZ => "深圳",
            Exchange::BJ => "北京",
        }
    }
}

/// 控制码
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Control01 = 0x01,
}

impl Control {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}
