//! 通达信行情协议：报文编解码、复权因子计算与K线合成

pub mod analysis;
pub mod client;
pub mod config;
pub mod pending;
pub mod protocol;

pub use analysis::*;
pub use client::{beijing_now, Client, ClientError};
pub use config::{ClientConfig, ConfigError};
pub use pending::PendingRequests;
pub use protocol::*;

// 重新导出 log 宏供用户使用
pub use log;
