//! 客户端配置

use crate::protocol::{DEFAULT_PORT, MAX_KLINE_PAGE, MAX_TRADE_PAGE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// 默认服务器
pub const DEFAULT_ADDR: &str = "124.71.187.122";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("解析配置文件失败: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("配置无效: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// 服务器地址，没有端口时使用7709
    pub addr: String,
    /// 单个请求的超时（毫秒）
    pub timeout_ms: u64,
    /// 分页拉取K线时每页数量
    pub kline_page: u16,
    /// 分页拉取成交时每页数量
    pub trade_page: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            timeout_ms: 10_000,
            kline_page: MAX_KLINE_PAGE,
            trade_page: MAX_TRADE_PAGE,
        }
    }
}

impl ClientConfig {
    /// 从 JSON 文件加载，缺少的字段取默认值
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// 默认配置叠加环境变量 `TDX_ADDR`、`TDX_TIMEOUT_MS`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("TDX_ADDR") {
            config.addr = addr;
        }
        if let Ok(ms) = std::env::var("TDX_TIMEOUT_MS") {
            config.timeout_ms = ms
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("TDX_TIMEOUT_MS={}", ms)))?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.addr.trim().is_empty() {
            return Err(ConfigError::Invalid("服务器地址不能为空".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("超时不能为0".to_string()));
        }
        if self.kline_page == 0 || self.kline_page > MAX_KLINE_PAGE {
            return Err(ConfigError::Invalid(format!("K线每页数量应在1~{}之间", MAX_KLINE_PAGE)));
        }
        if self.trade_page == 0 || self.trade_page > MAX_TRADE_PAGE {
            return Err(ConfigError::Invalid(format!("成交每页数量应在1~{}之间", MAX_TRADE_PAGE)));
        }
        Ok(())
    }

    /// 带端口的地址
    pub fn socket_addr(&self) -> String {
        let addr = self.addr.trim();
        if addr.contains(':') {
            addr.to_string()
        } else {
            format!("{}:{}", addr, DEFAULT_PORT)
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
