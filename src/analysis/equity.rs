//! 股本与换手率

use crate::protocol::{Gbbq, GbbqDetail};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 计算错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("除数为0")]
    DivisionUndefined,
}

/// 股本快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equity {
    pub code: String,
    pub time: NaiveDateTime,
    pub category: u8,
    pub float: f64, // 流通股本（股）
    pub total: f64, // 总股本（股）
}

impl Equity {
    /// 从股本变化类记录提取变化后的股本，其他类别返回 None
    pub fn from_gbbq(gbbq: &Gbbq) -> Option<Self> {
        if !gbbq.is_equity() {
            return None;
        }
        match gbbq.detail {
            GbbqDetail::Shares {
                post_float,
                post_total,
                ..
            } => Some(Equity {
                code: gbbq.code.clone(),
                time: gbbq.time,
                category: gbbq.category,
                float: post_float,
                total: post_total,
            }),
            _ => None,
        }
    }

    /// 换手率（%），传入的是股数，线上的成交量一般是手
    pub fn turnover(&self, volume: f64) -> f64 {
        turnover(self.float, volume)
    }
}

/// 换手率（%）= 成交股数 / 流通股本 * 100，流通股本不大于0时返回0
pub fn turnover(float_shares: f64, traded_shares: f64) -> f64 {
    checked_turnover(float_shares, traded_shares).unwrap_or(0.0)
}

/// 同 [`turnover`]，流通股本不大于0时返回错误
pub fn checked_turnover(float_shares: f64, traded_shares: f64) -> Result<f64, AnalysisError> {
    if float_shares <= 0.0 {
        return Err(AnalysisError::DivisionUndefined);
    }
    Ok(traded_shares / float_shares * 100.0)
}
