//! 除权除息与复权因子
//!
//! 每个除权除息事件对应一行：事件当天（非交易日则顺延到之后第一个交易日）的K线昨收
//! 作为除权前价格，算出除权后价格，再得到单次的前/后复权因子和累计因子。

use crate::protocol::{Gbbq, GbbqDetail, Kline, Price};
use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use serde::{Deserialize, Serialize};

/// 保留2位小数（四舍五入）
fn round2(v: f64) -> f64 {
    (v * 100.0 + 0.5).floor() / 100.0
}

/// 除权除息事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Xrxd {
    pub code: String,
    pub time: NaiveDateTime,
    pub dividend: f64,     // 每10股分红（元）
    pub rights_price: f64, // 配股价
    pub bonus: f64,        // 每10股送转股
    pub rights: f64,       // 每10股配股
}

impl Xrxd {
    pub fn from_gbbq(gbbq: &Gbbq) -> Option<Self> {
        match gbbq.detail {
            GbbqDetail::Xrxd {
                dividend,
                rights_price,
                bonus,
                rights,
            } if gbbq.is_xrxd() => Some(Xrxd {
                code: gbbq.code.clone(),
                time: gbbq.time,
                dividend: round2(dividend),
                rights_price: round2(rights_price),
                bonus: round2(bonus),
                rights: round2(rights),
            }),
            _ => None,
        }
    }

    /// 除权除息后的价格，例如10元，10股分5元 -> 9.5元；不足1厘的部分截掉
    pub fn pre(&self, price: Price) -> Price {
        let numerator = (price.to_yuan() * 10.0 - self.dividend) + self.rights * self.rights_price;
        let denominator = 10.0 + self.bonus + self.rights;
        if denominator == 0.0 {
            return price;
        }
        Price((numerator / denominator * 1000.0) as i64)
    }
}

/// 单次因子，价格相等或任一为0时为1
fn single_factor(numerator: Price, denominator: Price, last: Price, pre_last: Price) -> f64 {
    if last == pre_last || last.0 == 0 || pre_last.0 == 0 {
        return 1.0;
    }
    numerator.0 as f64 / denominator.0 as f64
}

/// 事件对应的K线：昨收与除权后的昨收
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreKline {
    pub time: NaiveDateTime,
    pub last: Price,
    pub pre_last: Price,
}

impl PreKline {
    pub fn qfq_factor(&self) -> f64 {
        single_factor(self.pre_last, self.last, self.last, self.pre_last)
    }

    pub fn hfq_factor(&self) -> f64 {
        single_factor(self.last, self.pre_last, self.last, self.pre_last)
    }
}

/// 把事件匹配到K线上
///
/// 同一天有K线则直接使用，否则顺延到之后第一根K线；之后没有K线的事件跳过。
/// 多个事件落到同一根K线时以后一个为准。
pub fn pre(xrxds: &[Xrxd], klines: &[Kline]) -> Vec<PreKline> {
    let mut events: Vec<&Xrxd> = xrxds.iter().collect();
    events.sort_by_key(|x| x.time);
    let mut ks: Vec<&Kline> = klines.iter().collect();
    ks.sort_by_key(|k| k.time);

    let mut result: Vec<PreKline> = Vec::with_capacity(events.len());
    for x in events {
        let date = x.time.date();
        let Some(k) = ks.iter().find(|k| k.time.date() >= date) else {
            debug!("{} 除权除息 {} 之后没有K线，跳过", x.code, date);
            continue;
        };

        let row = PreKline {
            time: k.time,
            last: k.last,
            pre_last: x.pre(k.last),
        };
        match result.last_mut() {
            Some(prev) if prev.time == row.time => {
                debug!("{} 多个除权除息落在 {}，以 {} 为准", x.code, row.time, date);
                *prev = row;
            }
            _ => result.push(row),
        }
    }
    result
}

/// 复权因子
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub time: NaiveDateTime,
    pub last: Price,
    pub pre_last: Price,
    pub qfq: f64, // 累计前复权因子
    pub hfq: f64, // 累计后复权因子
}

impl Factor {
    fn single_qfq(&self) -> f64 {
        single_factor(self.pre_last, self.last, self.last, self.pre_last)
    }
}

/// 累计因子：后复权从最早的事件往后累乘，前复权从最新的事件(为1)往前累乘
pub fn factors(pre: &[PreKline]) -> Vec<Factor> {
    let mut rows: Vec<&PreKline> = pre.iter().collect();
    rows.sort_by_key(|p| p.time);

    let mut hfq = 1.0;
    let mut result: Vec<Factor> = rows
        .iter()
        .map(|p| {
            hfq *= p.hfq_factor();
            Factor {
                time: p.time,
                last: p.last,
                pre_last: p.pre_last,
                qfq: 1.0,
                hfq,
            }
        })
        .collect();

    let mut qfq = 1.0;
    for i in (1..rows.len()).rev() {
        qfq *= rows[i].qfq_factor();
        result[i - 1].qfq = qfq;
    }

    result
}

/// 某一天适用的累计因子
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorValue {
    pub qfq: f64,
    pub hfq: f64,
}

/// 复权方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Adjust {
    /// 前复权，最新价格不变
    Qfq,
    /// 后复权，最早价格不变
    Hfq,
}

/// 按日期查询累计因子
#[derive(Debug, Clone, Default)]
pub struct FactorTable {
    factors: Vec<Factor>,
}

impl FactorTable {
    pub fn new(mut factors: Vec<Factor>) -> Self {
        factors.sort_by_key(|f| f.time);
        Self { factors }
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    /// 取日期不晚于 `date` 的最后一个事件的因子；早于所有事件时，后复权为1，前复权还要乘上首个事件
    pub fn lookup(&self, date: NaiveDate) -> FactorValue {
        let idx = self.factors.partition_point(|f| f.time.date() <= date);
        match idx {
            0 => match self.factors.first() {
                Some(first) => FactorValue {
                    qfq: first.qfq * first.single_qfq(),
                    hfq: 1.0,
                },
                None => FactorValue { qfq: 1.0, hfq: 1.0 },
            },
            _ => {
                let f = &self.factors[idx - 1];
                FactorValue { qfq: f.qfq, hfq: f.hfq }
            }
        }
    }
}

/// 价格乘以因子，按元保留2位小数（四舍五入）
fn scale_price(price: Price, factor: f64) -> Price {
    if factor == 1.0 {
        return price;
    }
    let cents = (price.to_yuan() * factor * 100.0 + 0.5).floor() as i64;
    Price(cents * 10)
}

/// 对单根K线的开高低收乘以因子，成交量和成交额不变
pub fn apply_factor(kline: &Kline, factor: f64) -> Kline {
    if factor == 1.0 {
        return kline.clone();
    }
    Kline {
        open: scale_price(kline.open, factor),
        high: scale_price(kline.high, factor),
        low: scale_price(kline.low, factor),
        close: scale_price(kline.close, factor),
        ..kline.clone()
    }
}

/// 按日期查表对整段K线复权，返回新的序列
pub fn adjust_klines(klines: &[Kline], table: &FactorTable, adjust: Adjust) -> Vec<Kline> {
    klines
        .iter()
        .map(|k| {
            let value = table.lookup(k.time.date());
            let factor = match adjust {
                Adjust::Qfq => value.qfq,
                Adjust::Hfq => value.hfq,
            };
            apply_factor(k, factor)
        })
        .collect()
}
