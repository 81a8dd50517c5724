//! 股本变迁数据簿
//!
//! 按代码保存股本变迁记录（按时间升序），由调用方构造并持有，刷新时整体替换某个代码的记录。

use crate::analysis::{
    equity::Equity,
    factor::{factors, pre, Factor, FactorTable, Xrxd},
};
use crate::protocol::{add_prefix, Gbbq, Kline};
use chrono::NaiveDateTime;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct GbbqBook {
    records: HashMap<String, Vec<Gbbq>>,
}

impl GbbqBook {
    pub fn new(records: impl IntoIterator<Item = Gbbq>) -> Self {
        let mut book = Self::default();
        let mut grouped: HashMap<String, Vec<Gbbq>> = HashMap::new();
        for g in records {
            grouped.entry(add_prefix(&g.code)).or_default().push(g);
        }
        for (code, list) in grouped {
            book.replace(&code, list);
        }
        book
    }

    /// 整体替换一个代码的记录
    pub fn replace(&mut self, code: &str, mut list: Vec<Gbbq>) {
        list.sort_by_key(|g| g.time);
        self.records.insert(add_prefix(code), list);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, code: &str) -> &[Gbbq] {
        self.records.get(&add_prefix(code)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 指定时间生效的股本
    ///
    /// 记录时间是当天15:00，但当天就生效，按当天0点比较。
    pub fn get_equity(&self, code: &str, as_of: NaiveDateTime) -> Option<Equity> {
        self.get(code)
            .iter()
            .rev()
            .filter(|g| g.is_equity())
            .find(|g| g.time.date().and_time(chrono::NaiveTime::MIN) <= as_of)
            .and_then(Equity::from_gbbq)
    }

    /// 换手率（%），`volume` 为股数；没有股本数据时返回0
    pub fn turnover(&self, code: &str, as_of: NaiveDateTime, volume: i64) -> f64 {
        match self.get_equity(code, as_of) {
            Some(eq) => eq.turnover(volume as f64),
            None => 0.0,
        }
    }

    /// 除权除息事件，按时间升序
    pub fn xrxds(&self, code: &str) -> Vec<Xrxd> {
        self.get(code).iter().filter_map(Xrxd::from_gbbq).collect()
    }

    /// 根据K线计算累计复权因子
    pub fn factors(&self, code: &str, klines: &[Kline]) -> Vec<Factor> {
        factors(&pre(&self.xrxds(code), klines))
    }

    pub fn factor_table(&self, code: &str, klines: &[Kline]) -> FactorTable {
        FactorTable::new(self.factors(code, klines))
    }
}
