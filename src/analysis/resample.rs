//! K线合成
//!
//! 全部函数都不修改输入，返回新分配的序列。

use crate::protocol::{Kline, Price, Trade};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// 每个交易日的1分钟K线数量：09:30~11:30 共121根，13:01~15:00 共120根
pub const MINUTES_PER_DAY: usize = 241;

/// 把一组连续K线合成为一根
fn merge_window(window: &[Kline]) -> Option<Kline> {
    let first = window.first()?;
    let last = window.last()?;

    let high = window.iter().map(|k| k.high).max().unwrap_or(first.high);
    let low = window.iter().map(|k| k.low).min().unwrap_or(first.low);
    let volume = window.iter().map(|k| k.volume).sum();
    let amount = Price(window.iter().map(|k| k.amount.0).sum());

    Some(Kline {
        last: first.last,
        open: first.open,
        high,
        low,
        close: last.close,
        volume,
        amount,
        time: last.time,
        up_count: last.up_count,
        down_count: last.down_count,
    })
}

/// 每 `n` 根合成一根，最后一组可以不足 `n` 根；`n` 为0时按1处理
pub fn merge(klines: &[Kline], n: usize) -> Vec<Kline> {
    klines.chunks(n.max(1)).filter_map(merge_window).collect()
}

/// 一个交易日的241个分钟时间点
pub fn minute_grid() -> Vec<NaiveTime> {
    let morning = (9 * 60 + 30)..=(11 * 60 + 30);
    let afternoon = (13 * 60 + 1)..=(15 * 60);
    morning
        .chain(afternoon)
        .filter_map(|m: u32| NaiveTime::from_hms_opt(m / 60, m % 60, 0))
        .collect()
}

/// 按241根分钟线对齐后合成
///
/// 每天先补齐241根（缺失的用上一根收盘价补，成交量为0，当天第一根缺失时价格为0），
/// 第一根（09:30）原样保留，其余240根每 `n` 根合成一根。不在网格上的K线被丢弃。
pub fn merge241(klines: &[Kline], n: usize) -> Vec<Kline> {
    let mut days: BTreeMap<NaiveDate, Vec<&Kline>> = BTreeMap::new();
    for k in klines {
        days.entry(k.time.date()).or_default().push(k);
    }

    let grid = minute_grid();
    let mut result = Vec::new();

    for (date, list) in days {
        let mut by_time: HashMap<NaiveTime, &Kline> = HashMap::with_capacity(list.len());
        for k in list {
            by_time.insert(k.time.time(), k);
        }

        let mut slots = Vec::with_capacity(MINUTES_PER_DAY);
        let mut last_close = Price::ZERO;
        for t in &grid {
            let k = match by_time.remove(t) {
                Some(k) => k.clone(),
                None => fill(date.and_time(*t), last_close),
            };
            last_close = k.close;
            slots.push(k);
        }

        for t in by_time.keys() {
            debug!("{} {} 不在分钟网格上，丢弃", date, t);
        }

        let (first, rest) = slots.split_at(1);
        result.extend_from_slice(first);
        result.extend(merge(rest, n));
    }

    result.sort_by_key(|k| k.time);
    result
}

/// 没有成交的分钟
fn fill(time: NaiveDateTime, close: Price) -> Kline {
    Kline {
        last: close,
        open: close,
        high: close,
        low: close,
        close,
        volume: 0,
        amount: Price::ZERO,
        time,
        up_count: 0,
        down_count: 0,
    }
}

/// 分时成交合成1分钟K线，9:30之前的成交归到9:30
pub fn trades_to_klines(trades: &[Trade]) -> Vec<Kline> {
    let open_time = NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN);

    let mut buckets: BTreeMap<NaiveDateTime, Vec<&Trade>> = BTreeMap::new();
    for t in trades {
        let minute = t.time.with_second(0).unwrap_or(t.time);
        let key = if minute.time() < open_time {
            minute.date().and_time(open_time)
        } else {
            minute
        };
        buckets.entry(key).or_default().push(t);
    }

    let mut result: Vec<Kline> = Vec::with_capacity(buckets.len());
    for (time, list) in buckets {
        let Some(first) = list.first() else {
            continue;
        };
        let last = match result.last() {
            Some(prev) if prev.time.date() == time.date() => prev.close,
            _ => Price::ZERO,
        };

        let mut k = Kline {
            last,
            open: first.price,
            high: first.price,
            low: first.price,
            close: first.price,
            volume: 0,
            amount: Price::ZERO,
            time,
            up_count: 0,
            down_count: 0,
        };
        for t in &list {
            k.high = k.high.max(t.price);
            k.low = k.low.min(t.price);
            k.close = t.price;
            k.volume += t.volume;
            k.amount += t.amount();
        }
        result.push(k);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid() {
        let grid = minute_grid();
        assert_eq!(grid.len(), MINUTES_PER_DAY);
        assert_eq!(grid[0], NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(grid[120], NaiveTime::from_hms_opt(11, 30, 0).unwrap());
        assert_eq!(grid[121], NaiveTime::from_hms_opt(13, 1, 0).unwrap());
        assert_eq!(grid[240], NaiveTime::from_hms_opt(15, 0, 0).unwrap());
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge(&[], 5).is_empty());
        assert!(merge241(&[], 5).is_empty());
    }
}
