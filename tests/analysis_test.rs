//! 股本、复权因子与K线合成测试

use chrono::{NaiveDate, NaiveDateTime};
use rstest::rstest;
use tdx_quant::*;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn kline(time: NaiveDateTime, last: i64, close: i64) -> Kline {
    Kline {
        last: Price(last),
        open: Price(close),
        high: Price(close + 100),
        low: Price(close - 100),
        close: Price(close),
        volume: 1000,
        amount: Price(close * 1000),
        time,
        up_count: 0,
        down_count: 0,
    }
}

fn xrxd(time: NaiveDateTime, dividend: f64, bonus: f64) -> Xrxd {
    Xrxd {
        code: "sz000001".to_string(),
        time,
        dividend,
        rights_price: 0.0,
        bonus,
        rights: 0.0,
    }
}

// ==================== 除权除息 ====================

#[test]
fn test_xrxd_dividend() {
    let x = xrxd(at(2024, 6, 14, 15, 0), 5.0, 0.0);
    assert_eq!(x.pre(Price(10_000)), Price(9_500));
}

#[rstest]
// 10送10
#[case(0.0, 0.0, 10.0, 0.0, 10_000, 5_000)]
// 10配3，配股价8元
#[case(0.0, 8.0, 0.0, 3.0, 10_000, 9_538)]
// 10送5，6.6666...截断为6.666
#[case(0.0, 0.0, 5.0, 0.0, 10_000, 6_666)]
// 分母为0时不变
#[case(0.0, 0.0, -10.0, 0.0, 10_000, 10_000)]
fn test_xrxd_pre(
    #[case] dividend: f64,
    #[case] rights_price: f64,
    #[case] bonus: f64,
    #[case] rights: f64,
    #[case] price: i64,
    #[case] expected: i64,
) {
    let x = Xrxd {
        code: "sh600000".to_string(),
        time: at(2024, 6, 14, 15, 0),
        dividend,
        rights_price,
        bonus,
        rights,
    };
    assert_eq!(x.pre(Price(price)), Price(expected));
}

#[test]
fn test_xrxd_from_gbbq_rounds() {
    let g = Gbbq {
        code: "sz000001".to_string(),
        time: at(2024, 6, 14, 15, 0),
        category: 1,
        detail: GbbqDetail::Xrxd {
            dividend: 2.4600000381469727,
            rights_price: 0.0,
            bonus: 0.0,
            rights: 0.0,
        },
    };
    let x = Xrxd::from_gbbq(&g).unwrap();
    assert_eq!(x.dividend, 2.46);

    let shares = Gbbq {
        category: 5,
        detail: GbbqDetail::Shares {
            pre_float: 1.0,
            pre_total: 1.0,
            post_float: 1.0,
            post_total: 1.0,
        },
        ..g
    };
    assert!(Xrxd::from_gbbq(&shares).is_none());
}

// ==================== 股本 / 换手率 ====================

fn shares(time: NaiveDateTime, category: u8, post_float: f64) -> Gbbq {
    Gbbq {
        code: "sz000001".to_string(),
        time,
        category,
        detail: GbbqDetail::Shares {
            pre_float: 0.0,
            pre_total: 0.0,
            post_float,
            post_total: post_float * 2.0,
        },
    }
}

#[test]
fn test_turnover() {
    assert_eq!(turnover(1_000_000.0, 50_000.0), 5.0);
    assert_eq!(turnover(0.0, 50_000.0), 0.0);
    assert_eq!(checked_turnover(0.0, 1.0), Err(AnalysisError::DivisionUndefined));
}

#[test]
fn test_book_get_equity() {
    let book = GbbqBook::new(vec![
        shares(at(2024, 6, 14, 15, 0), 5, 2_000_000.0),
        shares(at(2024, 1, 10, 15, 0), 2, 1_000_000.0),
        // 类别6不是股本快照
        shares(at(2024, 8, 1, 15, 0), 6, 9_000_000.0),
    ]);
    assert_eq!(book.len(), 1);

    // 当天0点起生效
    let eq = book.get_equity("000001", at(2024, 6, 14, 9, 30)).unwrap();
    assert_eq!(eq.float, 2_000_000.0);
    assert_eq!(eq.total, 4_000_000.0);

    let eq = book.get_equity("sz000001", at(2024, 6, 13, 15, 0)).unwrap();
    assert_eq!(eq.float, 1_000_000.0);

    let eq = book.get_equity("SZ000001", at(2024, 9, 1, 0, 0)).unwrap();
    assert_eq!(eq.float, 2_000_000.0);

    assert!(book.get_equity("sz000001", at(2023, 12, 31, 0, 0)).is_none());
    assert!(book.get_equity("sh600000", at(2024, 9, 1, 0, 0)).is_none());

    assert_eq!(book.turnover("sz000001", at(2024, 3, 1, 10, 0), 50_000), 5.0);
    assert_eq!(book.turnover("sz000001", at(2023, 3, 1, 10, 0), 50_000), 0.0);
}

// ==================== 复权因子 ====================

/// 6/15（周六）10派5，顺延到6/17；6/18 10送10
fn sample() -> (Vec<Kline>, Vec<Xrxd>) {
    let klines = vec![
        kline(at(2024, 6, 12, 15, 0), 9_900, 10_000),
        kline(at(2024, 6, 13, 15, 0), 10_000, 10_000),
        kline(at(2024, 6, 17, 15, 0), 10_000, 9_600),
        kline(at(2024, 6, 18, 15, 0), 9_600, 4_900),
    ];
    let xrxds = vec![
        xrxd(at(2024, 6, 18, 15, 0), 0.0, 10.0),
        xrxd(at(2024, 6, 15, 15, 0), 5.0, 0.0),
    ];
    (klines, xrxds)
}

#[test]
fn test_pre_carry_forward() {
    let (klines, xrxds) = sample();
    let rows = pre(&xrxds, &klines);
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].time, at(2024, 6, 17, 15, 0));
    assert_eq!(rows[0].last, Price(10_000));
    assert_eq!(rows[0].pre_last, Price(9_500));
    assert!((rows[0].qfq_factor() - 0.95).abs() < 1e-12);

    assert_eq!(rows[1].time, at(2024, 6, 18, 15, 0));
    assert_eq!(rows[1].last, Price(9_600));
    assert_eq!(rows[1].pre_last, Price(4_800));
    assert!((rows[1].hfq_factor() - 2.0).abs() < 1e-12);
}

#[test]
fn test_pre_skips_event_without_kline() {
    let (klines, mut xrxds) = sample();
    xrxds.push(xrxd(at(2024, 7, 1, 15, 0), 1.0, 0.0));
    assert_eq!(pre(&xrxds, &klines).len(), 2);
}

#[test]
fn test_factor_chain() {
    let (klines, xrxds) = sample();
    let list = factors(&pre(&xrxds, &klines));
    assert_eq!(list.len(), 2);

    // 后复权从最早的事件往后累乘
    assert!((list[0].hfq - 10.0 / 9.5).abs() < 1e-9);
    assert!((list[1].hfq - 10.0 / 9.5 * 2.0).abs() < 1e-9);

    // 前复权最新的事件为1
    assert_eq!(list[1].qfq, 1.0);
    assert!((list[0].qfq - 0.5).abs() < 1e-12);
}

#[test]
fn test_factor_table_lookup() {
    let (klines, xrxds) = sample();
    let table = FactorTable::new(factors(&pre(&xrxds, &klines)));

    let before = table.lookup(day(2024, 6, 12));
    assert_eq!(before.hfq, 1.0);
    assert!((before.qfq - 0.475).abs() < 1e-12);

    let v = table.lookup(day(2024, 6, 17));
    assert!((v.qfq - 0.5).abs() < 1e-12);

    let v = table.lookup(day(2024, 6, 20));
    assert_eq!(v.qfq, 1.0);
}

#[test]
fn test_adjust_klines() {
    let (klines, xrxds) = sample();
    let book = GbbqBook::default();
    assert!(book.factors("sz000001", &klines).is_empty());

    let table = FactorTable::new(factors(&pre(&xrxds, &klines)));

    let qfq = adjust_klines(&klines, &table, Adjust::Qfq);
    assert_eq!(qfq.len(), klines.len());
    assert_eq!(qfq[0].close, Price(4_750));
    assert_eq!(qfq[2].close, Price(4_800));
    assert_eq!(qfq[3], klines[3]);
    // 成交量与成交额不变
    assert_eq!(qfq[0].volume, klines[0].volume);
    assert_eq!(qfq[0].amount, klines[0].amount);

    let hfq = adjust_klines(&klines, &table, Adjust::Hfq);
    assert_eq!(hfq[0], klines[0]);
    assert_eq!(hfq[3].close, Price(10_320));
}

#[rstest]
#[case(12_345)]
#[case(1)]
#[case(999_999)]
fn test_apply_factor_identity(#[case] close: i64) {
    let k = kline(at(2024, 1, 2, 15, 0), close - 3, close);
    assert_eq!(apply_factor(&k, 1.0), k);
}

#[test]
fn test_book_factors() {
    let (klines, _) = sample();
    let records = vec![
        Gbbq {
            code: "sz000001".to_string(),
            time: at(2024, 6, 15, 15, 0),
            category: 1,
            detail: GbbqDetail::Xrxd {
                dividend: 5.0,
                rights_price: 0.0,
                bonus: 0.0,
                rights: 0.0,
            },
        },
        shares(at(2024, 1, 10, 15, 0), 2, 1_000_000.0),
    ];
    let book = GbbqBook::new(records);
    assert_eq!(book.xrxds("000001").len(), 1);

    let list = book.factors("sz000001", &klines);
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].qfq, 1.0);

    let table = book.factor_table("sz000001", &klines);
    assert!((table.lookup(day(2024, 6, 13)).qfq - 0.95).abs() < 1e-12);
}

// ==================== K线合成 ====================

fn minutes(date: (i32, u32, u32), times: &[(u32, u32)]) -> Vec<Kline> {
    times
        .iter()
        .enumerate()
        .map(|(i, (h, m))| kline(at(date.0, date.1, date.2, *h, *m), 10_000, 10_000 + i as i64 * 10))
        .collect()
}

#[test]
fn test_merge_identity() {
    let series = minutes((2024, 1, 2), &[(9, 31), (9, 32), (9, 33), (9, 34), (9, 35)]);
    assert_eq!(merge(&series, 1), series);
    assert_eq!(merge(&series, 0), series);
}

#[test]
fn test_merge_windows() {
    let series = minutes((2024, 1, 2), &[(9, 31), (9, 32), (9, 33), (9, 34), (9, 35)]);
    let merged = merge(&series, 2);
    assert_eq!(merged.len(), 3);

    let k = &merged[0];
    assert_eq!(k.open, series[0].open);
    assert_eq!(k.close, series[1].close);
    assert_eq!(k.high, series[1].high);
    assert_eq!(k.low, series[0].low);
    assert_eq!(k.volume, 2000);
    assert_eq!(k.amount, Price(series[0].amount.0 + series[1].amount.0));
    assert_eq!(k.time, series[1].time);

    // 最后一组不足2根
    assert_eq!(merged[2], series[4]);
}

#[test]
fn test_merge241_fills_grid() {
    let mut input = minutes((2024, 1, 2), &[(9, 30), (10, 0), (14, 0), (12, 0)]);
    input.extend(minutes((2024, 1, 3), &[(13, 1)]));

    let out = merge241(&input, 1);
    assert_eq!(out.len(), MINUTES_PER_DAY * 2);
    assert!(out.windows(2).all(|w| w[0].time < w[1].time));

    // 第一天：09:30 为真实数据，09:31 用上一根收盘价补齐
    assert_eq!(out[0], input[0]);
    assert_eq!(out[1].time, at(2024, 1, 2, 9, 31));
    assert_eq!(out[1].close, input[0].close);
    assert_eq!(out[1].volume, 0);
    // 12:00 不在网格上
    assert!(out.iter().all(|k| k.time != at(2024, 1, 2, 12, 0)));

    // 第二天开盘没有数据，价格为0
    let day2 = &out[MINUTES_PER_DAY];
    assert_eq!(day2.time, at(2024, 1, 3, 9, 30));
    assert_eq!(day2.close, Price(0));
}

#[test]
fn test_merge241_windows() {
    let input = minutes((2024, 1, 2), &[(9, 30), (9, 31)]);
    let out = merge241(&input, 5);
    // 09:30 单独一根，其余240根每5根一组
    assert_eq!(out.len(), 1 + 48);
    assert_eq!(out[0].time, at(2024, 1, 2, 9, 30));
    assert_eq!(out[1].time, at(2024, 1, 2, 9, 35));
    assert_eq!(out[1].volume, 1000);
    assert_eq!(out[24].time, at(2024, 1, 2, 11, 30));
    assert_eq!(out[25].time, at(2024, 1, 2, 13, 5));
    assert_eq!(out[48].time, at(2024, 1, 2, 15, 0));
}

#[test]
fn test_trades_to_klines() {
    let trade = |h: u32, m: u32, price: i64, volume: i64| Trade {
        time: at(2024, 1, 2, h, m),
        price: Price(price),
        volume,
        status: TradeStatus::Buy,
        number: None,
    };
    let trades = vec![
        trade(9, 25, 10_000, 10),
        trade(9, 30, 10_100, 5),
        trade(9, 30, 9_900, 5),
        trade(9, 31, 10_050, 1),
    ];

    let list = trades_to_klines(&trades);
    assert_eq!(list.len(), 2);

    let k = &list[0];
    assert_eq!(k.time, at(2024, 1, 2, 9, 30));
    assert_eq!(k.open, Price(10_000));
    assert_eq!(k.high, Price(10_100));
    assert_eq!(k.low, Price(9_900));
    assert_eq!(k.close, Price(9_900));
    assert_eq!(k.volume, 20);
    assert_eq!(k.amount, Price((10_000 * 10 + 10_100 * 5 + 9_900 * 5) * 100));

    assert_eq!(list[1].last, Price(9_900));
    assert_eq!(list[1].close, Price(10_050));
}

#[test]
fn test_serde_roundtrip_factor() {
    let (klines, xrxds) = sample();
    let list = factors(&pre(&xrxds, &klines));
    let json = serde_json::to_string(&list).unwrap();
    let back: Vec<Factor> = serde_json::from_str(&json).unwrap();
    assert_eq!(back.len(), list.len());
    for (a, b) in back.iter().zip(&list) {
        assert_eq!(a.time, b.time);
        assert_eq!(a.pre_last, b.pre_last);
        assert!((a.hfq - b.hfq).abs() < 1e-12);
        assert!((a.qfq - b.qfq).abs() < 1e-12);
    }
}
