//! 股本、复权与K线合成

pub mod book;
pub mod equity;
pub mod factor;
pub mod resample;

pub use book::GbbqBook;
pub use equity::{checked_turnover, turnover, AnalysisError, Equity};
pub use factor::{adjust_klines, apply_factor, factors, pre, Adjust, Factor, FactorTable, FactorValue, PreKline, Xrxd};
pub use resample::{merge, merge241, minute_grid, trades_to_klines, MINUTES_PER_DAY};
