//! 도메인 모델.

pub mod bar;
pub mod calendar;
pub mod instrument;
pub mod snapshot;

pub use bar::{DailyBar, PriceBar};
pub use calendar::{estimate_trading_days, MonthKey, QuarterLabel};
pub use instrument::{is_valid_code, Instrument, InstrumentInfo, Theme, Venue};
pub use snapshot::{FinancialFigure, MarketStat};
