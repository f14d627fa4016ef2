//! 수집 데이터 저장소와 외부 HTTP 데이터 소스.
//!
//! - [`store`]: 월 파티션 JSON 파일 저장소 (병합 쓰기, 원자적 파일 교체)
//! - [`provider`]: 네이버 금융 재무 요약 수집

pub mod error;
pub mod provider;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use provider::naver::{NaverError, NaverFinancialFetcher};
pub use store::{FinancialSnapshot, MarketSnapshot, MarketStore, PricePartition, StoreSummary};
