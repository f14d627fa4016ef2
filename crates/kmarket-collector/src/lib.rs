//! 국내 주식 데이터 수집기.
//!
//! 터미널 세션과 네이버 금융에서 데이터를 모아 월 파티션 JSON 저장소에 병합합니다:
//! - 기준정보 동기화 (테마, 종목)
//! - 일봉 수집 (초기 적재, 일별 갱신, 마지막 저장일 이후 증분 갱신)
//! - 시장지표 수집 (시가총액, 상장주식수, PER, PBR)
//! - 재무 수집 (분기 매출액, 영업이익)

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;
pub mod status;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use modules::Collector;
pub use stats::{CollectionStats, RunSummary};
pub use status::{CrawlGuard, CrawlKind, CrawlStatus, StatusSnapshot};
