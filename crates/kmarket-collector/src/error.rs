//! 에러 타입 정의.

use std::fmt;

use kmarket_data::{NaverError, StoreError};
use kmarket_terminal::sim::FixtureError;
use kmarket_terminal::BridgeError;

/// Collector 에러 타입
#[derive(Debug)]
pub enum CollectorError {
    /// 터미널 로그인 실패 (저장소 변경 전에 중단)
    Authentication(BridgeError),
    /// 저장소 에러
    Store(StoreError),
    /// 설정 에러
    Config(String),
    /// 데이터 소스 에러 (터미널, 네이버 금융)
    DataSource(String),
    /// 수집 대상 종목 없음
    EmptyUniverse,
    /// 증분 갱신 기준 데이터 없음
    MissingBaseline,
    /// 다른 수집 작업이 실행 중
    AlreadyRunning(String),
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication(e) => write!(f, "Authentication failed: {}", e),
            Self::Store(e) => write!(f, "Store error: {}", e),
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::DataSource(msg) => write!(f, "Data source error: {}", msg),
            Self::EmptyUniverse => write!(f, "No instruments to collect (run init first)"),
            Self::MissingBaseline => write!(f, "No stored price data to update from (run init first)"),
            Self::AlreadyRunning(kind) => write!(f, "Another crawl is already running: {}", kind),
        }
    }
}

impl std::error::Error for CollectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Authentication(e) => Some(e),
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for CollectorError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<NaverError> for CollectorError {
    fn from(err: NaverError) -> Self {
        Self::DataSource(err.to_string())
    }
}

impl From<FixtureError> for CollectorError {
    fn from(err: FixtureError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
