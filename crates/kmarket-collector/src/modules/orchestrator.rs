//! 속도 제한 배치 실행기.
//!
//! 종목 목록을 순서대로 하나씩 조회하며, 요청 시작 간격을 도메인별 최소 간격
//! 이상으로 유지합니다. 종목 단위 실패(시간 초과, 파싱 실패, 빈 응답)는 기록 후
//! 건너뛰고, 세션 끊김 같은 치명적 에러는 남은 배치를 중단하고 그때까지의
//! 결과를 반환합니다. 실패한 종목은 다음 실행에서 다시 시도됩니다.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use kmarket_data::NaverError;
use kmarket_terminal::{AssemblyError, BridgeError};
use tokio::time::Instant;
use tracing::{error, info, warn, Instrument};

use crate::stats::CollectionStats;

/// 종목 단위 조회 실패 분류
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// 응답 시간 초과 (건너뜀)
    Timeout(String),
    /// 값 변환 실패 (건너뜀)
    Parse(String),
    /// 데이터 소스 에러 (건너뜀)
    Source(String),
    /// 배치 전체 중단
    Fatal(String),
}

impl FetchError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(msg) => write!(f, "timeout: {}", msg),
            Self::Parse(msg) => write!(f, "parse failure: {}", msg),
            Self::Source(msg) => write!(f, "source error: {}", msg),
            Self::Fatal(msg) => write!(f, "fatal: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<BridgeError> for FetchError {
    fn from(err: BridgeError) -> Self {
        if err.is_fatal() {
            return Self::Fatal(err.to_string());
        }
        match err {
            BridgeError::Timeout { .. } => Self::Timeout(err.to_string()),
            _ => Self::Source(err.to_string()),
        }
    }
}

impl From<AssemblyError> for FetchError {
    fn from(err: AssemblyError) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<NaverError> for FetchError {
    fn from(err: NaverError) -> Self {
        match err {
            NaverError::ParseError(msg) => Self::Parse(msg),
            other => Self::Source(other.to_string()),
        }
    }
}

/// 도메인별 종목 단위 조회.
#[async_trait]
pub trait DomainFetcher: Send + Sync {
    type Output: Send;

    /// 로그/통계용 도메인 이름
    fn domain(&self) -> &'static str;

    /// 한 종목 조회. 데이터가 없으면 `Ok(None)`.
    async fn fetch(&self, id: &str) -> Result<Option<Self::Output>, FetchError>;
}

/// 배치 실행 결과
#[derive(Debug)]
pub struct BatchOutcome<T> {
    /// 성공한 종목의 결과 (실패/빈 응답은 없음)
    pub results: BTreeMap<String, T>,
    pub stats: CollectionStats,
    /// 치명적 에러로 중단된 경우 그 사유
    pub aborted: Option<String>,
}

impl<T> BatchOutcome<T> {
    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }
}

/// 속도 제한 배치 실행기
#[derive(Debug, Clone)]
pub struct BatchRunner {
    interval: Duration,
    progress_every: usize,
}

impl BatchRunner {
    pub fn new(interval: Duration, progress_every: usize) -> Self {
        Self {
            interval,
            progress_every: progress_every.max(1),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 종목 목록을 순서대로 조회
    pub async fn run<F>(&self, fetcher: &F, ids: &[String]) -> BatchOutcome<F::Output>
    where
        F: DomainFetcher,
    {
        let started = Instant::now();
        let domain = fetcher.domain();
        let total = ids.len();
        let mut stats = CollectionStats::new();
        let mut results = BTreeMap::new();
        let mut aborted = None;
        let mut last_request: Option<Instant> = None;

        info!(domain, total, interval_ms = self.interval.as_millis() as u64, "배치 수집 시작");

        for (idx, id) in ids.iter().enumerate() {
            if let Some(last) = last_request {
                tokio::time::sleep_until(last + self.interval).await;
            }
            last_request = Some(Instant::now());
            stats.total += 1;

            let fetched = fetcher
                .fetch(id)
                .instrument(kmarket_core::collect_span!(domain, id))
                .await;
            match fetched {
                Ok(Some(output)) => {
                    stats.success += 1;
                    results.insert(id.clone(), output);
                }
                Ok(None) => {
                    stats.empty += 1;
                    tracing::debug!(domain, id = %id, "데이터 없음");
                }
                Err(FetchError::Fatal(reason)) => {
                    stats.errors += 1;
                    error!(domain, id = %id, reason = %reason, "치명적 에러, 배치 중단");
                    aborted = Some(reason);
                    break;
                }
                Err(e @ FetchError::Timeout(_)) => {
                    stats.timeouts += 1;
                    warn!(domain, id = %id, error = %e, "조회 실패");
                }
                Err(e) => {
                    stats.errors += 1;
                    warn!(domain, id = %id, error = %e, "조회 실패");
                }
            }

            let processed = idx + 1;
            if processed % self.progress_every == 0 {
                info!(domain, progress = format!("{}/{}", processed, total), "수집 진행 중");
            }
        }

        stats.elapsed = started.elapsed();
        BatchOutcome {
            results,
            stats,
            aborted,
        }
    }
}
