//! 수집 작업 실행 상태.
//!
//! 한 번에 하나의 수집 작업만 실행되도록 보장합니다. 상태는 `idle → running(kind) → idle`
//! 순서로만 바뀌며, 실행 중 상태는 [`CrawlGuard`]가 소유합니다.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::error::CollectorError;
use crate::Result;

/// 수집 작업 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlKind {
    Bootstrap,
    Daily,
    Incremental,
    Reference,
    Financial,
    Venue,
    AddInstruments,
    FullMarket,
}

impl CrawlKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bootstrap => "bootstrap",
            Self::Daily => "daily",
            Self::Incremental => "incremental",
            Self::Reference => "reference",
            Self::Financial => "financial",
            Self::Venue => "venue",
            Self::AddInstruments => "add_instruments",
            Self::FullMarket => "full_market",
        }
    }
}

impl std::fmt::Display for CrawlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 상태 조회 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub running: bool,
    pub kind: Option<CrawlKind>,
    pub message: String,
}

/// 수집 작업 실행 상태
#[derive(Debug, Default)]
pub struct CrawlStatus {
    state: Mutex<StatusSnapshot>,
}

impl CrawlStatus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, StatusSnapshot> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 수집 시작. 이미 실행 중이면 `AlreadyRunning`.
    pub fn try_begin(self: &Arc<Self>, kind: CrawlKind) -> Result<CrawlGuard> {
        let mut state = self.lock();
        if state.running {
            let current = state.kind.map(|k| k.to_string()).unwrap_or_default();
            return Err(CollectorError::AlreadyRunning(current));
        }

        *state = StatusSnapshot {
            running: true,
            kind: Some(kind),
            message: format!("{} 시작", kind),
        };
        tracing::debug!(kind = %kind, "수집 상태: 실행 중");

        Ok(CrawlGuard {
            status: Arc::clone(self),
            final_message: None,
        })
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }
}

/// 실행 중 상태 소유권. drop되면 idle로 돌아갑니다.
#[derive(Debug)]
pub struct CrawlGuard {
    status: Arc<CrawlStatus>,
    final_message: Option<String>,
}

impl CrawlGuard {
    /// 진행 메시지 갱신
    pub fn set_message(&self, message: impl Into<String>) {
        self.status.lock().message = message.into();
    }

    /// 종료 메시지 지정
    pub fn finish(mut self, message: impl Into<String>) {
        self.final_message = Some(message.into());
    }
}

impl Drop for CrawlGuard {
    fn drop(&mut self) {
        let mut state = self.status.lock();
        let message = self.final_message.take().unwrap_or_else(|| {
            let kind = state.kind.map(|k| k.to_string()).unwrap_or_default();
            format!("{} 중단", kind)
        });
        *state = StatusSnapshot {
            running: false,
            kind: None,
            message,
        };
    }
}
