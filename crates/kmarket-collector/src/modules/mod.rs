//! 데이터 수집 모듈.

pub mod daily_bars;
pub mod financials;
pub mod market_stats;
pub mod orchestrator;
pub mod reference_sync;
pub mod workflows;

use std::sync::Arc;

use chrono::NaiveDate;
use kmarket_data::{MarketStore, NaverFinancialFetcher, StoreResult};
use kmarket_terminal::{TerminalBridge, TerminalSession};
use tracing::{error, info};

use crate::config::CollectorConfig;
use crate::error::CollectorError;
use crate::stats::RunSummary;
use crate::status::CrawlStatus;
use crate::Result;

pub use daily_bars::DailyBarFetcher;
pub use financials::FinancialFetcher;
pub use market_stats::MarketStatFetcher;
pub use orchestrator::{BatchOutcome, BatchRunner, DomainFetcher, FetchError};
pub use reference_sync::{MarketUniverse, ReferenceSet, ThemeMemberFetcher};

/// 수집기.
///
/// 터미널 브리지, 저장소, 재무 수집기, 실행 상태를 묶어 워크플로우를 실행합니다.
#[derive(Debug)]
pub struct Collector {
    config: CollectorConfig,
    bridge: Arc<TerminalBridge>,
    store: MarketStore,
    financial: Arc<NaverFinancialFetcher>,
    status: Arc<CrawlStatus>,
    today: Option<NaiveDate>,
}

impl Collector {
    pub fn new(
        config: CollectorConfig,
        bridge: TerminalBridge,
        store: MarketStore,
        financial: NaverFinancialFetcher,
    ) -> Self {
        Self {
            config,
            bridge: Arc::new(bridge),
            store,
            financial: Arc::new(financial),
            status: CrawlStatus::new(),
            today: None,
        }
    }

    /// 설정과 터미널 세션으로 생성
    pub fn from_config(config: CollectorConfig, session: Arc<dyn TerminalSession>) -> Result<Self> {
        let bridge =
            TerminalBridge::new(session).with_request_timeout(config.terminal.request_timeout());
        let store = MarketStore::new(&config.data_dir);
        let financial = NaverFinancialFetcher::new(config.financial.timeout())?
            .with_base_url(config.financial.base_url.clone());

        info!(
            data_dir = %config.data_dir.display(),
            financial_source = %financial.base_url(),
            "수집기 초기화"
        );
        Ok(Self::new(config, bridge, store, financial))
    }

    /// 기준일 고정 (테스트, 재실행)
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// 다른 수집기와 실행 상태 공유
    pub fn with_status(mut self, status: Arc<CrawlStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn store(&self) -> &MarketStore {
        &self.store
    }

    pub fn status(&self) -> &Arc<CrawlStatus> {
        &self.status
    }

    /// 수집 기준일
    pub fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// 터미널 로그인. 실패하면 저장소를 건드리기 전에 중단합니다.
    async fn login(&self) -> Result<()> {
        self.bridge
            .login(self.config.terminal.login_timeout())
            .await
            .map_err(|e| {
                error!(error = %e, "터미널 로그인 실패");
                CollectorError::Authentication(e)
            })
    }

    /// 컬렉션 쓰기.
    ///
    /// 실패하면 이전 파일이 그대로 남으며, 요약에 실패 컬렉션으로 기록하고 계속합니다.
    fn persist<F>(&self, summary: &mut RunSummary, collection: &str, count: usize, write: F)
    where
        F: FnOnce(&MarketStore) -> StoreResult<()>,
    {
        match write(&self.store) {
            Ok(()) => {
                summary.record_count(collection, count);
                info!(collection, count, "저장 완료");
            }
            Err(e) => {
                error!(collection, error = %e, "저장 실패, 이전 버전 유지");
                summary.record_failure(collection);
            }
        }
    }
}
