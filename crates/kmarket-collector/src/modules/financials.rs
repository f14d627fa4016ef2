//! 재무 수집 (네이버 금융).

use std::sync::Arc;

use async_trait::async_trait;
use kmarket_core::FinancialFigure;
use kmarket_data::NaverFinancialFetcher;

use super::orchestrator::{DomainFetcher, FetchError};

/// 종목별 최근 분기 매출액/영업이익 조회
pub struct FinancialFetcher {
    source: Arc<NaverFinancialFetcher>,
}

impl FinancialFetcher {
    pub fn new(source: Arc<NaverFinancialFetcher>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl DomainFetcher for FinancialFetcher {
    type Output = FinancialFigure;

    fn domain(&self) -> &'static str {
        "financial"
    }

    async fn fetch(&self, code: &str) -> Result<Option<FinancialFigure>, FetchError> {
        Ok(self.source.fetch_financial(code).await?)
    }
}
