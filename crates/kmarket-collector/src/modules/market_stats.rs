//! 시장지표 수집 (주식기본정보요청).

use std::sync::Arc;

use async_trait::async_trait;
use kmarket_core::units::hundred_million_won_to_won;
use kmarket_core::MarketStat;
use kmarket_terminal::codes::basic_info as info;
use kmarket_terminal::{assemble_single, FieldKind, QueryRequest, ResponseSchema, TerminalBridge};

use super::orchestrator::{DomainFetcher, FetchError};

fn schema() -> ResponseSchema {
    ResponseSchema::new()
        .field(info::FIELD_MARKET_CAP, FieldKind::SignedMagnitude)
        .field(info::FIELD_SHARES, FieldKind::SignedMagnitude)
        .field(info::FIELD_PER, FieldKind::Decimal)
        .field(info::FIELD_PBR, FieldKind::Decimal)
}

/// 종목별 시가총액/상장주식수/PER/PBR 조회
pub struct MarketStatFetcher {
    bridge: Arc<TerminalBridge>,
}

impl MarketStatFetcher {
    pub fn new(bridge: Arc<TerminalBridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl DomainFetcher for MarketStatFetcher {
    type Output = MarketStat;

    fn domain(&self) -> &'static str {
        "market"
    }

    async fn fetch(&self, code: &str) -> Result<Option<MarketStat>, FetchError> {
        let request = QueryRequest::new(info::REQUEST_NAME, info::QUERY_CODE, info::CHANNEL)
            .param(info::PARAM_CODE, code);
        let schema = schema();

        let Some(record) = self
            .bridge
            .submit(&request, move |ctx| assemble_single(ctx, &schema))
            .await??
        else {
            return Ok(None);
        };

        Ok(Some(MarketStat {
            market_cap: hundred_million_won_to_won(record.magnitude(info::FIELD_MARKET_CAP)?),
            shares: record.magnitude(info::FIELD_SHARES)?,
            per: record.decimal(info::FIELD_PER)?,
            pbr: record.decimal(info::FIELD_PBR)?,
        }))
    }
}
