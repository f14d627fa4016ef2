//! 일봉 수집 (주식일봉차트조회).

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use kmarket_core::units::million_won_to_won;
use kmarket_core::DailyBar;
use kmarket_terminal::codes::daily_chart as chart;
use kmarket_terminal::{assemble, FieldKind, QueryRequest, Record, ResponseSchema, TerminalBridge};
use tracing::debug;

use super::orchestrator::{DomainFetcher, FetchError};

/// 일봉 레코드 스키마
fn schema() -> ResponseSchema {
    ResponseSchema::new()
        .field(chart::FIELD_DATE, FieldKind::Text)
        .field(chart::FIELD_OPEN, FieldKind::SignedMagnitude)
        .field(chart::FIELD_HIGH, FieldKind::SignedMagnitude)
        .field(chart::FIELD_LOW, FieldKind::SignedMagnitude)
        .field(chart::FIELD_CLOSE, FieldKind::SignedMagnitude)
        .field(chart::FIELD_VOLUME, FieldKind::SignedMagnitude)
        .field(chart::FIELD_VALUE, FieldKind::SignedMagnitude)
}

/// 레코드 → 일봉. 일자가 비어 있으면 `None`.
fn to_bar(record: &Record) -> Result<Option<DailyBar>, FetchError> {
    let raw_date = record.text(chart::FIELD_DATE)?;
    if raw_date.is_empty() {
        return Ok(None);
    }
    let date = NaiveDate::parse_from_str(raw_date, "%Y%m%d")
        .map_err(|_| FetchError::Parse(format!("일자 형식 오류: {}", raw_date)))?;

    Ok(Some(DailyBar {
        date,
        open: record.magnitude(chart::FIELD_OPEN)?,
        high: record.magnitude(chart::FIELD_HIGH)?,
        low: record.magnitude(chart::FIELD_LOW)?,
        close: record.magnitude(chart::FIELD_CLOSE)?,
        volume: record.magnitude(chart::FIELD_VOLUME)?,
        value: million_won_to_won(record.magnitude(chart::FIELD_VALUE)?),
    }))
}

/// 종목별 최근 N일 일봉 조회.
///
/// 응답은 최신 일자부터 정렬되어 있습니다. 종목별 마지막 저장일이 주어지면
/// 그 종목은 저장일 이후 일봉만 남기고, 저장일이 없는 종목은 모두 남깁니다.
pub struct DailyBarFetcher {
    bridge: Arc<TerminalBridge>,
    base_date: NaiveDate,
    count: usize,
    stored_until: BTreeMap<String, NaiveDate>,
}

impl DailyBarFetcher {
    pub fn new(bridge: Arc<TerminalBridge>, base_date: NaiveDate, count: usize) -> Self {
        Self {
            bridge,
            base_date,
            count,
            stored_until: BTreeMap::new(),
        }
    }

    /// 종목별 마지막 저장일 이후 일봉만 반환
    pub fn after_stored(mut self, stored_until: BTreeMap<String, NaiveDate>) -> Self {
        self.stored_until = stored_until;
        self
    }

    fn request(&self, code: &str) -> QueryRequest {
        QueryRequest::new(chart::REQUEST_NAME, chart::QUERY_CODE, chart::CHANNEL)
            .param(chart::PARAM_CODE, code)
            .param(
                chart::PARAM_BASE_DATE,
                self.base_date.format("%Y%m%d").to_string(),
            )
            .param(chart::PARAM_ADJUSTED, chart::ADJUSTED_PRICE)
    }
}

#[async_trait]
impl DomainFetcher for DailyBarFetcher {
    type Output = Vec<DailyBar>;

    fn domain(&self) -> &'static str {
        "prices"
    }

    async fn fetch(&self, code: &str) -> Result<Option<Vec<DailyBar>>, FetchError> {
        let schema = schema();
        let count = self.count;
        let page = self
            .bridge
            .submit(&self.request(code), move |ctx| assemble(ctx, &schema, count))
            .await??;

        if page.has_more && page.records.len() < count {
            debug!(code, received = page.records.len(), requested = count, "다음 페이지 있음");
        }

        let stored_until = self.stored_until.get(code).copied();
        let mut bars = Vec::with_capacity(page.records.len());
        for record in &page.records {
            let Some(bar) = to_bar(record)? else {
                continue;
            };
            if stored_until.is_some_and(|until| bar.date <= until) {
                continue;
            }
            bars.push(bar);
        }

        if bars.is_empty() {
            return Ok(None);
        }
        Ok(Some(bars))
    }
}
