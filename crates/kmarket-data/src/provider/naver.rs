//! 네이버 금융 재무 요약 수집.
//!
//! 종목 메인 페이지(`/item/main.naver?code=`)의 기업실적분석 표에서
//! 매출액과 영업이익(억원)을 읽어 원 단위로 변환합니다.
//!
//! ```html
//! <div class="section cop_analysis">
//!   <table class="tb_type1 tb_num">
//!     <tr><th>매출액</th><td>79,000</td><td>...</td></tr>
//!     <tr><th>영업이익</th><td>9,180</td><td>...</td></tr>
//!     <tr><th>영업이익률</th><td>11.62</td><td>...</td></tr>
//!   </table>
//! </div>
//! ```

use std::time::Duration;

use kmarket_core::units::parse_hundred_million_amount;
use kmarket_core::FinancialFigure;
use reqwest::Client;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::debug;

/// 기본 주소
pub const DEFAULT_BASE_URL: &str = "https://finance.naver.com";

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 네이버 금융 수집 에러
#[derive(Debug, Error)]
pub enum NaverError {
    #[error("HTTP 요청 실패: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP 상태 코드 {status}: {code}")]
    Status { code: String, status: u16 },

    #[error("HTML 파싱 실패: {0}")]
    ParseError(String),

    #[error("Rate limit 초과")]
    RateLimited,
}

/// 네이버 금융 재무 수집기
#[derive(Debug, Clone)]
pub struct NaverFinancialFetcher {
    client: Client,
    base_url: String,
}

impl NaverFinancialFetcher {
    /// 요청 타임아웃을 지정해 생성
    pub fn new(timeout: Duration) -> Result<Self, NaverError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// 다른 주소 사용 (테스트 서버 등)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 종목 재무 요약 조회.
    ///
    /// 표가 없거나 두 항목 모두 없으면 `Ok(None)`.
    pub async fn fetch_financial(&self, code: &str) -> Result<Option<FinancialFigure>, NaverError> {
        let url = format!("{}/item/main.naver?code={}", self.base_url, code);

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(NaverError::RateLimited);
        }
        if !status.is_success() {
            return Err(NaverError::Status {
                code: code.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response.text().await?;
        let figure = parse_financial_summary(&html)?;
        if figure.is_none() {
            debug!(code, "재무 요약 표 없음");
        }
        Ok(figure)
    }
}

/// 재무 요약 표에서 매출액/영업이익 추출.
///
/// 각 항목은 행 제목으로 찾으며 첫 번째 값 칸을 사용합니다.
/// 비율 행(영업이익률 등)은 제외합니다. 한쪽만 있으면 나머지는 0입니다.
/// 값 칸을 숫자로 읽을 수 없으면 [`NaverError::ParseError`]를 반환합니다.
pub fn parse_financial_summary(html: &str) -> Result<Option<FinancialFigure>, NaverError> {
    let document = Html::parse_document(html);

    let table_selector = Selector::parse("div.section.cop_analysis table")
        .map_err(|e| NaverError::ParseError(e.to_string()))?;
    let tr_selector = Selector::parse("tr").map_err(|e| NaverError::ParseError(e.to_string()))?;
    let th_selector = Selector::parse("th").map_err(|e| NaverError::ParseError(e.to_string()))?;
    let td_selector = Selector::parse("td").map_err(|e| NaverError::ParseError(e.to_string()))?;

    let Some(table) = document.select(&table_selector).next() else {
        return Ok(None);
    };

    let mut revenue: Option<i64> = None;
    let mut operating_profit: Option<i64> = None;

    for tr in table.select(&tr_selector) {
        let Some(th) = tr.select(&th_selector).next() else {
            continue;
        };
        let label: String = th.text().collect::<String>().split_whitespace().collect();
        if label.contains('률') || label.contains('율') {
            continue;
        }

        let slot = if label.contains("매출액") {
            &mut revenue
        } else if label.contains("영업이익") {
            &mut operating_profit
        } else {
            continue;
        };
        if slot.is_some() {
            continue;
        }
        let Some(td) = tr.select(&td_selector).next() else {
            continue;
        };

        let text: String = td.text().collect();
        let value = parse_hundred_million_amount(&label, &text)
            .map_err(|e| NaverError::ParseError(e.to_string()))?;
        *slot = Some(value);
    }

    if revenue.is_none() && operating_profit.is_none() {
        return Ok(None);
    }

    Ok(Some(FinancialFigure {
        revenue: revenue.unwrap_or(0),
        operating_profit: operating_profit.unwrap_or(0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY: &str = r#"
        <html><body>
        <div class="section cop_analysis">
          <table class="tb_type1 tb_num">
            <thead><tr><th>주요재무정보</th></tr></thead>
            <tbody>
              <tr><th scope="row"><strong>매출액</strong></th><td> 79,000 </td><td>80,000</td></tr>
              <tr><th scope="row"><strong>영업이익</strong></th><td>-1,250</td><td>9,000</td></tr>
              <tr><th scope="row"><strong>영업이익률</strong></th><td>11.62</td><td>12.0</td></tr>
              <tr><th scope="row"><strong>당기순이익</strong></th><td>—</td><td>1</td></tr>
            </tbody>
          </table>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_parse_financial_summary() {
        let figure = parse_financial_summary(SUMMARY).unwrap().unwrap();
        assert_eq!(figure.revenue, 7_900_000_000_000);
        assert_eq!(figure.operating_profit, -125_000_000_000);
    }

    #[test]
    fn test_missing_table_is_none() {
        let html = "<html><body><div class=\"section\"><table></table></div></body></html>";
        assert!(parse_financial_summary(html).unwrap().is_none());
    }

    #[test]
    fn test_dash_cells_become_zero() {
        let html = r#"
            <div class="section cop_analysis"><table>
              <tr><th>매출액</th><td>-</td></tr>
            </table></div>
        "#;
        let figure = parse_financial_summary(html).unwrap().unwrap();
        assert_eq!(figure.revenue, 0);
        assert_eq!(figure.operating_profit, 0);
    }

    #[test]
    fn test_unreadable_amount_fails_instead_of_zero() {
        let html = r#"
            <div class="section cop_analysis"><table>
              <tr><th>매출액</th><td>79,000.1.2</td></tr>
              <tr><th>영업이익</th><td>9,180</td></tr>
            </table></div>
        "#;
        assert!(matches!(
            parse_financial_summary(html),
            Err(NaverError::ParseError(_))
        ));
    }

    #[test]
    fn test_unrelated_rows_are_not_parsed() {
        let html = r#"
            <div class="section cop_analysis"><table>
              <tr><th>매출액</th><td>100</td></tr>
              <tr><th>당기순이익</th><td>N/A</td></tr>
              <tr><th>EPS(원)</th><td>?</td></tr>
            </table></div>
        "#;
        let figure = parse_financial_summary(html).unwrap().unwrap();
        assert_eq!(figure.revenue, 10_000_000_000);
    }
}
