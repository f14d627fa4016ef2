//! 네이버 금융 수집기 HTTP 테스트.

use std::time::Duration;

use kmarket_data::{NaverError, NaverFinancialFetcher};
use mockito::Matcher;

const PAGE: &str = r#"
<html><body>
  <div class="section cop_analysis">
    <table class="tb_type1 tb_num">
      <tr><th>매출액</th><td>2,589,355</td><td>3,008,709</td></tr>
      <tr><th>영업이익</th><td>65,670</td><td>327,260</td></tr>
      <tr><th>영업이익률</th><td>2.54</td><td>10.88</td></tr>
    </table>
  </div>
</body></html>
"#;

fn fetcher(base_url: &str) -> NaverFinancialFetcher {
    NaverFinancialFetcher::new(Duration::from_secs(5))
        .unwrap()
        .with_base_url(base_url)
}

#[tokio::test]
async fn test_fetch_financial_from_main_page() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/item/main.naver")
        .match_query(Matcher::UrlEncoded("code".into(), "005930".into()))
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(PAGE)
        .create_async()
        .await;

    let figure = fetcher(&server.url())
        .fetch_financial("005930")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(figure.revenue, 258_935_500_000_000);
    assert_eq!(figure.operating_profit, 6_567_000_000_000);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_page_without_summary_is_absent() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/item/main.naver")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html><body>종목 정보가 없습니다</body></html>")
        .create_async()
        .await;

    let figure = fetcher(&server.url()).fetch_financial("999999").await.unwrap();
    assert!(figure.is_none());
}

#[tokio::test]
async fn test_error_statuses() {
    let mut server = mockito::Server::new_async().await;
    let _limited = server
        .mock("GET", "/item/main.naver")
        .match_query(Matcher::UrlEncoded("code".into(), "005930".into()))
        .with_status(429)
        .create_async()
        .await;
    let _missing = server
        .mock("GET", "/item/main.naver")
        .match_query(Matcher::UrlEncoded("code".into(), "000660".into()))
        .with_status(500)
        .create_async()
        .await;

    let fetcher = fetcher(&format!("{}/", server.url()));
    assert!(matches!(
        fetcher.fetch_financial("005930").await,
        Err(NaverError::RateLimited)
    ));
    assert!(matches!(
        fetcher.fetch_financial("000660").await,
        Err(NaverError::Status { status: 500, .. })
    ));
}
