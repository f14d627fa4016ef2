//! 요청 브리지 통합 테스트 (스크립트 세션 사용).

use std::sync::Arc;
use std::time::Duration;

use kmarket_terminal::codes::daily_chart;
use kmarket_terminal::sim::{row, Dispatch, ScriptedSession};
use kmarket_terminal::{assemble, BridgeError, FieldKind, QueryRequest, ResponseSchema, TerminalBridge};

fn daily_request(code: &str) -> QueryRequest {
    QueryRequest::new(daily_chart::REQUEST_NAME, daily_chart::QUERY_CODE, daily_chart::CHANNEL)
        .param(daily_chart::PARAM_CODE, code)
        .param(daily_chart::PARAM_BASE_DATE, "20250120")
        .param(daily_chart::PARAM_ADJUSTED, daily_chart::ADJUSTED_PRICE)
}

fn close_of(close: &str) -> Vec<std::collections::BTreeMap<String, String>> {
    vec![row(&[("일자", "20250120"), ("현재가", close)])]
}

fn bridge(session: ScriptedSession) -> (Arc<ScriptedSession>, TerminalBridge) {
    let session = Arc::new(session);
    let bridge = TerminalBridge::new(session.clone());
    (session, bridge)
}

#[tokio::test]
async fn test_inline_callback_resolves_with_extracted_value() {
    let (session, bridge) = bridge(
        ScriptedSession::new().with_rows(daily_chart::QUERY_CODE, "005930", close_of("-71000")),
    );

    let close = bridge
        .submit(&daily_request("005930"), |ctx| ctx.field(0, "현재가"))
        .await
        .unwrap();
    assert_eq!(close, "-71000");

    let submissions = session.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].query_code, "OPT10081");
    assert_eq!(submissions[0].channel, "2000");
    assert_eq!(submissions[0].params.get("기준일자").map(String::as_str), Some("20250120"));
    assert_eq!(submissions[0].params.get("수정주가구분").map(String::as_str), Some("1"));
}

#[tokio::test(start_paused = true)]
async fn test_second_submit_while_pending_fails_fast() {
    let (_session, bridge) = bridge(ScriptedSession::new().with_dispatch(Dispatch::Never));

    let first = daily_request("005930").timeout(Duration::from_secs(5));
    let second = daily_request("000660");

    let (first, second) = tokio::join!(
        bridge.submit(&first, |ctx| ctx.record_count()),
        bridge.submit(&second, |ctx| ctx.record_count()),
    );

    assert!(matches!(second, Err(BridgeError::RequestInFlight { .. })));
    assert!(matches!(first, Err(BridgeError::Timeout { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_slot_released_after_timeout() {
    let (_session, bridge) = bridge(
        ScriptedSession::new()
            .with_instrument_dispatch("005930", Dispatch::Never)
            .with_rows(daily_chart::QUERY_CODE, "000660", close_of("120000")),
    );

    let err = bridge
        .submit(&daily_request("005930").timeout(Duration::from_secs(10)), |ctx| ctx.record_count())
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Timeout { .. }));
    assert!(!err.is_fatal());

    let count = bridge
        .submit(&daily_request("000660"), |ctx| ctx.record_count())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_submit_releases_slot() {
    let (_session, bridge) = bridge(
        ScriptedSession::new()
            .with_instrument_dispatch("005930", Dispatch::Never)
            .with_rows(daily_chart::QUERY_CODE, "000660", close_of("120000")),
    );

    // 호출자가 바깥 타임아웃으로 대기 중인 future를 버림
    let abandoned = tokio::time::timeout(
        Duration::from_secs(1),
        bridge.submit(&daily_request("005930").timeout(Duration::from_secs(30)), |ctx| {
            ctx.record_count()
        }),
    )
    .await;
    assert!(abandoned.is_err());

    let count = bridge
        .submit(&daily_request("000660"), |ctx| ctx.record_count())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_abandoned_login_does_not_block_next_login() {
    let (_session, bridge) = bridge(
        ScriptedSession::new().with_login_dispatch(Dispatch::Delayed(Duration::from_millis(100))),
    );

    let abandoned =
        tokio::time::timeout(Duration::from_millis(10), bridge.login(Duration::from_secs(5))).await;
    assert!(abandoned.is_err());

    bridge.login(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_late_callback_does_not_resolve_next_request() {
    let (_session, bridge) = bridge(
        ScriptedSession::new()
            .with_rows(daily_chart::QUERY_CODE, "005930", close_of("111"))
            .with_rows(daily_chart::QUERY_CODE, "000660", close_of("222"))
            .with_instrument_dispatch("005930", Dispatch::Delayed(Duration::from_millis(100)))
            .with_instrument_dispatch("000660", Dispatch::Delayed(Duration::from_millis(200))),
    );

    let first = bridge
        .submit(&daily_request("005930").timeout(Duration::from_millis(50)), |ctx| {
            ctx.field(0, "현재가")
        })
        .await;
    assert!(matches!(first, Err(BridgeError::Timeout { .. })));

    // 첫 요청의 늦은 응답(~100ms)은 두 번째 요청 대기 중에 도착
    let second = bridge
        .submit(&daily_request("000660").timeout(Duration::from_secs(1)), |ctx| {
            ctx.field(0, "현재가")
        })
        .await
        .unwrap();
    assert_eq!(second, "222");
}

#[tokio::test]
async fn test_submit_rejection_codes() {
    let (_session, bridge) = bridge(
        ScriptedSession::new()
            .with_submit_code("005930", -200)
            .with_submit_code("000660", -101),
    );

    let rejected = bridge
        .submit(&daily_request("005930"), |_| ())
        .await
        .unwrap_err();
    assert!(matches!(rejected, BridgeError::SubmitRejected { code: -200, .. }));
    assert!(!rejected.is_fatal());

    let lost = bridge
        .submit(&daily_request("000660"), |_| ())
        .await
        .unwrap_err();
    assert_eq!(lost, BridgeError::SessionLost { code: -101 });
    assert!(lost.is_fatal());
}

#[tokio::test]
async fn test_pagination_bound_through_bridge() {
    let rows = (0..10)
        .map(|i| {
            let date = format!("202501{:02}", 20 - i);
            row(&[("일자", &date), ("현재가", "-500")])
        })
        .collect();
    let (_session, bridge) = bridge(
        ScriptedSession::new()
            .with_rows(daily_chart::QUERY_CODE, "005930", rows)
            .with_more_pages(daily_chart::QUERY_CODE, "005930"),
    );
    let schema = ResponseSchema::new()
        .field("일자", FieldKind::Text)
        .field("현재가", FieldKind::SignedMagnitude);

    let page = bridge
        .submit(&daily_request("005930"), move |ctx| assemble(ctx, &schema, 5))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(page.records.len(), 5);
    assert_eq!(page.records[0].text("일자").unwrap(), "20250120");
    assert_eq!(page.records[0].magnitude("현재가").unwrap(), 500);
    assert!(page.has_more);
}

#[tokio::test]
async fn test_login_success_and_rejection() {
    let (_session, ok) = bridge(ScriptedSession::new());
    ok.login(Duration::from_secs(1)).await.unwrap();

    let (_session, rejected) = bridge(ScriptedSession::new().with_login_code(-100));
    assert_eq!(
        rejected.login(Duration::from_secs(1)).await,
        Err(BridgeError::LoginFailed { code: -100 })
    );

    let (_session, refused) = bridge(ScriptedSession::new().with_connect_code(-1));
    assert_eq!(
        refused.login(Duration::from_secs(1)).await,
        Err(BridgeError::LoginFailed { code: -1 })
    );
}

#[tokio::test(start_paused = true)]
async fn test_login_timeout() {
    let (_session, bridge) = bridge(ScriptedSession::new().with_login_dispatch(Dispatch::Never));

    let err = bridge.login(Duration::from_secs(60)).await.unwrap_err();
    assert_eq!(err, BridgeError::LoginTimeout(Duration::from_secs(60)));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_reference_queries() {
    let (_session, bridge) = bridge(
        ScriptedSession::new()
            .with_listing("0", &["005930", "069500"])
            .with_name("005930", "삼성전자")
            .with_theme("141", "반도체", &["A005930", "J035720"]),
    );

    assert_eq!(bridge.instruments_by_listing("0"), vec!["005930", "069500"]);
    assert_eq!(bridge.display_name("005930"), "삼성전자");
    assert_eq!(bridge.theme_groups(), vec![("141".to_string(), "반도체".to_string())]);
    assert_eq!(bridge.theme_members("141").len(), 2);
}
