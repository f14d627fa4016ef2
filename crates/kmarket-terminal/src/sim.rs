//! 스크립트 기반 터미널 세션.
//!
//! 실제 터미널 없이 브리지/수집 흐름을 재현하기 위한 세션 구현입니다.
//! 메모리에서 직접 구성하거나 JSON 픽스처 파일에서 읽을 수 있으며,
//! 응답 콜백을 즉시(전송 호출 안에서), 지연 후(별도 스레드), 또는
//! 전혀 보내지 않도록 설정할 수 있습니다.
//!
//! 픽스처 형식:
//!
//! ```json
//! {
//!   "login_code": 0,
//!   "listings": { "0": ["005930"], "10": ["035720"], "8": [] },
//!   "names": { "005930": "삼성전자", "035720": "카카오" },
//!   "themes": [ { "id": "141", "name": "반도체", "members": ["A005930", "J035720"] } ],
//!   "queries": {
//!     "OPT10081": { "005930": { "rows": [ { "일자": "20250120", "현재가": "-71000" } ] } }
//!   }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::codes::daily_chart::PARAM_CODE;
use crate::session::{
    Continuation, RecordReader, ResponseHeader, TerminalEvents, TerminalSession,
};

/// 콜백 전달 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch {
    /// 전송 호출 안에서 즉시
    #[default]
    Inline,
    /// 별도 스레드에서 지연 후
    Delayed(Duration),
    /// 보내지 않음
    Never,
}

/// 픽스처 로드 에러.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("픽스처 파일 읽기 실패: {0}")]
    Io(#[from] std::io::Error),

    #[error("픽스처 형식 오류: {0}")]
    Json(#[from] serde_json::Error),
}

/// 종목 하나에 대한 조회 응답.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptedResponse {
    #[serde(default)]
    pub rows: Vec<BTreeMap<String, String>>,
    #[serde(default)]
    pub has_more: bool,
}

/// 픽스처 테마.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureTheme {
    pub id: String,
    pub name: String,
    /// 접두사 포함 구성종목 (예: `A005930`, `J035720`)
    #[serde(default)]
    pub members: Vec<String>,
}

/// 세션 픽스처.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionFixture {
    #[serde(default)]
    pub login_code: i32,
    /// 시장 구분 코드 → 종목코드 목록
    #[serde(default)]
    pub listings: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub names: HashMap<String, String>,
    #[serde(default)]
    pub themes: Vec<FixtureTheme>,
    /// 조회 코드 → 종목코드 → 응답
    #[serde(default)]
    pub queries: HashMap<String, HashMap<String, ScriptedResponse>>,
}

/// 전송된 조회 기록.
#[derive(Debug, Clone)]
pub struct Submission {
    pub request_name: String,
    pub query_code: String,
    pub channel: String,
    pub continuation: Continuation,
    pub params: HashMap<String, String>,
    pub at: Instant,
}

impl Submission {
    /// 조회 대상 종목코드
    pub fn instrument(&self) -> Option<&str> {
        self.params.get(PARAM_CODE).map(String::as_str)
    }
}

/// 콜백 동안 읽히는 응답 버퍼.
struct ScriptedPage {
    rows: Vec<BTreeMap<String, String>>,
}

impl RecordReader for ScriptedPage {
    fn record_count(&self, _query_code: &str, _record_name: &str) -> usize {
        self.rows.len()
    }

    fn field_value(&self, _query_code: &str, _record_name: &str, row: usize, field: &str) -> String {
        self.rows
            .get(row)
            .and_then(|cols| cols.get(field))
            .cloned()
            .unwrap_or_default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 필드명/값 쌍으로 응답 행 생성
pub fn row(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// 스크립트 기반 터미널 세션.
#[derive(Default)]
pub struct ScriptedSession {
    fixture: SessionFixture,
    connect_code: i32,
    login_dispatch: Dispatch,
    dispatch: Dispatch,
    instrument_dispatch: HashMap<String, Dispatch>,
    submit_codes: HashMap<String, i32>,
    events: Mutex<Option<Arc<dyn TerminalEvents>>>,
    params: Mutex<HashMap<String, String>>,
    submissions: Mutex<Vec<Submission>>,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: SessionFixture) -> Self {
        Self {
            fixture,
            ..Default::default()
        }
    }

    /// JSON 픽스처 파일에서 생성
    pub fn from_fixture_file(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let fixture: SessionFixture = serde_json::from_str(&content)?;
        debug!(
            path = %path.as_ref().display(),
            names = fixture.names.len(),
            themes = fixture.themes.len(),
            "터미널 픽스처 로드"
        );
        Ok(Self::from_fixture(fixture))
    }

    /// 로그인 이벤트 코드
    pub fn with_login_code(mut self, code: i32) -> Self {
        self.fixture.login_code = code;
        self
    }

    /// 로그인 시작 자체의 반환 코드
    pub fn with_connect_code(mut self, code: i32) -> Self {
        self.connect_code = code;
        self
    }

    pub fn with_login_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.login_dispatch = dispatch;
        self
    }

    /// 기본 조회 응답 전달 방식
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// 특정 종목 조회의 응답 전달 방식
    pub fn with_instrument_dispatch(mut self, code: &str, dispatch: Dispatch) -> Self {
        self.instrument_dispatch.insert(code.to_string(), dispatch);
        self
    }

    /// 특정 종목 조회 전송의 반환 코드
    pub fn with_submit_code(mut self, code: &str, result: i32) -> Self {
        self.submit_codes.insert(code.to_string(), result);
        self
    }

    pub fn with_listing(mut self, listing_code: &str, codes: &[&str]) -> Self {
        self.fixture.listings.insert(
            listing_code.to_string(),
            codes.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    pub fn with_name(mut self, code: &str, name: &str) -> Self {
        self.fixture.names.insert(code.to_string(), name.to_string());
        self
    }

    pub fn with_theme(mut self, id: &str, name: &str, members: &[&str]) -> Self {
        self.fixture.themes.push(FixtureTheme {
            id: id.to_string(),
            name: name.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
        });
        self
    }

    /// 조회 응답 행 등록
    pub fn with_rows(
        mut self,
        query_code: &str,
        code: &str,
        rows: Vec<BTreeMap<String, String>>,
    ) -> Self {
        self.response_mut(query_code, code).rows = rows;
        self
    }

    /// 다음 페이지가 있다고 응답
    pub fn with_more_pages(mut self, query_code: &str, code: &str) -> Self {
        self.response_mut(query_code, code).has_more = true;
        self
    }

    fn response_mut(&mut self, query_code: &str, code: &str) -> &mut ScriptedResponse {
        self.fixture
            .queries
            .entry(query_code.to_string())
            .or_default()
            .entry(code.to_string())
            .or_default()
    }

    /// 지금까지 전송된 조회
    pub fn submissions(&self) -> Vec<Submission> {
        lock(&self.submissions).clone()
    }

    fn events(&self) -> Option<Arc<dyn TerminalEvents>> {
        lock(&self.events).clone()
    }
}

impl TerminalSession for ScriptedSession {
    fn attach(&self, events: Arc<dyn TerminalEvents>) {
        *lock(&self.events) = Some(events);
    }

    fn connect(&self) -> i32 {
        if self.connect_code != 0 {
            return self.connect_code;
        }
        let Some(events) = self.events() else {
            warn!("이벤트 수신자가 없어 로그인 결과를 보낼 수 없음");
            return 0;
        };

        let code = self.fixture.login_code;
        match self.login_dispatch {
            Dispatch::Inline => events.on_connect(code),
            Dispatch::Delayed(delay) => {
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    events.on_connect(code);
                });
            }
            Dispatch::Never => {}
        }
        0
    }

    fn set_query_param(&self, name: &str, value: &str) {
        lock(&self.params).insert(name.to_string(), value.to_string());
    }

    fn submit_query(
        &self,
        request_name: &str,
        query_code: &str,
        continuation: Continuation,
        channel: &str,
    ) -> i32 {
        let params = std::mem::take(&mut *lock(&self.params));
        let instrument = params.get(PARAM_CODE).cloned().unwrap_or_default();

        lock(&self.submissions).push(Submission {
            request_name: request_name.to_string(),
            query_code: query_code.to_string(),
            channel: channel.to_string(),
            continuation,
            params,
            at: Instant::now(),
        });

        if let Some(&code) = self.submit_codes.get(&instrument) {
            if code != 0 {
                return code;
            }
        }

        let Some(events) = self.events() else {
            warn!("이벤트 수신자가 없어 조회 응답을 보낼 수 없음");
            return 0;
        };

        let response = self
            .fixture
            .queries
            .get(query_code)
            .and_then(|by_code| by_code.get(&instrument))
            .cloned()
            .unwrap_or_default();

        let header = ResponseHeader {
            channel: channel.to_string(),
            request_name: request_name.to_string(),
            query_code: query_code.to_string(),
            record_name: request_name.to_string(),
            continuation: if response.has_more { "2" } else { "0" }.to_string(),
        };
        let page = ScriptedPage {
            rows: response.rows,
        };

        let dispatch = self
            .instrument_dispatch
            .get(&instrument)
            .copied()
            .unwrap_or(self.dispatch);

        match dispatch {
            Dispatch::Inline => events.on_receive(&header, &page),
            Dispatch::Delayed(delay) => {
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    events.on_receive(&header, &page);
                });
            }
            Dispatch::Never => {}
        }
        0
    }

    fn list_instruments_by_venue(&self, venue_code: &str) -> String {
        self.fixture
            .listings
            .get(venue_code)
            .map(|codes| codes.join(";"))
            .unwrap_or_default()
    }

    fn resolve_display_name(&self, code: &str) -> String {
        self.fixture.names.get(code).cloned().unwrap_or_default()
    }

    fn list_theme_groups(&self) -> String {
        self.fixture
            .themes
            .iter()
            .map(|t| format!("{}|{}", t.id, t.name))
            .collect::<Vec<_>>()
            .join(";")
    }

    fn list_theme_members(&self, theme_id: &str) -> String {
        self.fixture
            .themes
            .iter()
            .find(|t| t.id == theme_id)
            .map(|t| t.members.join(";"))
            .unwrap_or_default()
    }
}
