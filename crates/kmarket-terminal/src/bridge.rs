//! 요청 브리지.
//!
//! 터미널의 "전송 후 콜백" 프로토콜을 타임아웃이 있는 `async` 호출로 바꿉니다.
//!
//! - 동시에 하나의 요청만 허용 (두 번째 요청은 대기 없이 즉시 실패)
//! - 요청마다 고유 태그를 요청명으로 보내고, 콜백의 요청명이 일치할 때만 결과 전달
//! - 추출 함수는 콜백 안에서 동기적으로 실행 (레코드 버퍼는 콜백 동안만 유효)
//! - 타임아웃 후 도착한 콜백은 버림

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::codes::SESSION_LOST_CODES;
use crate::error::{BridgeError, BridgeResult};
use crate::reference;
use crate::session::{
    Continuation, RecordReader, ResponseContext, ResponseHeader, TerminalEvents, TerminalSession,
};
use kmarket_core::Venue;

/// 기본 조회 타임아웃
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

type Handler = Box<dyn FnOnce(&ResponseContext<'_>) + Send>;

/// 응답을 기다리는 요청.
struct PendingRequest {
    tag: String,
    handler: Handler,
}

/// 터미널 콜백을 대기 중인 호출자에게 연결하는 수신자.
#[derive(Default)]
struct CallbackDispatcher {
    pending: Mutex<Option<PendingRequest>>,
    login: Mutex<Option<(u64, oneshot::Sender<i32>)>>,
}

/// 다른 스레드의 패닉으로 잠금이 오염되어도 슬롯 상태는 유효하므로 그대로 사용
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl CallbackDispatcher {
    /// 대기 슬롯 설정. 이미 대기 중인 요청이 있으면 실패.
    fn arm(&self, tag: String, handler: Handler) -> BridgeResult<()> {
        let mut slot = lock(&self.pending);
        if let Some(pending) = slot.as_ref() {
            return Err(BridgeError::RequestInFlight {
                pending: pending.tag.clone(),
            });
        }
        *slot = Some(PendingRequest { tag, handler });
        Ok(())
    }

    /// 태그가 일치하는 대기 요청 해제
    fn disarm(&self, tag: &str) {
        let mut slot = lock(&self.pending);
        if slot.as_ref().is_some_and(|p| p.tag == tag) {
            *slot = None;
        }
    }

    /// 로그인 대기 슬롯 해제 (같은 시도일 때만)
    fn disarm_login(&self, id: u64) {
        let mut slot = lock(&self.login);
        if slot.as_ref().is_some_and(|(pending, _)| *pending == id) {
            *slot = None;
        }
    }
}

/// 대기 슬롯 점유.
///
/// 응답, 실패, 호출자 future 취소 중 어느 경로로 끝나든 drop 시 자기 슬롯을 비웁니다.
/// 콜백이 이미 슬롯을 가져갔으면 아무 일도 하지 않습니다.
enum SlotGuard<'a> {
    Request {
        dispatcher: &'a CallbackDispatcher,
        tag: &'a str,
    },
    Login {
        dispatcher: &'a CallbackDispatcher,
        id: u64,
    },
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        match self {
            Self::Request { dispatcher, tag } => dispatcher.disarm(tag),
            Self::Login { dispatcher, id } => dispatcher.disarm_login(*id),
        }
    }
}

impl TerminalEvents for CallbackDispatcher {
    fn on_connect(&self, code: i32) {
        match lock(&self.login).take() {
            Some((_, tx)) => {
                let _ = tx.send(code);
            }
            None => debug!(code, "대기 중인 로그인이 없어 접속 이벤트 무시"),
        }
    }

    fn on_receive(&self, header: &ResponseHeader, reader: &dyn RecordReader) {
        let pending = {
            let mut slot = lock(&self.pending);
            match slot.as_ref() {
                Some(p) if p.tag == header.request_name => slot.take(),
                _ => None,
            }
        };

        match pending {
            Some(request) => {
                let ctx = ResponseContext::new(header, reader);
                (request.handler)(&ctx);
            }
            None => debug!(
                request = %header.request_name,
                query = %header.query_code,
                "대기 중이 아닌 요청의 응답 무시"
            ),
        }
    }
}

/// 조회 요청.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// 요청명 (로그/태그용)
    pub name: String,
    /// 조회 코드
    pub query_code: String,
    /// 화면번호
    pub channel: String,
    pub continuation: Continuation,
    /// 입력값 (전송 직전에 순서대로 설정)
    pub params: Vec<(String, String)>,
    /// 요청별 타임아웃 (없으면 브리지 기본값)
    pub timeout: Option<Duration>,
}

impl QueryRequest {
    pub fn new(
        name: impl Into<String>,
        query_code: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            query_code: query_code.into(),
            channel: channel.into(),
            continuation: Continuation::First,
            params: Vec::new(),
            timeout: None,
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn continuation(mut self, continuation: Continuation) -> Self {
        self.continuation = continuation;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// 터미널 요청 브리지.
pub struct TerminalBridge {
    session: Arc<dyn TerminalSession>,
    dispatcher: Arc<CallbackDispatcher>,
    seq: AtomicU64,
    request_timeout: Duration,
}

impl TerminalBridge {
    /// 세션에 콜백 수신자를 등록하고 브리지 생성.
    pub fn new(session: Arc<dyn TerminalSession>) -> Self {
        let dispatcher = Arc::new(CallbackDispatcher::default());
        session.attach(dispatcher.clone());

        Self {
            session,
            dispatcher,
            seq: AtomicU64::new(0),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// 로그인.
    ///
    /// 접속 이벤트 코드가 0이면 성공, 그 외 코드나 시간 초과는 실패입니다.
    pub async fn login(&self, timeout: Duration) -> BridgeResult<()> {
        let id = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = oneshot::channel();
        *lock(&self.dispatcher.login) = Some((id, tx));
        let _slot = SlotGuard::Login {
            dispatcher: self.dispatcher.as_ref(),
            id,
        };

        let code = self.session.connect();
        if code != 0 {
            return Err(BridgeError::LoginFailed { code });
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(0)) => {
                debug!("터미널 로그인 성공");
                Ok(())
            }
            Ok(Ok(code)) => Err(BridgeError::LoginFailed { code }),
            Ok(Err(_)) => Err(BridgeError::LoginFailed { code: -1 }),
            Err(_) => Err(BridgeError::LoginTimeout(timeout)),
        }
    }

    /// 조회 전송 후 응답 대기.
    ///
    /// `extract`는 콜백 안에서 레코드 버퍼를 읽어 결과를 만듭니다.
    pub async fn submit<T, F>(&self, request: &QueryRequest, extract: F) -> BridgeResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&ResponseContext<'_>) -> T + Send + 'static,
    {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let tag = format!("{}#{}", request.name, seq);
        let timeout = request.timeout.unwrap_or(self.request_timeout);

        let (tx, rx) = oneshot::channel();
        let handler: Handler = Box::new(move |ctx| {
            let _ = tx.send(extract(ctx));
        });
        self.dispatcher.arm(tag.clone(), handler)?;
        let _slot = SlotGuard::Request {
            dispatcher: self.dispatcher.as_ref(),
            tag: &tag,
        };

        for (name, value) in &request.params {
            self.session.set_query_param(name, value);
        }

        let code = self.session.submit_query(
            &tag,
            &request.query_code,
            request.continuation,
            &request.channel,
        );
        if code != 0 {
            if SESSION_LOST_CODES.contains(&code) {
                return Err(BridgeError::SessionLost { code });
            }
            return Err(BridgeError::SubmitRejected {
                request: tag.clone(),
                code,
            });
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(BridgeError::CallbackDropped {
                request: tag.clone(),
            }),
            Err(_) => {
                warn!(request = %tag, ?timeout, "응답 시간 초과");
                Err(BridgeError::Timeout {
                    request: tag.clone(),
                    timeout,
                })
            }
        }
    }

    /// 시장별 종목코드 목록
    pub fn instruments_by_listing(&self, listing_code: &str) -> Vec<String> {
        reference::parse_code_list(&self.session.list_instruments_by_venue(listing_code))
    }

    /// 종목명 (없으면 빈 문자열)
    pub fn display_name(&self, code: &str) -> String {
        self.session.resolve_display_name(code).trim().to_string()
    }

    /// 테마 (id, 이름) 목록
    pub fn theme_groups(&self) -> Vec<(String, String)> {
        reference::parse_theme_groups(&self.session.list_theme_groups())
    }

    /// 테마 구성종목 (코드, 시장)
    pub fn theme_members(&self, theme_id: &str) -> Vec<(String, Venue)> {
        reference::parse_theme_members(&self.session.list_theme_members(theme_id))
    }
}

impl std::fmt::Debug for TerminalBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalBridge")
            .field("seq", &self.seq.load(Ordering::Relaxed))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
