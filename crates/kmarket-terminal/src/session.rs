//! 외부 터미널 세션 추상화.
//!
//! 실제 터미널(OpenAPI 컨트롤)은 모든 값을 문자열로 주고받으며, 조회 결과는
//! 별도 디스패치 스레드에서 [`TerminalEvents`] 콜백으로 전달됩니다.
//! 콜백 중에만 유효한 레코드 버퍼는 [`RecordReader`] 참조로 노출됩니다.

use std::sync::Arc;

use crate::codes::CONTINUATION_MORE;

/// 연속조회 구분.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Continuation {
    /// 첫 페이지
    #[default]
    First,
    /// 다음 페이지
    Next,
}

impl Continuation {
    /// 터미널 전송 코드
    pub fn as_code(&self) -> i32 {
        match self {
            Self::First => 0,
            Self::Next => 2,
        }
    }
}

/// 조회 응답 헤더 (요청 식별자 에코).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeader {
    /// 화면번호
    pub channel: String,
    /// 요청명 (브리지가 붙인 요청 태그)
    pub request_name: String,
    /// 조회 코드 (예: OPT10081)
    pub query_code: String,
    /// 레코드명
    pub record_name: String,
    /// 연속조회 플래그 ("2"면 다음 페이지 있음)
    pub continuation: String,
}

impl ResponseHeader {
    pub fn has_more(&self) -> bool {
        self.continuation == CONTINUATION_MORE
    }
}

/// 콜백 동안에만 유효한 레코드 버퍼.
pub trait RecordReader {
    /// 반복 레코드 수
    fn record_count(&self, query_code: &str, record_name: &str) -> usize;

    /// 필드 값 (원시 문자열)
    fn field_value(&self, query_code: &str, record_name: &str, row: usize, field: &str) -> String;
}

/// 추출 함수에 전달되는 응답 컨텍스트.
pub struct ResponseContext<'a> {
    pub header: &'a ResponseHeader,
    pub reader: &'a dyn RecordReader,
}

impl<'a> ResponseContext<'a> {
    pub fn new(header: &'a ResponseHeader, reader: &'a dyn RecordReader) -> Self {
        Self { header, reader }
    }

    /// 응답의 반복 레코드 수
    pub fn record_count(&self) -> usize {
        self.reader
            .record_count(&self.header.query_code, &self.header.record_name)
    }

    /// 앞뒤 공백을 제거한 필드 값
    pub fn field(&self, row: usize, name: &str) -> String {
        self.reader
            .field_value(&self.header.query_code, &self.header.record_name, row, name)
            .trim()
            .to_string()
    }

    pub fn has_more(&self) -> bool {
        self.header.has_more()
    }
}

/// 터미널이 호출하는 이벤트 콜백.
pub trait TerminalEvents: Send + Sync {
    /// 로그인 결과 (0이면 성공)
    fn on_connect(&self, code: i32);

    /// 조회 응답 수신
    fn on_receive(&self, header: &ResponseHeader, reader: &dyn RecordReader);
}

/// 터미널 세션.
///
/// 모든 메서드는 동기 호출이며, 조회 결과는 [`TerminalEvents::on_receive`]로
/// 나중에 전달됩니다. 콜백은 `submit_query` 호출 도중(같은 스레드)에 올 수도 있습니다.
pub trait TerminalSession: Send + Sync {
    /// 이벤트 수신자 등록
    fn attach(&self, events: Arc<dyn TerminalEvents>);

    /// 로그인 시작 (결과는 `on_connect`로 전달). 0이 아니면 즉시 실패.
    fn connect(&self) -> i32;

    /// 다음 조회의 입력값 설정
    fn set_query_param(&self, name: &str, value: &str);

    /// 조회 전송. 0이면 접수, 음수면 거부.
    fn submit_query(
        &self,
        request_name: &str,
        query_code: &str,
        continuation: Continuation,
        channel: &str,
    ) -> i32;

    /// 시장 구분 코드별 종목코드 목록 (`;` 구분)
    fn list_instruments_by_venue(&self, venue_code: &str) -> String;

    /// 종목명
    fn resolve_display_name(&self, code: &str) -> String;

    /// 테마 목록 (`id|name;...`)
    fn list_theme_groups(&self) -> String;

    /// 테마 구성종목 (`A005930;J035720;...`)
    fn list_theme_members(&self, theme_id: &str) -> String;
}
