//! 터미널 연동 에러 타입.

use std::time::Duration;

use kmarket_core::CoreError;
use thiserror::Error;

/// 요청 브리지 에러.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// 이전 요청이 아직 응답을 기다리는 중
    #[error("이미 처리 중인 요청이 있음: {pending}")]
    RequestInFlight { pending: String },

    /// 응답 대기 시간 초과
    #[error("응답 시간 초과 ({request}, {timeout:?})")]
    Timeout { request: String, timeout: Duration },

    /// 터미널이 조회 전송을 거부
    #[error("조회 전송 거부 ({request}): 코드 {code}")]
    SubmitRejected { request: String, code: i32 },

    /// 접속이 끊어짐
    #[error("터미널 접속 끊김: 코드 {code}")]
    SessionLost { code: i32 },

    /// 응답 콜백이 결과 없이 종료됨
    #[error("응답 콜백이 결과를 전달하지 못함: {request}")]
    CallbackDropped { request: String },

    /// 로그인 거부
    #[error("로그인 실패: 코드 {code}")]
    LoginFailed { code: i32 },

    /// 로그인 응답 없음
    #[error("로그인 응답 시간 초과 ({0:?})")]
    LoginTimeout(Duration),
}

impl BridgeError {
    /// 배치 전체를 중단해야 하는 에러인지 확인
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SessionLost { .. } | Self::LoginFailed { .. } | Self::LoginTimeout(_)
        )
    }
}

/// 브리지 작업 Result 타입.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// 응답 레코드 디코딩 에러.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    /// 필드 값을 지정한 타입으로 변환할 수 없음
    #[error("{row}행 파싱 실패: {source}")]
    Parse {
        row: usize,
        #[source]
        source: CoreError,
    },

    /// 스키마에 없는 필드 조회
    #[error("레코드에 필드 없음: {0}")]
    MissingField(String),

    /// 필드 타입 불일치
    #[error("필드 타입 불일치: {field} ({expected})")]
    KindMismatch {
        field: String,
        expected: &'static str,
    },
}
