//! 핵심 도메인 에러 타입.

use thiserror::Error;

/// 도메인 값 파싱/검증 에러.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// 잘못된 날짜 문자열
    #[error("잘못된 날짜: {0}")]
    InvalidDate(String),

    /// 잘못된 월 파티션 키 (YYYY-MM)
    #[error("잘못된 월 파티션 키: {0}")]
    InvalidMonthKey(String),

    /// 잘못된 분기 라벨 (YYYY-Qn)
    #[error("잘못된 분기 라벨: {0}")]
    InvalidQuarter(String),

    /// 숫자 변환 실패
    #[error("숫자 변환 실패 ({field}): {value:?}")]
    InvalidNumber { field: String, value: String },

    /// 알 수 없는 시장 구분
    #[error("알 수 없는 시장 구분: {0}")]
    UnknownVenue(String),

    /// 잘못된 종목코드
    #[error("잘못된 종목코드: {0}")]
    InvalidCode(String),
}

/// 핵심 도메인 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;
