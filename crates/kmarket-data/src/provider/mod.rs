//! 외부 HTTP 데이터 소스.

pub mod naver;
