//! 국내 주식 데이터 수집기의 핵심 도메인 모델.
//!
//! 이 crate는 다음을 제공합니다:
//! - 종목/테마/일봉/시장지표/재무 도메인 타입
//! - 월 파티션 키와 분기 라벨 계산
//! - 원천 단위(백만원, 억원) → 원 단위 변환
//! - 보통주가 아닌 종목(ETF, 스팩, 우선주 등) 제외 필터
//! - tracing 기반 로깅 초기화

pub mod domain;
pub mod error;
pub mod filter;
pub mod logging;
pub mod units;

pub use domain::*;
pub use error::{CoreError, CoreResult};
pub use filter::is_excluded;
