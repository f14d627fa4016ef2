//! 콜백 기반 증권사 터미널 세션 연동.
//!
//! 터미널은 한 번에 하나의 조회만 처리하며, 결과는 나중에 이벤트 콜백으로
//! 전달됩니다. 이 crate는 그 프로토콜을 타임아웃이 있는 `async` 호출로
//! 바꿔 줍니다.
//!
//! - [`session`]: 외부 터미널 세션 추상화와 콜백 수신 트레이트
//! - [`bridge`]: 단일 요청 규칙과 타임아웃을 보장하는 요청 브리지
//! - [`assembler`]: 반복 레코드 응답을 스키마에 맞춰 디코딩
//! - [`reference`]: 종목 목록/테마 문자열 파싱
//! - [`sim`]: 스크립트/픽스처 기반 세션 (테스트, 리플레이용)

pub mod assembler;
pub mod bridge;
pub mod codes;
pub mod error;
pub mod reference;
pub mod session;
pub mod sim;

pub use assembler::{assemble, assemble_single, FieldKind, FieldValue, Page, Record, ResponseSchema};
pub use bridge::{QueryRequest, TerminalBridge};
pub use error::{AssemblyError, BridgeError, BridgeResult};
pub use session::{Continuation, RecordReader, ResponseContext, ResponseHeader, TerminalEvents, TerminalSession};
