//! tracing 기반 로깅 초기화.
//!
//! 수집기는 장시간 배치로 실행되므로 사람이 읽는 출력(pretty/compact)과
//! 로그 수집용 JSON 출력을 모두 지원합니다.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// 기본 필터. HTTP 클라이언트 내부 로그는 경고 이상만 출력합니다.
pub const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper=warn";

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 여러 줄 출력 (개발용)
    Pretty,
    /// JSON 한 줄 출력 (로그 수집용)
    Json,
    /// 간결한 한 줄 출력
    #[default]
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" | "" => Ok(Self::Compact),
            other => Err(format!("알 수 없는 로그 형식: {} (pretty, json, compact)", other)),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 필터 지시문 (예: "info", "kmarket_terminal=debug")
    pub level: String,
    /// 출력 형식
    pub format: LogFormat,
    /// 파일명/줄 번호 포함 여부
    pub with_file: bool,
    /// 모듈 경로 포함 여부
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_FILTER.to_string(),
            format: LogFormat::Compact,
            with_file: false,
            with_target: true,
        }
    }
}

impl LogConfig {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_file(mut self, enabled: bool) -> Self {
        self.with_file = enabled;
        self
    }

    /// `RUST_LOG`, `LOG_FORMAT` 환경 변수에서 설정 생성
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.level = level;
        }
        if let Some(format) = std::env::var("LOG_FORMAT").ok().and_then(|s| s.parse().ok()) {
            config.format = format;
        }
        config
    }
}

/// 형식별 출력 layer
fn output_layer(config: &LogConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let base = fmt::layer()
        .with_target(config.with_target)
        .with_file(config.with_file)
        .with_line_number(config.with_file);

    match config.format {
        LogFormat::Pretty => base.pretty().boxed(),
        LogFormat::Json => base.json().boxed(),
        LogFormat::Compact => base.compact().boxed(),
    }
}

/// 전역 subscriber 설치.
///
/// 필터는 `config.level`만 사용합니다. `RUST_LOG`는 [`LogConfig::from_env`]에서 읽습니다.
/// 이미 subscriber가 설치된 상태에서 다시 호출하면 에러를 반환합니다.
///
/// ```no_run
/// use kmarket_core::logging::{init_logging, LogConfig, LogFormat};
///
/// init_logging(LogConfig::new("debug").with_format(LogFormat::Json)).unwrap();
/// ```
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_new(&config.level)?;

    tracing_subscriber::registry()
        .with(output_layer(&config))
        .with(env_filter)
        .try_init()?;

    tracing::debug!(format = ?config.format, level = %config.level, "로깅 초기화 완료");
    Ok(())
}

/// 수집 도메인과 종목코드를 필드로 갖는 span 생성.
#[macro_export]
macro_rules! collect_span {
    ($domain:expr) => {
        tracing::info_span!("collect", domain = %$domain)
    };
    ($domain:expr, $code:expr) => {
        tracing::info_span!("collect", domain = %$domain, code = %$code)
    };
}
