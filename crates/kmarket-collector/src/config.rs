//! 환경변수 기반 설정 모듈.

use crate::error::CollectorError;
use crate::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터 저장 디렉터리
    pub data_dir: PathBuf,
    /// 터미널 세션 설정
    pub terminal: TerminalConfig,
    /// 일봉 수집 설정
    pub price: PriceCollectConfig,
    /// 시장지표 수집 설정
    pub market: MarketCollectConfig,
    /// 테마 수집 설정
    pub theme: ThemeCollectConfig,
    /// 재무 수집 설정
    pub financial: FinancialCollectConfig,
    /// 진행 상황 로그 주기 (종목 수)
    pub progress_every: usize,
}

/// 터미널 세션 설정
#[derive(Debug, Clone)]
pub struct TerminalConfig {
    /// 리플레이 픽스처 경로
    pub fixture: Option<PathBuf>,
    /// 로그인 대기 시간 (초)
    pub login_timeout_secs: u64,
    /// 조회 응답 대기 시간 (초)
    pub request_timeout_secs: u64,
}

/// 일봉 수집 설정
#[derive(Debug, Clone)]
pub struct PriceCollectConfig {
    /// 조회 간 최소 간격 (밀리초)
    pub request_interval_ms: u64,
    /// 초기 적재 일수
    pub bootstrap_days: usize,
    /// 증분 갱신 시 추가로 요청할 거래일 수
    pub safety_margin_days: u32,
    /// 마지막 저장일 탐색 대상 파티션 수
    pub watermark_lookback_months: usize,
}

/// 시장지표 수집 설정
#[derive(Debug, Clone)]
pub struct MarketCollectConfig {
    /// 조회 간 최소 간격 (밀리초)
    pub request_interval_ms: u64,
}

/// 테마 수집 설정
#[derive(Debug, Clone)]
pub struct ThemeCollectConfig {
    /// 테마별 구성종목 조회 간격 (밀리초)
    pub request_interval_ms: u64,
}

/// 재무 수집 설정
#[derive(Debug, Clone)]
pub struct FinancialCollectConfig {
    /// 요청 간 최소 간격 (밀리초)
    pub request_interval_ms: u64,
    /// HTTP 요청 타임아웃 (초)
    pub http_timeout_secs: u64,
    /// 네이버 금융 주소
    pub base_url: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("web/data"),
            terminal: TerminalConfig {
                fixture: None,
                login_timeout_secs: 60,
                request_timeout_secs: 10,
            },
            price: PriceCollectConfig {
                request_interval_ms: 3700,
                bootstrap_days: 70,
                safety_margin_days: 5,
                watermark_lookback_months: 3,
            },
            market: MarketCollectConfig {
                request_interval_ms: 3700,
            },
            theme: ThemeCollectConfig {
                request_interval_ms: 500,
            },
            financial: FinancialCollectConfig {
                request_interval_ms: 300,
                http_timeout_secs: 10,
                base_url: kmarket_data::provider::naver::DEFAULT_BASE_URL.to_string(),
            },
            progress_every: 100,
        }
    }
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            data_dir: std::env::var("KMARKET_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            terminal: TerminalConfig {
                fixture: std::env::var("TERMINAL_FIXTURE").ok().map(PathBuf::from),
                login_timeout_secs: env_var_parse(
                    "TERMINAL_LOGIN_TIMEOUT_SECS",
                    defaults.terminal.login_timeout_secs,
                ),
                request_timeout_secs: env_var_parse(
                    "TERMINAL_REQUEST_TIMEOUT_SECS",
                    defaults.terminal.request_timeout_secs,
                ),
            },
            price: PriceCollectConfig {
                request_interval_ms: env_var_parse(
                    "PRICE_REQUEST_INTERVAL_MS",
                    defaults.price.request_interval_ms,
                ),
                bootstrap_days: env_var_parse("PRICE_BOOTSTRAP_DAYS", defaults.price.bootstrap_days),
                safety_margin_days: env_var_parse(
                    "PRICE_SAFETY_MARGIN_DAYS",
                    defaults.price.safety_margin_days,
                ),
                watermark_lookback_months: env_var_parse(
                    "PRICE_WATERMARK_LOOKBACK_MONTHS",
                    defaults.price.watermark_lookback_months,
                ),
            },
            market: MarketCollectConfig {
                request_interval_ms: env_var_parse(
                    "MARKET_REQUEST_INTERVAL_MS",
                    defaults.market.request_interval_ms,
                ),
            },
            theme: ThemeCollectConfig {
                request_interval_ms: env_var_parse(
                    "THEME_REQUEST_INTERVAL_MS",
                    defaults.theme.request_interval_ms,
                ),
            },
            financial: FinancialCollectConfig {
                request_interval_ms: env_var_parse(
                    "FINANCIAL_REQUEST_INTERVAL_MS",
                    defaults.financial.request_interval_ms,
                ),
                http_timeout_secs: env_var_parse(
                    "FINANCIAL_HTTP_TIMEOUT_SECS",
                    defaults.financial.http_timeout_secs,
                ),
                base_url: std::env::var("FINANCIAL_BASE_URL")
                    .unwrap_or(defaults.financial.base_url),
            },
            progress_every: env_var_parse("PROGRESS_EVERY", defaults.progress_every),
        };

        config.validate()?;
        Ok(config)
    }

    /// 설정값 검증
    pub fn validate(&self) -> Result<()> {
        if self.progress_every == 0 {
            return Err(CollectorError::Config(
                "PROGRESS_EVERY는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.price.bootstrap_days == 0 {
            return Err(CollectorError::Config(
                "PRICE_BOOTSTRAP_DAYS는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.price.watermark_lookback_months == 0 {
            return Err(CollectorError::Config(
                "PRICE_WATERMARK_LOOKBACK_MONTHS는 1 이상이어야 합니다".to_string(),
            ));
        }
        Ok(())
    }
}

impl TerminalConfig {
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PriceCollectConfig {
    /// 조회 간 최소 간격을 Duration으로 반환
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }
}

impl MarketCollectConfig {
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }
}

impl ThemeCollectConfig {
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }
}

impl FinancialCollectConfig {
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
