//! 국내 주식 데이터 수집기 CLI.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use kmarket_core::logging::{init_logging, LogConfig, LogFormat};
use kmarket_core::Venue;
use kmarket_collector::{Collector, CollectorConfig, CollectorError, RunSummary};
use kmarket_terminal::sim::ScriptedSession;
use kmarket_terminal::TerminalSession;

#[derive(Parser)]
#[command(name = "kmarket-collector")]
#[command(about = "KRX stock data collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 필터 (예: debug, kmarket_terminal=trace). 없으면 RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    /// 로그 형식 (pretty, json, compact). 없으면 LOG_FORMAT
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// 터미널 리플레이 픽스처 (TERMINAL_FIXTURE 대신)
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// 데이터 디렉터리 (KMARKET_DATA_DIR 대신)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// 초기 적재 (테마/종목, 일봉, 시장지표, 재무)
    Init,

    /// 일별 갱신 (최근 일봉 + 시장지표)
    Daily,

    /// 마지막 저장일 이후 일봉 증분 갱신
    Update,

    /// 테마/종목 갱신
    Weekly,

    /// 분기 재무 갱신 (터미널 불필요)
    Quarterly,

    /// 한 시장의 테마 종목 추가 적재
    Venue {
        /// 시장 (kospi, kosdaq)
        #[arg(long)]
        market: Venue,
    },

    /// 종목 추가 (6자리 종목코드)
    Add {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// 전체 시장 미등록 종목 적재
    All,

    /// 저장소 현황
    Status,
}

impl Commands {
    fn needs_terminal(&self) -> bool {
        !matches!(self, Commands::Quarterly | Commands::Status)
    }
}

/// 터미널 세션 생성
fn open_session(
    config: &CollectorConfig,
    required: bool,
) -> Result<Arc<dyn TerminalSession>, CollectorError> {
    match &config.terminal.fixture {
        Some(path) => {
            tracing::info!(fixture = %path.display(), "리플레이 세션 사용");
            Ok(Arc::new(ScriptedSession::from_fixture_file(path)?))
        }
        None if required => Err(CollectorError::Config(
            "터미널 세션이 없습니다: TERMINAL_FIXTURE 또는 --fixture를 지정하세요".to_string(),
        )),
        None => Ok(Arc::new(ScriptedSession::new())),
    }
}

/// 환경 변수 설정 위에 CLI 옵션 적용
fn log_config(cli: &Cli) -> LogConfig {
    let mut config = LogConfig::from_env();
    if let Some(level) = &cli.log_level {
        config.level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.format = format;
    }
    config
}

fn print_summary(summary: &RunSummary) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    init_logging(log_config(&cli))?;

    tracing::info!("KMarket Data Collector 시작");

    let mut config = CollectorConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(fixture) = cli.fixture {
        config.terminal.fixture = Some(fixture);
    }
    tracing::debug!(data_dir = %config.data_dir.display(), "설정 로드 완료");

    let session = open_session(&config, cli.command.needs_terminal())?;
    let collector = Collector::from_config(config, session)?;

    let summary = match cli.command {
        Commands::Init => collector.run_bootstrap().await?,
        Commands::Daily => collector.run_daily_update().await?,
        Commands::Update => collector.run_incremental_update().await?,
        Commands::Weekly => collector.run_reference_refresh().await?,
        Commands::Quarterly => collector.run_financial_refresh().await?,
        Commands::Venue { market } => collector.run_venue_refresh(market).await?,
        Commands::Add { ids } => collector.run_add_instruments(&ids).await?,
        Commands::All => collector.run_full_market().await?,
        Commands::Status => {
            let status = collector.store_summary()?;
            let partitions: Vec<String> = status.partitions.iter().map(ToString::to_string).collect();
            tracing::info!(
                instruments = status.instruments,
                themes = status.themes,
                partitions = ?partitions,
                watermark = ?status.watermark,
                market_date = ?status.market_date,
                financial_quarter = ?status.financial_quarter.map(|q| q.to_string()),
                "저장소 현황"
            );
            return Ok(());
        }
    };

    print_summary(&summary)?;
    tracing::info!("KMarket Data Collector 종료");

    if let Some(reason) = &summary.aborted {
        return Err(format!("수집 중단: {}", reason).into());
    }
    Ok(())
}
