//! 수집 워크플로우.
//!
//! 각 워크플로우는 실행 상태를 점유한 뒤 도메인 순서대로 배치를 돌리고,
//! 컬렉션별 기록 건수를 담은 [`RunSummary`]를 반환합니다.
//!
//! | 워크플로우 | 터미널 | 종목 | 테마 | 일봉 | 시장지표 | 재무 |
//! |---|---|---|---|---|---|---|
//! | bootstrap | O | 교체 | 교체 | 교체 | 교체 | 교체 |
//! | daily | O | - | - | 병합 (1일) | 교체 | - |
//! | incremental | O | - | - | 병합 (종목별 저장일 이후) | 교체 | - |
//! | reference | O | 병합 | 교체 | - | - | - |
//! | financial | X | - | - | - | - | 교체 |
//! | venue / add / all | O | 병합 | 병합 | 병합 | 병합 | 병합 |

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use kmarket_core::{
    estimate_trading_days, is_valid_code, DailyBar, FinancialFigure, MarketStat, QuarterLabel,
    Venue,
};
use kmarket_data::StoreSummary;
use tracing::{info, warn};

use super::daily_bars::DailyBarFetcher;
use super::financials::FinancialFetcher;
use super::market_stats::MarketStatFetcher;
use super::orchestrator::{BatchOutcome, BatchRunner};
use super::reference_sync::{collect_themes, merge_themes, resolve_listed, MarketUniverse};
use super::Collector;
use crate::error::CollectorError;
use crate::stats::{CollectionStats, RunSummary};
use crate::status::{CrawlGuard, CrawlKind};
use crate::Result;

/// 스냅샷/파티션 쓰기 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    /// 이번 수집 결과로 교체
    Replace,
    /// 기존 데이터에 종목 단위로 병합 (나중 값 우선)
    Merge,
}

/// 도메인 통계를 요약에 기록. 중단됐으면 `true`.
fn absorb<T>(summary: &mut RunSummary, domain: &str, outcome: &BatchOutcome<T>) -> bool {
    summary.record_domain(domain, outcome.stats.clone());
    if let Some(reason) = &outcome.aborted {
        summary.aborted = Some(format!("{}: {}", domain, reason));
        return true;
    }
    false
}

/// 실행 상태 해제와 요약 로그
fn complete(guard: CrawlGuard, summary: RunSummary) -> RunSummary {
    let state = if summary.aborted.is_some() {
        "중단"
    } else if summary.is_complete() {
        "완료"
    } else {
        "일부 저장 실패"
    };
    guard.finish(format!("{} {}", summary.workflow, state));
    summary.log();
    summary
}

impl Collector {
    fn runner(&self, interval: std::time::Duration) -> BatchRunner {
        BatchRunner::new(interval, self.config.progress_every)
    }

    /// 저장된 전체 종목코드. 없으면 `EmptyUniverse`.
    fn stored_codes(&self) -> Result<Vec<String>> {
        let instruments = self.store.load_instruments()?;
        if instruments.is_empty() {
            return Err(CollectorError::EmptyUniverse);
        }
        Ok(instruments.into_keys().collect())
    }

    async fn collect_bars(
        &self,
        codes: &[String],
        count: usize,
        stored_until: BTreeMap<String, NaiveDate>,
    ) -> BatchOutcome<Vec<DailyBar>> {
        let fetcher = DailyBarFetcher::new(Arc::clone(&self.bridge), self.today(), count)
            .after_stored(stored_until);
        self.runner(self.config.price.request_interval())
            .run(&fetcher, codes)
            .await
    }

    async fn collect_market(&self, codes: &[String]) -> BatchOutcome<MarketStat> {
        let fetcher = MarketStatFetcher::new(Arc::clone(&self.bridge));
        self.runner(self.config.market.request_interval())
            .run(&fetcher, codes)
            .await
    }

    async fn collect_financial(&self, codes: &[String]) -> BatchOutcome<FinancialFigure> {
        let fetcher = FinancialFetcher::new(Arc::clone(&self.financial));
        self.runner(self.config.financial.request_interval())
            .run(&fetcher, codes)
            .await
    }

    fn persist_bars(
        &self,
        summary: &mut RunSummary,
        bars: &BTreeMap<String, Vec<DailyBar>>,
        mode: WriteMode,
    ) {
        let written = match mode {
            WriteMode::Replace => self.store.replace_bars(bars),
            WriteMode::Merge => self.store.merge_bars(bars),
        };
        match written {
            Ok(months) => {
                let count = bars.values().map(Vec::len).sum();
                summary.record_count("prices", count);
                summary.record_count("partitions", months.len());
                info!(bars = count, partitions = months.len(), "일봉 저장 완료");
            }
            Err(e) => {
                tracing::error!(error = %e, "일봉 저장 실패, 이전 파티션 유지");
                summary.record_failure("prices");
            }
        }
    }

    fn persist_market(
        &self,
        summary: &mut RunSummary,
        stats: BTreeMap<String, MarketStat>,
        mode: WriteMode,
    ) {
        let today = self.today();
        let count = stats.len();
        self.persist(summary, "market", count, |store| {
            let data = match mode {
                WriteMode::Replace => stats,
                WriteMode::Merge => {
                    let mut data = store.load_market()?.data;
                    data.extend(stats);
                    data
                }
            };
            store.save_market(today, data)
        });
    }

    fn persist_financial(
        &self,
        summary: &mut RunSummary,
        figures: BTreeMap<String, FinancialFigure>,
        mode: WriteMode,
    ) {
        let quarter = QuarterLabel::latest_reported(self.today());
        let count = figures.len();
        self.persist(summary, "financial", count, |store| {
            let data = match mode {
                WriteMode::Replace => figures,
                WriteMode::Merge => {
                    let mut data = store.load_financial()?.data;
                    data.extend(figures);
                    data
                }
            };
            store.save_financial(quarter, data)
        });
    }

    /// 종목 목록의 일봉/시장지표/재무 초기 적재.
    ///
    /// 도메인이 치명적 에러로 중단되면 그때까지의 결과만 저장하고 나머지 도메인은 건너뜁니다.
    async fn bootstrap_codes(
        &self,
        guard: &CrawlGuard,
        summary: &mut RunSummary,
        codes: &[String],
        mode: WriteMode,
    ) {
        let days = self.config.price.bootstrap_days;

        guard.set_message(format!("일봉 수집 ({}개 종목, {}일)", codes.len(), days));
        let bars = self.collect_bars(codes, days, BTreeMap::new()).await;
        self.persist_bars(summary, &bars.results, mode);
        if absorb(summary, "prices", &bars) {
            return;
        }

        guard.set_message(format!("시장지표 수집 ({}개 종목)", codes.len()));
        let market = self.collect_market(codes).await;
        let aborted = absorb(summary, "market", &market);
        self.persist_market(summary, market.results, mode);
        if aborted {
            return;
        }

        guard.set_message(format!("재무 수집 ({}개 종목)", codes.len()));
        let financial = self.collect_financial(codes).await;
        absorb(summary, "financial", &financial);
        self.persist_financial(summary, financial.results, mode);
    }

    /// 초기 적재.
    ///
    /// 테마 구성종목과 시장 전체 종목(ETF 제외)을 필터링해 종목/테마를 새로 만들고,
    /// 최근 일봉, 시장지표, 재무를 수집해 저장소를 교체합니다.
    pub async fn run_bootstrap(&self) -> Result<RunSummary> {
        let guard = self.status.try_begin(CrawlKind::Bootstrap)?;
        let mut summary = RunSummary::new(CrawlKind::Bootstrap.as_str());

        self.login().await?;
        self.store.init()?;

        guard.set_message("테마/종목 수집");
        let theme_runner = self.runner(self.config.theme.request_interval());
        let (reference, outcome) = collect_themes(&self.bridge, &theme_runner, None).await;
        if absorb(&mut summary, "themes", &outcome) {
            return Ok(complete(guard, summary));
        }

        let mut instruments = reference.instruments;
        let universe = MarketUniverse::load(&self.bridge);
        let extra: Vec<String> = universe
            .codes()
            .into_iter()
            .filter(|code| !instruments.contains_key(code))
            .collect();
        let resolved = resolve_listed(&self.bridge, &universe, &extra, true);
        info!(
            added = resolved.instruments.len(),
            excluded = resolved.excluded,
            unresolved = resolved.unresolved,
            "테마 외 종목 추가"
        );
        instruments.extend(resolved.instruments);

        if instruments.is_empty() {
            return Err(CollectorError::EmptyUniverse);
        }

        self.persist(&mut summary, "stocks", instruments.len(), |store| {
            store.save_instruments(&instruments)
        });
        self.persist(&mut summary, "themes", reference.themes.len(), |store| {
            store.save_themes(&reference.themes)
        });

        let codes: Vec<String> = instruments.into_keys().collect();
        self.bootstrap_codes(&guard, &mut summary, &codes, WriteMode::Replace)
            .await;

        Ok(complete(guard, summary))
    }

    /// 일별 갱신: 저장된 전 종목의 최근 1일 일봉 병합, 시장지표 교체
    pub async fn run_daily_update(&self) -> Result<RunSummary> {
        let guard = self.status.try_begin(CrawlKind::Daily)?;
        let mut summary = RunSummary::new(CrawlKind::Daily.as_str());

        let codes = self.stored_codes()?;
        self.login().await?;

        guard.set_message(format!("일봉 수집 ({}개 종목)", codes.len()));
        let bars = self.collect_bars(&codes, 1, BTreeMap::new()).await;
        self.persist_bars(&mut summary, &bars.results, WriteMode::Merge);
        if absorb(&mut summary, "prices", &bars) {
            return Ok(complete(guard, summary));
        }

        guard.set_message(format!("시장지표 수집 ({}개 종목)", codes.len()));
        let market = self.collect_market(&codes).await;
        absorb(&mut summary, "market", &market);
        self.persist_market(&mut summary, market.results, WriteMode::Replace);

        Ok(complete(guard, summary))
    }

    /// 증분 갱신.
    ///
    /// 마지막 저장일(워터마크) 이후 거래일 수를 넉넉히 추정해 조회합니다.
    /// 종목마다 자기 마지막 저장일 이후 일봉만 병합하므로, 이전 실행에서 밀린 종목은
    /// 받은 범위 안에서 빠진 날짜가 채워집니다.
    pub async fn run_incremental_update(&self) -> Result<RunSummary> {
        let guard = self.status.try_begin(CrawlKind::Incremental)?;
        let mut summary = RunSummary::new(CrawlKind::Incremental.as_str());
        let today = self.today();

        let stored_until = self
            .store
            .latest_dates(self.config.price.watermark_lookback_months)?;
        let watermark = stored_until
            .values()
            .max()
            .copied()
            .ok_or(CollectorError::MissingBaseline)?;

        if watermark >= today {
            summary.note = Some(format!("이미 최신 데이터 ({})까지 저장됨", watermark));
            return Ok(complete(guard, summary));
        }

        let codes = self.stored_codes()?;
        let days =
            estimate_trading_days(watermark, today, self.config.price.safety_margin_days) as usize;
        info!(%watermark, %today, days, "증분 갱신 범위");

        self.login().await?;

        guard.set_message(format!("일봉 수집 ({}개 종목, {}일)", codes.len(), days));
        let bars = self.collect_bars(&codes, days, stored_until).await;
        self.persist_bars(&mut summary, &bars.results, WriteMode::Merge);
        if absorb(&mut summary, "prices", &bars) {
            return Ok(complete(guard, summary));
        }

        guard.set_message(format!("시장지표 수집 ({}개 종목)", codes.len()));
        let market = self.collect_market(&codes).await;
        absorb(&mut summary, "market", &market);
        self.persist_market(&mut summary, market.results, WriteMode::Replace);

        Ok(complete(guard, summary))
    }

    /// 기준정보 갱신: 테마 교체, 테마 구성종목을 기존 종목에 병합
    pub async fn run_reference_refresh(&self) -> Result<RunSummary> {
        let guard = self.status.try_begin(CrawlKind::Reference)?;
        let mut summary = RunSummary::new(CrawlKind::Reference.as_str());

        self.login().await?;

        guard.set_message("테마/종목 수집");
        let theme_runner = self.runner(self.config.theme.request_interval());
        let (reference, outcome) = collect_themes(&self.bridge, &theme_runner, None).await;
        if absorb(&mut summary, "themes", &outcome) {
            return Ok(complete(guard, summary));
        }
        if reference.themes.is_empty() {
            summary.note = Some("조회된 테마 없음, 기존 데이터 유지".to_string());
            return Ok(complete(guard, summary));
        }

        let mut instruments = self.store.load_instruments()?;
        instruments.extend(reference.instruments);
        self.persist(&mut summary, "stocks", instruments.len(), |store| {
            store.save_instruments(&instruments)
        });
        self.persist(&mut summary, "themes", reference.themes.len(), |store| {
            store.save_themes(&reference.themes)
        });

        Ok(complete(guard, summary))
    }

    /// 재무 갱신 (네이버 금융만 사용, 터미널 로그인 없음)
    pub async fn run_financial_refresh(&self) -> Result<RunSummary> {
        let guard = self.status.try_begin(CrawlKind::Financial)?;
        let mut summary = RunSummary::new(CrawlKind::Financial.as_str());

        let codes = self.stored_codes()?;

        guard.set_message(format!("재무 수집 ({}개 종목)", codes.len()));
        let financial = self.collect_financial(&codes).await;
        absorb(&mut summary, "financial", &financial);
        self.persist_financial(&mut summary, financial.results, WriteMode::Replace);

        Ok(complete(guard, summary))
    }

    /// 시장 단위 갱신.
    ///
    /// 해당 시장 테마 구성종목을 기존 종목/테마에 병합하고, 그 종목들의 데이터를 적재합니다.
    pub async fn run_venue_refresh(&self, venue: Venue) -> Result<RunSummary> {
        let guard = self.status.try_begin(CrawlKind::Venue)?;
        let mut summary = RunSummary::new(format!(
            "{}_{}",
            CrawlKind::Venue,
            venue.as_str().to_lowercase()
        ));

        self.login().await?;

        guard.set_message(format!("{} 테마/종목 수집", venue));
        let theme_runner = self.runner(self.config.theme.request_interval());
        let (reference, outcome) = collect_themes(&self.bridge, &theme_runner, Some(venue)).await;
        if absorb(&mut summary, "themes", &outcome) {
            return Ok(complete(guard, summary));
        }

        let codes = reference.codes();
        if codes.is_empty() {
            summary.note = Some(format!("{} 테마 구성종목 없음", venue));
            return Ok(complete(guard, summary));
        }

        let mut instruments = self.store.load_instruments()?;
        instruments.extend(reference.instruments);
        let mut themes = self.store.load_themes()?;
        merge_themes(&mut themes, reference.themes);

        self.persist(&mut summary, "stocks", instruments.len(), |store| {
            store.save_instruments(&instruments)
        });
        self.persist(&mut summary, "themes", themes.len(), |store| {
            store.save_themes(&themes)
        });

        info!(venue = %venue, instruments = codes.len(), "시장 종목 적재 시작");
        self.bootstrap_codes(&guard, &mut summary, &codes, WriteMode::Merge)
            .await;

        Ok(complete(guard, summary))
    }

    /// 종목 추가.
    ///
    /// 6자리 코드만 받으며, 이미 저장된 종목과 이름을 확인할 수 없는 종목은 건너뜁니다.
    /// 사용자가 직접 지정한 종목이므로 제외 필터는 적용하지 않습니다.
    pub async fn run_add_instruments(&self, ids: &[String]) -> Result<RunSummary> {
        let guard = self.status.try_begin(CrawlKind::AddInstruments)?;
        let mut summary = RunSummary::new(CrawlKind::AddInstruments.as_str());
        let mut stats = CollectionStats::new();

        let mut existing = self.store.load_instruments()?;
        let mut candidates: Vec<String> = Vec::new();
        for raw in ids {
            let code = raw.trim();
            stats.total += 1;
            if !is_valid_code(code) {
                warn!(code, "잘못된 종목코드, 건너뜀");
                stats.skipped += 1;
                continue;
            }
            if existing.contains_key(code) || candidates.iter().any(|c| c == code) {
                info!(code, "이미 등록된 종목, 건너뜀");
                stats.skipped += 1;
                continue;
            }
            candidates.push(code.to_string());
        }

        if candidates.is_empty() {
            summary.record_domain("stocks", stats);
            summary.note = Some("추가할 종목 없음".to_string());
            return Ok(complete(guard, summary));
        }

        self.login().await?;

        let universe = MarketUniverse::load(&self.bridge);
        let resolved = resolve_listed(&self.bridge, &universe, &candidates, false);
        stats.success = resolved.instruments.len();
        stats.empty = resolved.unresolved;
        summary.record_domain("stocks", stats);

        if resolved.instruments.is_empty() {
            summary.note = Some("종목명을 확인할 수 있는 종목 없음".to_string());
            return Ok(complete(guard, summary));
        }

        let codes: Vec<String> = resolved.instruments.keys().cloned().collect();
        existing.extend(resolved.instruments);
        self.persist(&mut summary, "stocks", existing.len(), |store| {
            store.save_instruments(&existing)
        });

        self.bootstrap_codes(&guard, &mut summary, &codes, WriteMode::Merge)
            .await;

        Ok(complete(guard, summary))
    }

    /// 전체 시장 적재: 유가증권+코스닥(ETF 제외) 중 미등록 보통주 추가
    pub async fn run_full_market(&self) -> Result<RunSummary> {
        let guard = self.status.try_begin(CrawlKind::FullMarket)?;
        let mut summary = RunSummary::new(CrawlKind::FullMarket.as_str());

        self.login().await?;

        let mut existing = self.store.load_instruments()?;
        let universe = MarketUniverse::load(&self.bridge);
        let new_codes: Vec<String> = universe
            .codes()
            .into_iter()
            .filter(|code| !existing.contains_key(code))
            .collect();

        if new_codes.is_empty() {
            summary.note = Some("추가할 종목 없음".to_string());
            return Ok(complete(guard, summary));
        }

        guard.set_message(format!("종목명 확인 ({}개)", new_codes.len()));
        let resolved = resolve_listed(&self.bridge, &universe, &new_codes, true);
        info!(
            candidates = new_codes.len(),
            added = resolved.instruments.len(),
            excluded = resolved.excluded,
            "미등록 종목 확인"
        );
        if resolved.instruments.is_empty() {
            summary.note = Some("추가할 보통주 없음".to_string());
            return Ok(complete(guard, summary));
        }

        let codes: Vec<String> = resolved.instruments.keys().cloned().collect();
        existing.extend(resolved.instruments);
        self.persist(&mut summary, "stocks", existing.len(), |store| {
            store.save_instruments(&existing)
        });

        self.bootstrap_codes(&guard, &mut summary, &codes, WriteMode::Merge)
            .await;

        Ok(complete(guard, summary))
    }

    /// 저장소 현황
    pub fn store_summary(&self) -> Result<StoreSummary> {
        Ok(self
            .store
            .summary(self.config.price.watermark_lookback_months)?)
    }
}
