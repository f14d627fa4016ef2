//! 기준정보 동기화 (테마, 종목).
//!
//! 테마 목록과 구성종목을 읽어 보통주만 남기고, 시장별 종목 목록에서
//! ETF를 뺀 전체 유니버스를 계산합니다. 제외 필터는 수집 시점에만 적용하며
//! 이미 저장된 종목에는 소급하지 않습니다.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use kmarket_core::{is_excluded, Instrument, InstrumentInfo, Theme, Venue};
use kmarket_terminal::codes::listing;
use kmarket_terminal::TerminalBridge;
use tracing::{debug, info};

use super::orchestrator::{BatchOutcome, BatchRunner, DomainFetcher, FetchError};

/// 테마별 구성종목 조회.
///
/// 종목명을 확인할 수 없거나 제외 대상인 종목은 빼고, `venue`가 지정되면
/// 그 시장 종목만 남깁니다.
pub struct ThemeMemberFetcher {
    bridge: Arc<TerminalBridge>,
    venue: Option<Venue>,
}

impl ThemeMemberFetcher {
    pub fn new(bridge: Arc<TerminalBridge>, venue: Option<Venue>) -> Self {
        Self { bridge, venue }
    }
}

#[async_trait]
impl DomainFetcher for ThemeMemberFetcher {
    type Output = Vec<Instrument>;

    fn domain(&self) -> &'static str {
        "themes"
    }

    async fn fetch(&self, theme_id: &str) -> Result<Option<Vec<Instrument>>, FetchError> {
        let mut members = Vec::new();
        for (code, venue) in self.bridge.theme_members(theme_id) {
            if self.venue.is_some_and(|only| only != venue) {
                continue;
            }
            let name = self.bridge.display_name(&code);
            if name.is_empty() {
                debug!(theme_id, code = %code, "종목명 없음, 건너뜀");
                continue;
            }
            if is_excluded(&name) {
                continue;
            }
            members.push(Instrument::new(code, name, venue));
        }
        Ok(Some(members))
    }
}

/// 테마 수집 결과
#[derive(Debug, Default)]
pub struct ReferenceSet {
    /// 테마 구성종목에서 모은 종목
    pub instruments: BTreeMap<String, InstrumentInfo>,
    /// 필터링된 구성종목을 가진 테마 (조회 순서)
    pub themes: Vec<Theme>,
}

impl ReferenceSet {
    /// 테마 배치 결과 정리. 조회에 실패한 테마는 빠집니다.
    pub fn from_batch(
        groups: &[(String, String)],
        outcome: &BatchOutcome<Vec<Instrument>>,
    ) -> Self {
        let mut set = Self::default();
        for (id, name) in groups {
            let Some(members) = outcome.results.get(id) else {
                continue;
            };
            let codes = members.iter().map(|m| m.code.clone()).collect();
            for member in members {
                let (code, info) = member.clone().into_entry();
                set.instruments.insert(code, info);
            }
            set.themes.push(Theme::new(id.clone(), name.clone(), codes));
        }
        set
    }

    /// 구성종목 코드 목록
    pub fn codes(&self) -> Vec<String> {
        self.instruments.keys().cloned().collect()
    }
}

/// 전체 테마 구성종목 수집
pub async fn collect_themes(
    bridge: &Arc<TerminalBridge>,
    runner: &BatchRunner,
    venue: Option<Venue>,
) -> (ReferenceSet, BatchOutcome<Vec<Instrument>>) {
    let groups = bridge.theme_groups();
    info!(themes = groups.len(), venue = ?venue, "테마 목록 조회");

    let ids: Vec<String> = groups.iter().map(|(id, _)| id.clone()).collect();
    let fetcher = ThemeMemberFetcher::new(Arc::clone(bridge), venue);
    let outcome = runner.run(&fetcher, &ids).await;

    let set = ReferenceSet::from_batch(&groups, &outcome);
    info!(
        themes = set.themes.len(),
        instruments = set.instruments.len(),
        "테마 구성종목 수집 완료"
    );
    (set, outcome)
}

/// 시장별 상장 종목 (ETF 제외)
#[derive(Debug, Clone, Default)]
pub struct MarketUniverse {
    pub kospi: BTreeSet<String>,
    pub kosdaq: BTreeSet<String>,
}

impl MarketUniverse {
    /// 유가증권/코스닥 목록에서 ETF 목록을 뺀 유니버스
    pub fn load(bridge: &TerminalBridge) -> Self {
        let etf: BTreeSet<String> = bridge.instruments_by_listing(listing::ETF).into_iter().collect();
        let listed = |code: &str| -> BTreeSet<String> {
            bridge
                .instruments_by_listing(code)
                .into_iter()
                .filter(|c| !etf.contains(c))
                .collect()
        };

        let universe = Self {
            kospi: listed(listing::KOSPI),
            kosdaq: listed(listing::KOSDAQ),
        };
        info!(
            kospi = universe.kospi.len(),
            kosdaq = universe.kosdaq.len(),
            etf = etf.len(),
            "시장 종목 목록 조회"
        );
        universe
    }

    /// 코스닥 목록에 있으면 코스닥, 아니면 유가증권
    pub fn venue_of(&self, code: &str) -> Venue {
        if self.kosdaq.contains(code) {
            Venue::Kosdaq
        } else {
            Venue::Kospi
        }
    }

    /// 두 시장 합집합 (정렬)
    pub fn codes(&self) -> BTreeSet<String> {
        self.kospi.union(&self.kosdaq).cloned().collect()
    }
}

/// 종목명 확인 결과
#[derive(Debug, Default)]
pub struct Resolved {
    pub instruments: BTreeMap<String, InstrumentInfo>,
    /// 제외 필터에 걸린 종목 수
    pub excluded: usize,
    /// 종목명을 확인할 수 없는 종목 수
    pub unresolved: usize,
}

/// 종목코드의 이름과 시장 확인.
///
/// `apply_filter`가 참이면 제외 대상 종목은 빼고 센다.
pub fn resolve_listed<'a, I>(
    bridge: &TerminalBridge,
    universe: &MarketUniverse,
    codes: I,
    apply_filter: bool,
) -> Resolved
where
    I: IntoIterator<Item = &'a String>,
{
    let mut resolved = Resolved::default();
    for code in codes {
        let name = bridge.display_name(code);
        if name.is_empty() {
            resolved.unresolved += 1;
            continue;
        }
        if apply_filter && is_excluded(&name) {
            resolved.excluded += 1;
            continue;
        }
        resolved.instruments.insert(
            code.clone(),
            InstrumentInfo {
                name,
                market: universe.venue_of(code),
            },
        );
    }
    resolved
}

/// 기존 테마에 새 구성종목 합집합 병합. 없는 테마는 추가합니다.
pub fn merge_themes(existing: &mut Vec<Theme>, incoming: Vec<Theme>) {
    for theme in incoming {
        if theme.stocks.is_empty() {
            continue;
        }
        match existing.iter_mut().find(|t| t.id == theme.id) {
            Some(current) => current.union_members(theme.stocks),
            None => existing.push(theme),
        }
    }
}
