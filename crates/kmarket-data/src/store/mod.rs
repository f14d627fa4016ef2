//! 월 파티션 JSON 파일 저장소.
//!
//! 디렉터리 구조:
//!
//! ```text
//! {data_dir}/
//!   stocks.json          종목코드 → {name, market}
//!   themes.json          {"themes": [{id, name, stocks}]}
//!   market.json          {"date", "data": 종목코드 → 시장지표}
//!   financial.json       {"quarter", "data": 종목코드 → 재무}
//!   prices/YYYY-MM.json  종목코드 → 날짜 → 일봉
//! ```
//!
//! 모든 쓰기는 임시 파일에 기록한 뒤 rename으로 교체합니다. 쓰기가 실패해도
//! 이전 버전 파일은 그대로 남습니다. 없는 파일이나 빈 파일은 빈 값으로 읽고,
//! 해석할 수 없는 파일은 [`StoreError::Corrupt`]로 보고합니다.

mod prices;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use kmarket_core::{FinancialFigure, InstrumentInfo, MarketStat, MonthKey, QuarterLabel, Theme};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};

pub use prices::PricePartition;

const STOCKS_FILE: &str = "stocks.json";
const THEMES_FILE: &str = "themes.json";
const MARKET_FILE: &str = "market.json";
const FINANCIAL_FILE: &str = "financial.json";
const PRICES_DIR: &str = "prices";

/// 시장지표 스냅샷 (`market.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// 기준일
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub data: BTreeMap<String, MarketStat>,
}

/// 재무 스냅샷 (`financial.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    /// 분기 라벨
    pub quarter: Option<QuarterLabel>,
    #[serde(default)]
    pub data: BTreeMap<String, FinancialFigure>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ThemeFile {
    #[serde(default)]
    themes: Vec<Theme>,
}

/// 저장소 현황.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    pub instruments: usize,
    pub themes: usize,
    pub partitions: Vec<MonthKey>,
    pub watermark: Option<NaiveDate>,
    pub market_date: Option<NaiveDate>,
    pub financial_quarter: Option<QuarterLabel>,
}

/// 파일 기반 수집 데이터 저장소.
#[derive(Debug, Clone)]
pub struct MarketStore {
    data_dir: PathBuf,
}

impl MarketStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// 데이터 디렉터리 생성
    pub fn init(&self) -> StoreResult<()> {
        let prices = self.prices_dir();
        fs::create_dir_all(&prices).map_err(|e| StoreError::io(&prices, e))?;
        debug!(path = %self.data_dir.display(), "데이터 디렉터리 준비");
        Ok(())
    }

    fn prices_dir(&self) -> PathBuf {
        self.data_dir.join(PRICES_DIR)
    }

    fn partition_path(&self, month: MonthKey) -> PathBuf {
        self.prices_dir().join(format!("{month}.json"))
    }

    // ==================== 종목 ====================

    /// 전체 종목 기본정보
    pub fn load_instruments(&self) -> StoreResult<BTreeMap<String, InstrumentInfo>> {
        Ok(read_json(&self.data_dir.join(STOCKS_FILE))?.unwrap_or_default())
    }

    /// 종목 기본정보 전체 교체
    pub fn save_instruments(&self, instruments: &BTreeMap<String, InstrumentInfo>) -> StoreResult<()> {
        write_json(&self.data_dir.join(STOCKS_FILE), instruments)
    }

    // ==================== 테마 ====================

    pub fn load_themes(&self) -> StoreResult<Vec<Theme>> {
        let file: Option<ThemeFile> = read_json(&self.data_dir.join(THEMES_FILE))?;
        Ok(file.map(|f| f.themes).unwrap_or_default())
    }

    /// 테마 전체 교체
    pub fn save_themes(&self, themes: &[Theme]) -> StoreResult<()> {
        #[derive(Serialize)]
        struct ThemeFileRef<'a> {
            themes: &'a [Theme],
        }
        write_json(&self.data_dir.join(THEMES_FILE), &ThemeFileRef { themes })
    }

    // ==================== 시장지표 ====================

    pub fn load_market(&self) -> StoreResult<MarketSnapshot> {
        Ok(read_json(&self.data_dir.join(MARKET_FILE))?.unwrap_or_default())
    }

    /// 시장지표 스냅샷 교체
    pub fn save_market(&self, date: NaiveDate, data: BTreeMap<String, MarketStat>) -> StoreResult<()> {
        let snapshot = MarketSnapshot {
            date: Some(date),
            data,
        };
        write_json(&self.data_dir.join(MARKET_FILE), &snapshot)
    }

    // ==================== 재무 ====================

    pub fn load_financial(&self) -> StoreResult<FinancialSnapshot> {
        Ok(read_json(&self.data_dir.join(FINANCIAL_FILE))?.unwrap_or_default())
    }

    /// 재무 스냅샷 교체
    pub fn save_financial(
        &self,
        quarter: QuarterLabel,
        data: BTreeMap<String, FinancialFigure>,
    ) -> StoreResult<()> {
        let snapshot = FinancialSnapshot {
            quarter: Some(quarter),
            data,
        };
        write_json(&self.data_dir.join(FINANCIAL_FILE), &snapshot)
    }

    /// 저장소 현황
    pub fn summary(&self, lookback_months: usize) -> StoreResult<StoreSummary> {
        Ok(StoreSummary {
            instruments: self.load_instruments()?.len(),
            themes: self.load_themes()?.len(),
            partitions: self.list_partitions()?,
            watermark: self.compute_watermark(lookback_months)?,
            market_date: self.load_market()?.date,
            financial_quarter: self.load_financial()?.quarter,
        })
    }
}

/// JSON 파일 읽기. 없거나 비어 있으면 `None`.
fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    if content.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

/// JSON 파일 원자적 교체 (임시 파일 기록 후 rename).
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp_path = path.with_extension("json.tmp");

    fs::write(&tmp_path, &bytes).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StoreError::io(&tmp_path, e)
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StoreError::io(path, e)
    })?;

    debug!(path = %path.display(), bytes = bytes.len(), "저장 완료");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kmarket_core::Venue;

    #[test]
    fn test_missing_and_empty_files_load_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MarketStore::new(dir.path());

        assert!(store.load_instruments().unwrap().is_empty());
        assert!(store.load_themes().unwrap().is_empty());
        assert_eq!(store.load_market().unwrap(), MarketSnapshot::default());

        fs::write(dir.path().join(STOCKS_FILE), "  \n").unwrap();
        assert!(store.load_instruments().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = MarketStore::new(dir.path());
        fs::write(dir.path().join(THEMES_FILE), "{\"themes\": [").unwrap();

        assert!(matches!(store.load_themes(), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_instruments_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = MarketStore::new(dir.path());

        let mut instruments = BTreeMap::new();
        instruments.insert(
            "005930".to_string(),
            InstrumentInfo {
                name: "삼성전자".to_string(),
                market: Venue::Kospi,
            },
        );
        store.save_instruments(&instruments).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(STOCKS_FILE)).unwrap()).unwrap();
        assert_eq!(raw["005930"]["name"], "삼성전자");
        assert_eq!(raw["005930"]["market"], "KOSPI");
        assert!(!dir.path().join("stocks.json.tmp").exists());
    }

    #[test]
    fn test_snapshot_tags() {
        let dir = tempfile::tempdir().unwrap();
        let store = MarketStore::new(dir.path());

        let quarter: QuarterLabel = "2024-Q3".parse().unwrap();
        let mut data = BTreeMap::new();
        data.insert(
            "005930".to_string(),
            FinancialFigure {
                revenue: 79_000_000_000_000,
                operating_profit: 9_180_000_000_000,
            },
        );
        store.save_financial(quarter, data).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(FINANCIAL_FILE)).unwrap()).unwrap();
        assert_eq!(raw["quarter"], "2024-Q3");
        assert_eq!(store.load_financial().unwrap().quarter, Some(quarter));
    }
}
