//! 월 파티션 저장소 통합 테스트.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use kmarket_core::{DailyBar, InstrumentInfo, MonthKey, PriceBar, Venue};
use kmarket_data::{MarketStore, PricePartition};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn month(s: &str) -> MonthKey {
    s.parse().unwrap()
}

fn price(close: u64) -> PriceBar {
    PriceBar {
        open: close,
        high: close,
        low: close,
        close,
        volume: 1_000,
        value: close * 1_000,
    }
}

fn single(code: &str, close: u64) -> BTreeMap<String, PriceBar> {
    BTreeMap::from([(code.to_string(), price(close))])
}

fn store() -> (tempfile::TempDir, MarketStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = MarketStore::new(dir.path());
    store.init().unwrap();
    (dir, store)
}

#[test]
fn test_merge_daily_bar_is_idempotent() {
    let (_dir, store) = store();
    let day = date("2025-01-20");

    store.merge_daily_bars(day, &single("005930", 71_000)).unwrap();
    let once = store.load_prices(month("2025-01")).unwrap();

    store.merge_daily_bars(day, &single("005930", 71_000)).unwrap();
    let twice = store.load_prices(month("2025-01")).unwrap();

    assert_eq!(once, twice);
    assert_eq!(twice["005930"].len(), 1);
}

#[test]
fn test_last_write_wins_and_other_dates_survive() {
    let (_dir, store) = store();

    store.merge_daily_bars(date("2025-01-17"), &single("005930", 70_000)).unwrap();
    store.merge_daily_bars(date("2025-01-20"), &single("005930", 71_000)).unwrap();
    store.merge_daily_bars(date("2025-01-20"), &single("005930", 72_000)).unwrap();
    store.merge_daily_bars(date("2025-01-20"), &single("000660", 120_000)).unwrap();

    let partition = store.load_prices(month("2025-01")).unwrap();
    assert_eq!(partition["005930"][&date("2025-01-17")].close, 70_000);
    assert_eq!(partition["005930"][&date("2025-01-20")].close, 72_000);
    assert_eq!(partition["000660"][&date("2025-01-20")].close, 120_000);
}

#[test]
fn test_partition_boundary() {
    let (dir, store) = store();

    store.merge_daily_bars(date("2025-01-31"), &single("005930", 71_000)).unwrap();
    store.merge_daily_bars(date("2025-02-01"), &single("005930", 72_000)).unwrap();

    assert_eq!(
        store.list_partitions().unwrap(),
        vec![month("2025-01"), month("2025-02")]
    );
    assert!(dir.path().join("prices/2025-01.json").exists());
    assert!(dir.path().join("prices/2025-02.json").exists());

    let january = store.load_prices(month("2025-01")).unwrap();
    assert!(!january["005930"].contains_key(&date("2025-02-01")));
}

#[test]
fn test_watermark_scans_recent_partitions() {
    let (_dir, store) = store();

    store.merge_daily_bars(date("2024-12-30"), &single("005930", 70_000)).unwrap();
    store.merge_daily_bars(date("2024-12-02"), &single("000660", 110_000)).unwrap();
    store.merge_daily_bars(date("2025-01-20"), &single("005930", 71_000)).unwrap();
    store.merge_daily_bars(date("2025-01-06"), &single("000660", 115_000)).unwrap();

    assert_eq!(store.compute_watermark(3).unwrap(), Some(date("2025-01-20")));
    assert_eq!(store.compute_watermark(0).unwrap(), None);
}

#[test]
fn test_watermark_uses_stored_partitions_not_calendar() {
    let (_dir, store) = store();
    // 오래된 파티션만 있어도 찾아야 함
    store.merge_daily_bars(date("2023-06-15"), &single("005930", 60_000)).unwrap();

    assert_eq!(store.compute_watermark(3).unwrap(), Some(date("2023-06-15")));
}

#[test]
fn test_latest_dates_per_instrument() {
    let (_dir, store) = store();
    store.merge_daily_bars(date("2024-12-30"), &single("000660", 110_000)).unwrap();
    store.merge_daily_bars(date("2025-01-20"), &single("005930", 71_000)).unwrap();
    store.merge_daily_bars(date("2025-01-06"), &single("000660", 115_000)).unwrap();
    store.merge_daily_bars(date("2024-10-01"), &single("035720", 40_000)).unwrap();

    let latest = store.latest_dates(2).unwrap();
    assert_eq!(
        latest,
        BTreeMap::from([
            ("000660".to_string(), date("2025-01-06")),
            ("005930".to_string(), date("2025-01-20")),
        ])
    );
    assert!(store.latest_dates(3).unwrap().contains_key("035720"));
}

#[test]
fn test_watermark_empty_store() {
    let (_dir, store) = store();
    assert_eq!(store.compute_watermark(3).unwrap(), None);
}

#[test]
fn test_merge_bars_spans_months_and_preserves_existing() {
    let (_dir, store) = store();
    store.merge_daily_bars(date("2025-01-02"), &single("005930", 69_000)).unwrap();

    let bars = BTreeMap::from([(
        "005930".to_string(),
        vec![
            price(71_000).with_date(date("2025-02-03")),
            price(70_500).with_date(date("2025-01-31")),
        ],
    )]);
    let touched = store.merge_bars(&bars).unwrap();
    assert_eq!(touched, vec![month("2025-01"), month("2025-02")]);

    let range = store
        .load_prices_range(&[month("2025-02"), month("2025-01")])
        .unwrap();
    let dates: Vec<_> = range["005930"].keys().copied().collect();
    assert_eq!(
        dates,
        vec![date("2025-01-02"), date("2025-01-31"), date("2025-02-03")]
    );
}

#[test]
fn test_replace_bars_drops_stale_rows_in_touched_partition() {
    let (_dir, store) = store();
    store.merge_daily_bars(date("2025-01-02"), &single("999999", 1)).unwrap();
    store.merge_daily_bars(date("2024-11-29"), &single("999999", 1)).unwrap();

    let bars: BTreeMap<String, Vec<DailyBar>> = BTreeMap::from([(
        "005930".to_string(),
        vec![price(71_000).with_date(date("2025-01-20"))],
    )]);
    store.replace_bars(&bars).unwrap();

    let january = store.load_prices(month("2025-01")).unwrap();
    assert!(!january.contains_key("999999"));
    // 건드리지 않은 파티션은 그대로
    let november = store.load_prices(month("2024-11")).unwrap();
    assert!(november.contains_key("999999"));
}

#[test]
fn test_partition_file_layout() {
    let (dir, store) = store();
    store.merge_daily_bars(date("2025-01-20"), &single("005930", 71_000)).unwrap();

    let raw: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("prices/2025-01.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(raw["005930"]["2025-01-20"]["close"], 71_000);
    assert_eq!(raw["005930"]["2025-01-20"]["value"], 71_000_000);
}

#[test]
fn test_failed_write_keeps_previous_partition() {
    let (dir, store) = store();
    store.merge_daily_bars(date("2025-01-17"), &single("005930", 70_000)).unwrap();
    let before = store.load_prices(month("2025-01")).unwrap();

    // 임시 파일 자리에 디렉터리가 있으면 쓰기가 실패함
    std::fs::create_dir(dir.path().join("prices/2025-01.json.tmp")).unwrap();

    assert!(store
        .merge_daily_bars(date("2025-01-20"), &single("005930", 71_000))
        .is_err());
    assert!(store.save_prices(month("2025-01"), &PricePartition::new()).is_err());

    assert_eq!(store.load_prices(month("2025-01")).unwrap(), before);
    assert_eq!(store.list_partitions().unwrap(), vec![month("2025-01")]);
}

#[test]
fn test_failed_write_keeps_previous_instruments() {
    let (dir, store) = store();
    let original = BTreeMap::from([(
        "005930".to_string(),
        InstrumentInfo {
            name: "삼성전자".to_string(),
            market: Venue::Kospi,
        },
    )]);
    store.save_instruments(&original).unwrap();

    std::fs::create_dir(dir.path().join("stocks.json.tmp")).unwrap();
    assert!(store.save_instruments(&BTreeMap::new()).is_err());

    assert_eq!(store.load_instruments().unwrap(), original);
}

#[test]
fn test_stray_files_are_not_partitions() {
    let (dir, store) = store();
    store.merge_daily_bars(date("2025-01-20"), &single("005930", 71_000)).unwrap();
    std::fs::write(dir.path().join("prices/2025-02.json.tmp"), "{").unwrap();
    std::fs::write(dir.path().join("prices/readme.json"), "{}").unwrap();

    assert_eq!(store.list_partitions().unwrap(), vec![month("2025-01")]);
}

#[test]
fn test_summary() {
    let (_dir, store) = store();
    store.merge_daily_bars(date("2025-01-20"), &single("005930", 71_000)).unwrap();

    let summary = store.summary(3).unwrap();
    assert_eq!(summary.instruments, 0);
    assert_eq!(summary.partitions, vec![month("2025-01")]);
    assert_eq!(summary.watermark, Some(date("2025-01-20")));
    assert_eq!(summary.market_date, None);
}
