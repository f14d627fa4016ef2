//! 월 파티션 일봉 저장.

use std::collections::BTreeMap;
use std::fs;

use chrono::NaiveDate;
use kmarket_core::{DailyBar, MonthKey, PriceBar};
use tracing::{debug, warn};

use super::{read_json, write_json, MarketStore};
use crate::error::{StoreError, StoreResult};

/// 한 달 파티션: 종목코드 → 날짜 → 일봉
pub type PricePartition = BTreeMap<String, BTreeMap<NaiveDate, PriceBar>>;

/// 일봉을 월별 파티션으로 분류
fn group_by_month(bars: &BTreeMap<String, Vec<DailyBar>>) -> BTreeMap<MonthKey, PricePartition> {
    let mut grouped: BTreeMap<MonthKey, PricePartition> = BTreeMap::new();
    for (code, series) in bars {
        for bar in series {
            grouped
                .entry(bar.month())
                .or_default()
                .entry(code.clone())
                .or_default()
                .insert(bar.date, bar.to_price_bar());
        }
    }
    grouped
}

impl MarketStore {
    /// 월 파티션 로드 (없으면 빈 파티션)
    pub fn load_prices(&self, month: MonthKey) -> StoreResult<PricePartition> {
        Ok(read_json(&self.partition_path(month))?.unwrap_or_default())
    }

    /// 월 파티션 전체 교체
    pub fn save_prices(&self, month: MonthKey, partition: &PricePartition) -> StoreResult<()> {
        write_json(&self.partition_path(month), partition)
    }

    /// 하루치 일봉 병합.
    ///
    /// 해당 월 파티션을 읽어 종목별로 그 날짜만 덮어쓰고 저장합니다.
    /// 같은 데이터로 여러 번 호출해도 결과는 같습니다.
    pub fn merge_daily_bars(
        &self,
        date: NaiveDate,
        bars: &BTreeMap<String, PriceBar>,
    ) -> StoreResult<()> {
        let month = MonthKey::from_date(date);
        let mut partition = self.load_prices(month)?;

        for (code, bar) in bars {
            partition.entry(code.clone()).or_default().insert(date, *bar);
        }

        self.save_prices(month, &partition)?;
        debug!(%date, count = bars.len(), "일봉 병합");
        Ok(())
    }

    /// 여러 날짜의 일봉 병합 (각 일봉의 날짜 기준).
    ///
    /// 영향받는 월 파티션마다 읽기-병합-저장을 수행하고 갱신된 월 목록을 반환합니다.
    pub fn merge_bars(&self, bars: &BTreeMap<String, Vec<DailyBar>>) -> StoreResult<Vec<MonthKey>> {
        let grouped = group_by_month(bars);
        let mut touched = Vec::with_capacity(grouped.len());

        for (month, incoming) in grouped {
            let mut partition = self.load_prices(month)?;
            for (code, dates) in incoming {
                partition.entry(code).or_default().extend(dates);
            }
            self.save_prices(month, &partition)?;
            touched.push(month);
        }

        Ok(touched)
    }

    /// 일봉으로 월 파티션 교체 (초기 적재용).
    ///
    /// 영향받는 월 파티션은 새 데이터로만 채워집니다.
    pub fn replace_bars(&self, bars: &BTreeMap<String, Vec<DailyBar>>) -> StoreResult<Vec<MonthKey>> {
        let grouped = group_by_month(bars);
        let mut touched = Vec::with_capacity(grouped.len());

        for (month, partition) in grouped {
            self.save_prices(month, &partition)?;
            touched.push(month);
        }

        Ok(touched)
    }

    /// 여러 월 파티션을 종목별로 합쳐서 로드
    pub fn load_prices_range(&self, months: &[MonthKey]) -> StoreResult<PricePartition> {
        let mut merged = PricePartition::new();
        for &month in months {
            for (code, dates) in self.load_prices(month)? {
                merged.entry(code).or_default().extend(dates);
            }
        }
        Ok(merged)
    }

    /// 저장된 월 파티션 목록 (오름차순)
    pub fn list_partitions(&self) -> StoreResult<Vec<MonthKey>> {
        let dir = self.prices_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&dir, e)),
        };

        let mut months = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&dir, e))?;
            let file_name = entry.file_name();
            let Some(stem) = file_name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            match stem.parse::<MonthKey>() {
                Ok(month) => months.push(month),
                Err(_) => warn!(file = %file_name.to_string_lossy(), "파티션 이름이 아닌 파일 무시"),
            }
        }

        months.sort();
        Ok(months)
    }

    /// 가장 최근 `lookback_months`개 파티션에서 종목별 마지막 저장일.
    ///
    /// 달력 기준이 아니라 실제 저장된 파티션 기준으로 찾습니다.
    pub fn latest_dates(&self, lookback_months: usize) -> StoreResult<BTreeMap<String, NaiveDate>> {
        let partitions = self.list_partitions()?;
        let mut latest: BTreeMap<String, NaiveDate> = BTreeMap::new();

        for month in partitions.into_iter().rev().take(lookback_months) {
            for (code, dates) in self.load_prices(month)? {
                let Some(&last) = dates.keys().next_back() else {
                    continue;
                };
                let entry = latest.entry(code).or_insert(last);
                *entry = (*entry).max(last);
            }
        }

        Ok(latest)
    }

    /// 가장 최근 `lookback_months`개 파티션에서 가장 늦은 날짜 (워터마크)
    pub fn compute_watermark(&self, lookback_months: usize) -> StoreResult<Option<NaiveDate>> {
        Ok(self.latest_dates(lookback_months)?.into_values().max())
    }
}
