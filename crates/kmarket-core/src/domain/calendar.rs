//! 월 파티션 키, 분기 라벨, 거래일 추정.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// 월 파티션 키 (`YYYY-MM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// 연/월로 생성 (월은 1~12)
    pub fn new(year: i32, month: u32) -> Result<Self, CoreError> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::InvalidMonthKey(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    /// 날짜가 속한 월
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// 직전 월
    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// 기준일이 속한 월부터 거꾸로 `count`개월 (최신순).
    pub fn recent(today: NaiveDate, count: usize) -> Vec<Self> {
        let mut months = Vec::with_capacity(count);
        let mut current = Self::from_date(today);
        for _ in 0..count {
            months.push(current);
            current = current.prev();
        }
        months
    }

    /// 날짜가 이 월에 속하는지 확인
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidMonthKey(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// 분기 라벨 (`YYYY-Qn`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuarterLabel {
    year: i32,
    quarter: u32,
}

impl QuarterLabel {
    pub fn new(year: i32, quarter: u32) -> Result<Self, CoreError> {
        if !(1..=4).contains(&quarter) {
            return Err(CoreError::InvalidQuarter(format!("{year}-Q{quarter}")));
        }
        Ok(Self { year, quarter })
    }

    /// 날짜가 속한 분기
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            quarter: (date.month() - 1) / 3 + 1,
        }
    }

    /// 직전 분기
    pub fn prev(&self) -> Self {
        if self.quarter == 1 {
            Self {
                year: self.year - 1,
                quarter: 4,
            }
        } else {
            Self {
                year: self.year,
                quarter: self.quarter - 1,
            }
        }
    }

    /// 실적 발표 지연(1분기)을 반영한 최신 보고 분기.
    ///
    /// 2024-08-15 → 2024-Q2, 2025-02-01 → 2024-Q4
    pub fn latest_reported(today: NaiveDate) -> Self {
        Self::containing(today).prev()
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn quarter(&self) -> u32 {
        self.quarter
    }
}

impl fmt::Display for QuarterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Q{}", self.year, self.quarter)
    }
}

impl FromStr for QuarterLabel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidQuarter(s.to_string());
        let (year, quarter) = s.split_once("-Q").ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let quarter: u32 = quarter.parse().map_err(|_| invalid())?;
        Self::new(year, quarter).map_err(|_| invalid())
    }
}

impl Serialize for QuarterLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QuarterLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// 마지막 저장일 이후 조회해야 할 거래일 수 추정.
///
/// 주말만 제외한 근사치 `ceil(달력일 * 5 / 7) + margin`입니다.
/// 공휴일은 고려하지 않으므로 항상 실제보다 크거나 같게 추정하며,
/// 초과분은 병합 시 중복으로 흡수됩니다.
pub fn estimate_trading_days(watermark: NaiveDate, today: NaiveDate, margin: u32) -> u32 {
    let calendar_days = (today - watermark).num_days().max(0) as u64;
    let weekdays = (calendar_days * 5).div_ceil(7);
    weekdays as u32 + margin
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_key_partition_boundary() {
        assert_eq!(MonthKey::from_date(date(2025, 1, 31)).to_string(), "2025-01");
        assert_eq!(MonthKey::from_date(date(2025, 2, 1)).to_string(), "2025-02");
    }

    #[test]
    fn test_month_key_parse() {
        let key: MonthKey = "2024-12".parse().unwrap();
        assert_eq!(key.year(), 2024);
        assert_eq!(key.month(), 12);
        assert!("2024-13".parse::<MonthKey>().is_err());
        assert!("2024-1".parse::<MonthKey>().is_err());
        assert!("prices".parse::<MonthKey>().is_err());
    }

    #[test]
    fn test_recent_months_cross_year() {
        let months: Vec<String> = MonthKey::recent(date(2025, 2, 10), 3)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(months, vec!["2025-02", "2025-01", "2024-12"]);
    }

    #[test]
    fn test_latest_reported_quarter_has_one_quarter_lag() {
        assert_eq!(QuarterLabel::latest_reported(date(2024, 8, 15)).to_string(), "2024-Q2");
        assert_eq!(QuarterLabel::latest_reported(date(2025, 2, 1)).to_string(), "2024-Q4");
        assert_eq!(QuarterLabel::latest_reported(date(2025, 12, 31)).to_string(), "2025-Q3");
    }

    #[test]
    fn test_quarter_label_round_trip_through_str() {
        let label: QuarterLabel = "2024-Q3".parse().unwrap();
        assert_eq!(label, QuarterLabel::new(2024, 3).unwrap());
        assert!("2024-Q5".parse::<QuarterLabel>().is_err());
    }

    #[test]
    fn test_estimate_trading_days() {
        // 월요일 → 다음 주 월요일: 7일 → 5 + 여유 5
        assert_eq!(estimate_trading_days(date(2025, 1, 13), date(2025, 1, 20), 5), 10);
        // 3일 → ceil(15/7) = 3
        assert_eq!(estimate_trading_days(date(2025, 1, 17), date(2025, 1, 20), 5), 8);
        // 역순이면 여유분만
        assert_eq!(estimate_trading_days(date(2025, 1, 20), date(2025, 1, 17), 5), 5);
    }
}
