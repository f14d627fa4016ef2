//! 일봉 데이터.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::calendar::MonthKey;

/// 한 종목의 하루 일봉.
///
/// 가격은 원 단위 정수, 거래대금은 수집 시점에 원 단위로 변환된 값입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyBar {
    /// 거래일
    pub date: NaiveDate,
    /// 시가
    pub open: u64,
    /// 고가
    pub high: u64,
    /// 저가
    pub low: u64,
    /// 종가
    pub close: u64,
    /// 거래량
    pub volume: u64,
    /// 거래대금 (원)
    pub value: u64,
}

impl DailyBar {
    /// 이 일봉이 속한 월 파티션
    pub fn month(&self) -> MonthKey {
        MonthKey::from_date(self.date)
    }

    /// 저장 형식으로 변환
    pub fn to_price_bar(&self) -> PriceBar {
        PriceBar {
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            value: self.value,
        }
    }
}

/// 파티션 파일에 저장되는 일봉 값 (날짜는 맵 키).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBar {
    #[serde(default)]
    pub open: u64,
    #[serde(default)]
    pub high: u64,
    #[serde(default)]
    pub low: u64,
    pub close: u64,
    #[serde(default)]
    pub volume: u64,
    pub value: u64,
}

impl PriceBar {
    /// 날짜를 붙여 도메인 일봉으로 변환
    pub fn with_date(self, date: NaiveDate) -> DailyBar {
        DailyBar {
            date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            value: self.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_bar_accepts_close_value_only_records() {
        // 종가/거래대금만 있는 이전 형식의 파티션도 읽을 수 있어야 함
        let bar: PriceBar = serde_json::from_str(r#"{"close": 71000, "value": 850000000000}"#).unwrap();
        assert_eq!(bar.close, 71000);
        assert_eq!(bar.open, 0);
    }

    #[test]
    fn test_daily_bar_month() {
        let bar = PriceBar {
            open: 1,
            high: 2,
            low: 1,
            close: 2,
            volume: 10,
            value: 20,
        }
        .with_date(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert_eq!(bar.month().to_string(), "2025-01");
    }
}
