//! 종목, 시장 구분, 테마.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// 상장 시장 구분.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Venue {
    /// 유가증권시장 (코스피)
    #[serde(rename = "KOSPI")]
    Kospi,
    /// 코스닥
    #[serde(rename = "KOSDAQ")]
    Kosdaq,
}

impl Venue {
    /// 전체 시장 목록
    pub const ALL: [Venue; 2] = [Venue::Kospi, Venue::Kosdaq];

    /// 표시용 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kospi => "KOSPI",
            Self::Kosdaq => "KOSDAQ",
        }
    }

    /// 테마 구성종목 코드 접두사로 시장 구분.
    ///
    /// `J`/`Q` 접두사는 코스닥, 그 외(`A` 포함)는 코스피로 간주합니다.
    pub fn from_member_prefix(raw: &str) -> Self {
        if raw.starts_with('J') || raw.starts_with('Q') {
            Self::Kosdaq
        } else {
            Self::Kospi
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Venue {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "KOSPI" | "코스피" => Ok(Self::Kospi),
            "KOSDAQ" | "코스닥" => Ok(Self::Kosdaq),
            other => Err(CoreError::UnknownVenue(other.to_string())),
        }
    }
}

/// 종목 기본정보 (저장 형식).
///
/// `stocks.json`에는 종목코드를 키로 이 구조체가 값으로 저장됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentInfo {
    /// 종목명
    pub name: String,
    /// 상장 시장
    pub market: Venue,
}

/// 종목.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    /// 6자리 종목코드
    pub code: String,
    /// 종목명
    pub name: String,
    /// 상장 시장
    pub venue: Venue,
}

impl Instrument {
    pub fn new(code: impl Into<String>, name: impl Into<String>, venue: Venue) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            venue,
        }
    }

    /// 저장 형식으로 분리
    pub fn into_entry(self) -> (String, InstrumentInfo) {
        (
            self.code,
            InstrumentInfo {
                name: self.name,
                market: self.venue,
            },
        )
    }
}

/// 6자리 영숫자 종목코드인지 확인
pub fn is_valid_code(code: &str) -> bool {
    code.len() == 6 && code.chars().all(|c| c.is_ascii_alphanumeric())
}

/// 테마 (구성종목 코드 집합).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    /// 테마 코드
    pub id: String,
    /// 테마명
    pub name: String,
    /// 구성종목 코드 (순서 무관)
    pub stocks: Vec<String>,
}

impl Theme {
    pub fn new(id: impl Into<String>, name: impl Into<String>, stocks: Vec<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stocks,
        }
    }

    /// 구성종목 합집합 병합 (중복 제거, 정렬)
    pub fn union_members<I>(&mut self, codes: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut merged: std::collections::BTreeSet<String> =
            self.stocks.drain(..).collect();
        merged.extend(codes);
        self.stocks = merged.into_iter().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venue_serde_uses_market_names() {
        let json = serde_json::to_string(&Venue::Kosdaq).unwrap();
        assert_eq!(json, "\"KOSDAQ\"");
        let venue: Venue = serde_json::from_str("\"KOSPI\"").unwrap();
        assert_eq!(venue, Venue::Kospi);
    }

    #[test]
    fn test_venue_from_member_prefix() {
        assert_eq!(Venue::from_member_prefix("A005930"), Venue::Kospi);
        assert_eq!(Venue::from_member_prefix("J035720"), Venue::Kosdaq);
        assert_eq!(Venue::from_member_prefix("Q091990"), Venue::Kosdaq);
    }

    #[test]
    fn test_venue_from_str() {
        assert_eq!("kosdaq".parse::<Venue>().unwrap(), Venue::Kosdaq);
        assert_eq!("코스피".parse::<Venue>().unwrap(), Venue::Kospi);
        assert!("KONEX".parse::<Venue>().is_err());
    }

    #[test]
    fn test_theme_union_members_dedups() {
        let mut theme = Theme::new("141", "2차전지", vec!["373220".into(), "005930".into()]);
        theme.union_members(vec!["005930".to_string(), "086520".to_string()]);
        assert_eq!(theme.stocks, vec!["005930", "086520", "373220"]);
    }

    #[test]
    fn test_is_valid_code() {
        assert!(is_valid_code("005930"));
        assert!(!is_valid_code("5930"));
        assert!(!is_valid_code("005930.KS"));
    }
}
