//! 원천 문자열 → 숫자 변환과 단위 환산.
//!
//! 터미널 세션은 모든 값을 문자열로 돌려주므로 숫자 파싱과 단위 변환은
//! 여기서 일괄 처리합니다.
//!
//! - 거래대금: 백만원 → 원
//! - 시가총액, 재무 금액: 억원 → 원

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

/// 백만원
pub const MILLION_WON: u64 = 1_000_000;

/// 억원
pub const HUNDRED_MILLION_WON: u64 = 100_000_000;

/// 쉼표, 공백, 선행 `+` 제거
fn normalize(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('+')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect()
}

/// 부호 있는 정수 파싱. 빈 문자열은 0.
pub fn parse_integer(field: &str, raw: &str) -> CoreResult<i64> {
    let cleaned = normalize(raw);
    if cleaned.is_empty() {
        return Ok(0);
    }
    cleaned.parse::<i64>().map_err(|_| CoreError::InvalidNumber {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

/// 부호가 등락 방향을 뜻하는 정수 파싱 (절대값).
///
/// `"-71000"` → 71000
pub fn parse_signed_magnitude(field: &str, raw: &str) -> CoreResult<u64> {
    parse_integer(field, raw).map(i64::unsigned_abs)
}

/// 소수 파싱. 빈 문자열은 0.
pub fn parse_decimal(field: &str, raw: &str) -> CoreResult<Decimal> {
    let cleaned = normalize(raw);
    if cleaned.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(&cleaned).map_err(|_| CoreError::InvalidNumber {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

/// 백만원 단위 → 원
pub fn million_won_to_won(value: u64) -> u64 {
    value.saturating_mul(MILLION_WON)
}

/// 억원 단위 → 원
pub fn hundred_million_won_to_won(value: u64) -> u64 {
    value.saturating_mul(HUNDRED_MILLION_WON)
}

/// 웹 페이지의 억원 단위 금액 문자열 → 원.
///
/// 천 단위 쉼표를 제거하고, `-`/`—`/빈 칸은 값 없음(0)으로 취급합니다.
/// 그 외에 숫자로 읽을 수 없는 값은 에러입니다.
///
/// `"79,000"` → 7,900,000,000,000
pub fn parse_hundred_million_amount(field: &str, text: &str) -> CoreResult<i64> {
    let trimmed = text.trim();
    if matches!(trimmed, "" | "-" | "—") {
        return Ok(0);
    }

    let invalid = || CoreError::InvalidNumber {
        field: field.to_string(),
        value: text.to_string(),
    };
    let value = Decimal::from_str(&normalize(trimmed)).map_err(|_| invalid())?;
    value
        .checked_mul(Decimal::from(HUNDRED_MILLION_WON))
        .and_then(|won| won.to_i64())
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_signed_magnitude() {
        assert_eq!(parse_signed_magnitude("현재가", "-71000").unwrap(), 71000);
        assert_eq!(parse_signed_magnitude("현재가", "+71000").unwrap(), 71000);
        assert_eq!(parse_signed_magnitude("현재가", "  000071000 ").unwrap(), 71000);
        assert_eq!(parse_signed_magnitude("현재가", "").unwrap(), 0);
        assert!(parse_signed_magnitude("현재가", "71,0a0").is_err());
    }

    #[test]
    fn test_market_cap_conversion() {
        let raw = parse_integer("시가총액", "420000").unwrap() as u64;
        assert_eq!(hundred_million_won_to_won(raw), 42_000_000_000_000);
    }

    #[test]
    fn test_trading_value_conversion() {
        let raw = parse_signed_magnitude("거래대금", "850000").unwrap();
        assert_eq!(million_won_to_won(raw), 850_000_000_000);
    }

    #[test]
    fn test_parse_integer_with_commas() {
        assert_eq!(parse_integer("상장주식", "5,969,782,550").unwrap(), 5_969_782_550);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("PER", "12.50").unwrap(), dec!(12.50));
        assert_eq!(parse_decimal("PER", "-3.2").unwrap(), dec!(-3.2));
        assert_eq!(parse_decimal("PER", "").unwrap(), Decimal::ZERO);
        assert!(parse_decimal("PER", "N/A").is_err());
    }

    #[test]
    fn test_parse_hundred_million_amount() {
        let parse = |text| parse_hundred_million_amount("매출액", text);
        assert_eq!(parse("79,000"), Ok(7_900_000_000_000));
        assert_eq!(parse("-1,250"), Ok(-125_000_000_000));
        assert_eq!(parse(" — "), Ok(0));
        assert_eq!(parse("-"), Ok(0));
        assert_eq!(parse(""), Ok(0));
        assert_eq!(parse("12.5"), Ok(1_250_000_000));
    }

    #[test]
    fn test_unreadable_amount_is_an_error() {
        for text in ["79,000.1.2", "N/A", "1,2a3"] {
            assert!(
                matches!(
                    parse_hundred_million_amount("매출액", text),
                    Err(CoreError::InvalidNumber { .. })
                ),
                "{text}"
            );
        }
    }

    proptest! {
        #[test]
        fn prop_signed_magnitude_ignores_sign(value in 0i64..1_000_000_000_000) {
            let positive = parse_signed_magnitude("f", &value.to_string()).unwrap();
            let negative = parse_signed_magnitude("f", &format!("-{value}")).unwrap();
            prop_assert_eq!(positive, negative);
            prop_assert_eq!(positive, value as u64);
        }

        #[test]
        fn prop_thousands_separators_do_not_change_amount(value in 0i64..10_000_000) {
            let plain = value.to_string();
            let mut grouped = String::new();
            for (i, c) in plain.chars().enumerate() {
                if i > 0 && (plain.len() - i) % 3 == 0 {
                    grouped.push(',');
                }
                grouped.push(c);
            }
            prop_assert_eq!(
                parse_hundred_million_amount("f", &plain),
                parse_hundred_million_amount("f", &grouped)
            );
        }
    }
}
