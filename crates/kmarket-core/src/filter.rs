//! 보통주가 아닌 종목 제외 필터.
//!
//! 기준정보(테마, 시장 전체 목록) 수집 시점에만 적용하며,
//! 이미 저장된 종목에는 소급 적용하지 않습니다.

/// 종목명에 포함되면 제외하는 패턴 (ETF/ETN/스팩/리츠/파생형 등)
const EXCLUDE_PATTERNS: &[&str] = &[
    "스팩", "SPAC", "리츠", "ETN", "ETF", "인버스", "레버리지", "선물", "채권",
    // ETF 브랜드
    "KODEX", "TIGER", "ACE", "ARIRANG", "KBSTAR", "HANARO", "SOL", "PLUS", "RISE", "KOSEF",
    "KINDEX", "SMART", "FOCUS", "TIMEFOLIO",
];

/// 우선주 접미사
const PREFERRED_SUFFIXES: &[&str] = &["우", "우B", "우C"];

/// 제외 대상 종목인지 확인.
///
/// ```
/// use kmarket_core::is_excluded;
///
/// assert!(is_excluded("KODEX 200"));
/// assert!(is_excluded("현대차2우B"));
/// assert!(!is_excluded("삼성전자"));
/// ```
pub fn is_excluded(name: &str) -> bool {
    let name = name.trim();

    if EXCLUDE_PATTERNS.iter().any(|pattern| name.contains(pattern)) {
        return true;
    }

    PREFERRED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excludes_fund_brands() {
        assert!(is_excluded("KODEX 200"));
        assert!(is_excluded("TIGER 미국S&P500"));
        assert!(is_excluded("삼성 레버리지 WTI원유 선물 ETN"));
        assert!(is_excluded("엔에이치스팩29호"));
        assert!(is_excluded("맥쿼리인프라리츠"));
    }

    #[test]
    fn test_excludes_preferred_shares() {
        assert!(is_excluded("Hyundai Motor 2우B"));
        assert!(is_excluded("삼성전자우"));
        assert!(is_excluded("LG화학우C"));
    }

    #[test]
    fn test_keeps_common_equity() {
        assert!(!is_excluded("Samsung Electronics"));
        assert!(!is_excluded("삼성전자"));
        assert!(!is_excluded("SK하이닉스"));
        assert!(!is_excluded("우리금융지주"));
    }
}
