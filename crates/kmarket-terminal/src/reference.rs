//! 종목 목록/테마 응답 문자열 파싱.

use kmarket_core::Venue;

/// `;` 구분 종목코드 목록
pub fn parse_code_list(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}

/// 테마 목록 `"141|2차전지;140|반도체"` → (id, 이름)
pub fn parse_theme_groups(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|entry| {
            let (id, name) = entry.split_once('|')?;
            let (id, name) = (id.trim(), name.trim());
            if id.is_empty() {
                return None;
            }
            Some((id.to_string(), name.to_string()))
        })
        .collect()
}

/// 테마 구성종목 `"A005930;J035720"` → (코드, 시장).
///
/// 접두사 `J`/`Q`는 코스닥, 그 외는 코스피이며 접두 문자는 제거합니다.
pub fn parse_theme_members(raw: &str) -> Vec<(String, Venue)> {
    parse_code_list(raw)
        .into_iter()
        .map(|member| {
            let venue = Venue::from_member_prefix(&member);
            let code = member
                .trim_start_matches(|c: char| c.is_ascii_alphabetic())
                .to_string();
            (code, venue)
        })
        .filter(|(code, _)| !code.is_empty())
        .collect()
}
