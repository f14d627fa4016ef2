//! 터미널 조회 코드와 필드명.

/// 일봉 조회 (주식일봉차트조회)
pub mod daily_chart {
    pub const QUERY_CODE: &str = "OPT10081";
    pub const REQUEST_NAME: &str = "일봉조회";
    pub const CHANNEL: &str = "2000";

    pub const PARAM_CODE: &str = "종목코드";
    pub const PARAM_BASE_DATE: &str = "기준일자";
    pub const PARAM_ADJUSTED: &str = "수정주가구분";
    /// 수정주가 적용
    pub const ADJUSTED_PRICE: &str = "1";

    pub const FIELD_DATE: &str = "일자";
    pub const FIELD_OPEN: &str = "시가";
    pub const FIELD_HIGH: &str = "고가";
    pub const FIELD_LOW: &str = "저가";
    pub const FIELD_CLOSE: &str = "현재가";
    pub const FIELD_VOLUME: &str = "거래량";
    /// 거래대금 (백만원)
    pub const FIELD_VALUE: &str = "거래대금";
}

/// 주식 기본정보 조회
pub mod basic_info {
    pub const QUERY_CODE: &str = "OPT10001";
    pub const REQUEST_NAME: &str = "주식기본정보요청";
    pub const CHANNEL: &str = "0101";

    pub const PARAM_CODE: &str = "종목코드";

    /// 시가총액 (억원)
    pub const FIELD_MARKET_CAP: &str = "시가총액";
    pub const FIELD_SHARES: &str = "상장주식";
    pub const FIELD_PER: &str = "PER";
    pub const FIELD_PBR: &str = "PBR";
}

/// 시장별 종목 목록 조회 코드
pub mod listing {
    pub const KOSPI: &str = "0";
    pub const KOSDAQ: &str = "10";
    pub const ETF: &str = "8";
}

/// 조회 전송 반환값 중 접속 끊김을 뜻하는 범위
pub const SESSION_LOST_CODES: std::ops::RangeInclusive<i32> = -199..=-100;

/// 연속조회 응답 플래그 (다음 페이지 있음)
pub const CONTINUATION_MORE: &str = "2";
