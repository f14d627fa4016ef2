//! 시장지표 / 재무 스냅샷.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 종목별 시장지표 (최신 스냅샷).
///
/// JSON에서는 웹 화면이 그대로 읽을 수 있도록 PER/PBR을 숫자로 기록합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStat {
    /// 시가총액 (원)
    pub market_cap: u64,
    /// 상장주식수
    pub shares: u64,
    /// PER
    #[serde(with = "rust_decimal::serde::float")]
    pub per: Decimal,
    /// PBR
    #[serde(with = "rust_decimal::serde::float")]
    pub pbr: Decimal,
}

/// 종목별 분기 재무 (최신 분기 스냅샷).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialFigure {
    /// 매출액 (원)
    pub revenue: i64,
    /// 영업이익 (원, 적자 시 음수)
    pub operating_profit: i64,
}
