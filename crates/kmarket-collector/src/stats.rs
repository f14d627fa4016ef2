//! 수집 통계 구조체.

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// 도메인별 수집 통계
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionStats {
    /// 총 시도 횟수
    pub total: usize,
    /// 성공 횟수
    pub success: usize,
    /// 빈 응답 (조회 성공, 데이터 없음)
    pub empty: usize,
    /// 응답 시간 초과
    pub timeouts: usize,
    /// 파싱/소스 에러
    pub errors: usize,
    /// 건너뛴 대상 (이미 등록, 잘못된 코드 등)
    pub skipped: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CollectionStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 실패 건수 (시간 초과 + 에러)
    pub fn failed(&self) -> usize {
        self.timeouts + self.errors
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.success as f64 / self.total as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            success = self.success,
            empty = self.empty,
            timeouts = self.timeouts,
            errors = self.errors,
            skipped = self.skipped,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "수집 완료"
        );
    }
}

/// 워크플로우 실행 결과 요약
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// 워크플로우 이름
    pub workflow: String,
    /// 컬렉션별 기록 건수 (stocks, themes, prices, market, financial)
    pub counts: BTreeMap<String, usize>,
    /// 도메인별 수집 통계
    pub domains: BTreeMap<String, CollectionStats>,
    /// 쓰기에 실패해 갱신되지 않은 컬렉션
    pub failed_collections: Vec<String>,
    /// 치명적 에러로 중단된 경우 그 사유
    pub aborted: Option<String>,
    /// 수행할 작업이 없었던 이유
    pub note: Option<String>,
}

impl RunSummary {
    pub fn new(workflow: impl Into<String>) -> Self {
        Self {
            workflow: workflow.into(),
            ..Default::default()
        }
    }

    /// 컬렉션 기록 건수 저장
    pub fn record_count(&mut self, collection: &str, count: usize) {
        self.counts.insert(collection.to_string(), count);
    }

    /// 도메인 통계 저장
    pub fn record_domain(&mut self, domain: &str, stats: CollectionStats) {
        self.domains.insert(domain.to_string(), stats);
    }

    /// 쓰기 실패 컬렉션 기록
    pub fn record_failure(&mut self, collection: &str) {
        if !self.failed_collections.iter().any(|c| c == collection) {
            self.failed_collections.push(collection.to_string());
        }
    }

    pub fn count(&self, collection: &str) -> usize {
        self.counts.get(collection).copied().unwrap_or(0)
    }

    /// 중단 없이 모든 컬렉션을 기록했는지 확인
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none() && self.failed_collections.is_empty()
    }

    /// 요약 로그 출력
    pub fn log(&self) {
        for (domain, stats) in &self.domains {
            stats.log_summary(domain);
        }

        if let Some(note) = &self.note {
            tracing::info!(workflow = %self.workflow, note = %note, "수행할 작업 없음");
        }
        if let Some(reason) = &self.aborted {
            tracing::error!(workflow = %self.workflow, reason = %reason, "수집 중단");
        }
        if !self.failed_collections.is_empty() {
            tracing::error!(
                workflow = %self.workflow,
                collections = ?self.failed_collections,
                "저장되지 않은 컬렉션 있음"
            );
        }

        tracing::info!(
            workflow = %self.workflow,
            counts = ?self.counts,
            complete = self.is_complete(),
            "워크플로우 완료"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let stats = CollectionStats {
            total: 4,
            success: 3,
            timeouts: 1,
            ..Default::default()
        };
        assert_eq!(stats.success_rate(), 75.0);
        assert_eq!(stats.failed(), 1);
        assert_eq!(CollectionStats::new().success_rate(), 0.0);
    }

    #[test]
    fn test_run_summary_failures_are_unique() {
        let mut summary = RunSummary::new("daily");
        summary.record_count("prices", 10);
        summary.record_failure("market");
        summary.record_failure("market");

        assert_eq!(summary.count("prices"), 10);
        assert_eq!(summary.count("themes"), 0);
        assert_eq!(summary.failed_collections, vec!["market"]);
        assert!(!summary.is_complete());
    }
}
