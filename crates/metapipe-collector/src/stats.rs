//! 실행 통계 구조체.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 파이프라인 실행 요약.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// 총 시도한 티커 수
    pub total: usize,
    /// 성공한 티커 수
    pub processed: usize,
    /// 실패한 티커 수 (실패 로그에 기록됨)
    pub failed: usize,
    /// 저장된 총 레코드 수
    pub records: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunSummary {
    /// 새 요약 객체 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 성공률 계산 (%).
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.processed as f64 / self.total as f64) * 100.0
        }
    }

    /// 요약 로그 출력.
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            processed = self.processed,
            failed = self.failed,
            records = self.records,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "실행 완료"
        );
    }
}
