//! 수집 통계 구조체.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 백필 / 수집 작업 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackfillStats {
    /// 커밋된 청크 수
    pub chunks: usize,
    /// 저장된 캔들 수
    pub candles: usize,
    /// 사용한 API 호출 수
    pub calls: u32,
    /// 경고로 기록된 품질 이상 수
    pub anomalies: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl BackfillStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            chunks = self.chunks,
            candles = self.candles,
            calls = self.calls,
            anomalies = self.anomalies,
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "작업 완료"
        );
    }
}
