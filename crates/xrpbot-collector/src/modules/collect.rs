//! 실시간 수집 모듈.
//!
//! 스케줄 틱마다 한 번 호출되어 가장 최근 15분봉을 저장합니다.

use tracing::info;
use xrpbot_data::{CandleStore, OhlcvProvider};

use crate::{BackfillStats, Result};

use super::backfill::to_candles;

/// 최신 캔들을 조회해 저장합니다. 저장된 캔들 수를 반환합니다.
pub async fn collect_latest(
    store: &dyn CandleStore,
    provider: &dyn OhlcvProvider,
) -> Result<usize> {
    let records = provider.fetch_latest().await?;

    if records.is_empty() {
        tracing::warn!("제공자가 최신 캔들을 반환하지 않았습니다");
        return Ok(0);
    }

    let mut stats = BackfillStats::new();
    let candles = to_candles(&records, &mut stats);
    let written = store.upsert_chunk(&candles).await?;

    info!(
        count = written,
        anomalies = stats.anomalies,
        "최신 OHLCV 저장 완료"
    );

    Ok(written)
}
