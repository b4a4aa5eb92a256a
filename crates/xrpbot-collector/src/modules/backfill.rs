//! 청크 단위 fetch-and-persist 엔진.
//!
//! `[start, end)` 범위를 하루 이하의 청크로 나눠 순서대로 가져오고
//! 저장합니다. 청크마다 독립적으로 커밋하므로 N번째 청크에서 실패해도
//! 앞의 N-1개 청크는 내구적으로 남습니다. 커서는 커밋 성공 후에만
//! 전진하며, 에러는 진행 중 청크를 롤백한 뒤 그대로 전파됩니다.
//! 재시도는 호출자가 갭 판정을 다시 돌려서 수행합니다.

use chrono::{DateTime, Duration, Utc};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use xrpbot_core::grid::round_down_to_grid;
use xrpbot_core::Candle;
use xrpbot_data::{CandleStore, OhlcvProvider, ProviderCandle};

use crate::{BackfillStats, Result};

/// `[start, end)` 범위의 모든 그리드 캔들을 가져와 저장합니다.
pub async fn run_backfill(
    store: &dyn CandleStore,
    provider: &dyn OhlcvProvider,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<BackfillStats> {
    let started = Instant::now();
    let mut stats = BackfillStats::new();

    info!(start = %start, end = %end, "백필 시작");

    let mut current = start;
    while current < end {
        let next = std::cmp::min(current + Duration::days(1), end);

        let records = match provider.fetch_history(current, next).await {
            Ok(records) => records,
            Err(e) => {
                error!(chunk_start = %current, chunk_end = %next, error = %e, "청크 조회 실패, 백필 중단");
                return Err(e.into());
            }
        };
        stats.calls += 1;

        let candles = to_candles(&records, &mut stats);

        let written = match store.upsert_chunk(&candles).await {
            Ok(written) => written,
            Err(e) => {
                error!(chunk_start = %current, chunk_end = %next, error = %e, "청크 저장 실패, 백필 중단");
                return Err(e.into());
            }
        };
        stats.chunks += 1;
        stats.candles += written;

        debug!(
            chunk_start = %current,
            chunk_end = %next,
            written = written,
            "청크 커밋 완료"
        );

        current = next;
    }

    stats.elapsed = started.elapsed();
    Ok(stats)
}

/// 제공자 레코드를 저장용 캔들로 변환합니다.
///
/// 타임스탬프를 그리드에 정렬하고 `price_change`를 파생하며, 품질
/// 이상은 경고로 남기고 값은 받은 그대로 유지합니다.
pub(crate) fn to_candles(records: &[ProviderCandle], stats: &mut BackfillStats) -> Vec<Candle> {
    let mut candles = Vec::with_capacity(records.len());

    for record in records {
        let timestamp = round_down_to_grid(record.period_start);
        let candle = Candle::new(
            timestamp,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
        );

        for issue in candle.anomalies() {
            stats.anomalies += 1;
            warn!(timestamp = %timestamp, issue = %issue, "캔들 품질 이상, 그대로 저장");
        }

        candles.push(candle);
    }

    candles
}
