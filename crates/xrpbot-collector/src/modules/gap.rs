//! 갭 판정 모듈.
//!
//! 저장소의 최신 타임스탬프와 현재 그리드 시각을 비교해 누락 구간
//! 수를 계산하고 세 가지 상태로 분류합니다. 분류가 백필 비용의
//! 상한을 정하며, 너무 오래된 데이터는 자동 보정 대신 운영자의
//! 명시적 결정을 요구합니다.

use chrono::{DateTime, Utc};
use xrpbot_core::grid::{grid_intervals_between, grid_step, round_down_to_grid, INTERVALS_PER_DAY};
use xrpbot_data::CandleStore;

use crate::Result;

/// 시리즈 갭 상태.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GapState {
    /// 저장소가 비어 있음. 기준점이 없으므로 호출자가 명시적인
    /// 초기 적재 기간을 정해야 한다.
    InitialLoadRequired,
    /// 누락 구간 없음.
    UpToDate,
    /// 자동 백필 가능한 갭. `[start, end)`가 가져올 범위.
    Reconcilable {
        /// 누락 구간 수
        missing: i64,
        /// 백필 시작 (최신 저장 + 1 그리드)
        start: DateTime<Utc>,
        /// 백필 종료 (exclusive)
        end: DateTime<Utc>,
    },
    /// 허용 한도를 넘는 갭. 증분 백필 대신 전체 재초기화 필요.
    Unreconcilable {
        /// 누락 구간 수
        missing: i64,
    },
}

/// 최신 저장 시각과 현재 시각으로 갭을 분류합니다.
///
/// `missing <= max_backfill_days * 96`까지만 자동 보정을 허용합니다.
pub fn classify_gap(
    latest: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    max_backfill_days: i64,
) -> GapState {
    let now_grid = round_down_to_grid(now);

    let Some(latest) = latest else {
        return GapState::InitialLoadRequired;
    };

    let missing = grid_intervals_between(latest, now_grid);
    if missing == 0 {
        return GapState::UpToDate;
    }

    if missing > max_backfill_days * INTERVALS_PER_DAY {
        return GapState::Unreconcilable { missing };
    }

    GapState::Reconcilable {
        missing,
        start: latest + grid_step(),
        end: now_grid + grid_step(),
    }
}

/// 저장소를 조회해 갭을 분류합니다.
pub async fn detect_gap(
    store: &dyn CandleStore,
    now: DateTime<Utc>,
    max_backfill_days: i64,
) -> Result<GapState> {
    let latest = store.latest_timestamp().await?;
    let state = classify_gap(latest, now, max_backfill_days);

    tracing::debug!(latest = ?latest, state = ?state, "갭 판정");

    Ok(state)
}
