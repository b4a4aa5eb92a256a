//! 백필 오케스트레이터.
//!
//! 갭 판정, 예산 추정, 청크 백필을 하나의 진입점으로 묶습니다.
//! 정책 거부(갭 초과, 확인 거절)는 에러가 아니라 정상 종료
//! 경로이며 fetch 단계를 건너뛰고 로그만 남깁니다. fetch 단계의
//! 에러는 그대로 전파됩니다.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use xrpbot_core::grid::{grid_intervals_between, grid_step, round_down_to_grid};
use xrpbot_data::{CandleStore, OhlcvProvider};

use crate::{BackfillStats, Result};

use super::backfill::run_backfill;
use super::budget::RateBudget;
use super::gap::{detect_gap, GapState};

/// 백필 정책.
#[derive(Debug, Clone)]
pub struct ReconcilePolicy {
    /// 자동 백필을 허용하는 최대 갭 (일)
    pub max_backfill_days: i64,
    /// 초기 적재 기간 (일, max_backfill_days로 상한)
    pub initial_load_days: i64,
}

/// 실행 전 계산된 백필 계획.
///
/// 예산 초과 여부는 순수 술어로 노출되고, 사용자와의 상호작용은
/// 호출자가 넘기는 확인 콜백이 담당합니다.
#[derive(Debug, Clone)]
pub struct BackfillPlan {
    /// 가져올 범위 시작
    pub start: DateTime<Utc>,
    /// 가져올 범위 끝 (exclusive)
    pub end: DateTime<Utc>,
    /// 누락 구간 수
    pub missing: i64,
    /// 필요한 API 호출 수 추정
    pub calls_required: u32,
    /// 남은 예산
    pub budget_remaining: u32,
}

impl BackfillPlan {
    /// 추정 호출 수가 남은 예산을 넘는지 확인.
    pub fn exceeds_budget(&self) -> bool {
        self.calls_required > self.budget_remaining
    }
}

/// 보정 실행 결과 요약.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// 갭 없음, 아무것도 하지 않음
    UpToDate,
    /// 백필 완료
    Completed {
        /// 실행 통계
        stats: BackfillStats,
        /// 덮은 범위 시작
        start: DateTime<Utc>,
        /// 덮은 범위 끝 (exclusive)
        end: DateTime<Utc>,
    },
    /// 갭이 허용 한도를 넘어 거부. 전체 재초기화 필요.
    RefusedUnreconcilable {
        /// 누락 구간 수
        missing: i64,
    },
    /// 사용자가 확인을 거절
    Declined {
        /// 거절된 계획
        plan: BackfillPlan,
    },
}

/// 갭을 판정하고 필요한 범위를 백필합니다.
///
/// 추정 호출 수가 남은 예산을 넘을 때만 `confirm`을 호출하며,
/// 성공 시 사용량이 `budget`에 반영됩니다.
pub async fn reconcile(
    store: &dyn CandleStore,
    provider: &dyn OhlcvProvider,
    budget: &mut RateBudget,
    policy: &ReconcilePolicy,
    now: DateTime<Utc>,
    confirm: &dyn Fn(&BackfillPlan) -> bool,
) -> Result<ReconcileOutcome> {
    let state = detect_gap(store, now, policy.max_backfill_days).await?;

    match state {
        GapState::UpToDate => {
            info!("시리즈 최신 상태, 백필 불필요");
            Ok(ReconcileOutcome::UpToDate)
        }

        GapState::Unreconcilable { missing } => {
            warn!(
                missing = missing,
                max_backfill_days = policy.max_backfill_days,
                "갭이 허용 한도를 초과, 증분 백필 거부. 전체 재초기화를 실행하세요"
            );
            Ok(ReconcileOutcome::RefusedUnreconcilable { missing })
        }

        GapState::InitialLoadRequired => {
            let days = policy
                .initial_load_days
                .clamp(1, policy.max_backfill_days.max(1));
            let end = round_down_to_grid(now) + grid_step();
            let start = end - Duration::days(days);
            let missing = grid_intervals_between(start, end);

            info!(days = days, start = %start, end = %end, "빈 저장소, 초기 적재 시작");

            execute_plan(store, provider, budget, start, end, missing, confirm).await
        }

        GapState::Reconcilable {
            missing,
            start,
            end,
        } => {
            info!(missing = missing, start = %start, end = %end, "보정 가능한 갭 감지");

            execute_plan(store, provider, budget, start, end, missing, confirm).await
        }
    }
}

async fn execute_plan(
    store: &dyn CandleStore,
    provider: &dyn OhlcvProvider,
    budget: &mut RateBudget,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    missing: i64,
    confirm: &dyn Fn(&BackfillPlan) -> bool,
) -> Result<ReconcileOutcome> {
    let plan = BackfillPlan {
        start,
        end,
        missing,
        calls_required: budget.calls_required(missing.max(0) as u64),
        budget_remaining: budget.remaining(),
    };

    if plan.exceeds_budget() {
        warn!(
            calls_required = plan.calls_required,
            budget_remaining = plan.budget_remaining,
            "추정 호출 수가 남은 예산을 초과"
        );

        if !confirm(&plan) {
            info!("사용자가 백필을 거절했습니다");
            return Ok(ReconcileOutcome::Declined { plan });
        }
    }

    let stats = run_backfill(store, provider, start, end).await?;
    budget.consume(stats.calls);

    info!(
        start = %start,
        end = %end,
        candles = stats.candles,
        calls = stats.calls,
        budget_remaining = budget.remaining(),
        "백필 완료"
    );

    Ok(ReconcileOutcome::Completed { stats, start, end })
}
