//! Standalone data collector CLI.

use std::io::{self, Write};

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xrpbot_collector::modules::{
    collect_latest, detect_gap, reconcile, BackfillPlan, GapState, RateBudget, ReconcileOutcome,
    ReconcilePolicy,
};
use xrpbot_collector::CollectorConfig;
use xrpbot_data::{CoinApiClient, OhlcvRepository};

#[derive(Parser)]
#[command(name = "xrpbot-collector")]
#[command(about = "XRP/USD 15-minute OHLCV Collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// 최신 15분봉 1회 수집
    Collect,

    /// 갭 판정 후 백필 실행
    Backfill {
        /// 초기 적재 기간 재정의 (일)
        #[arg(long)]
        days: Option<i64>,

        /// 확인 프롬프트 없이 진행
        #[arg(long)]
        yes: bool,
    },

    /// 갭 상태만 출력 (API 호출 없음)
    Status,

    /// 데몬 모드: 주기적으로 최신 캔들 수집
    Daemon,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "xrpbot_collector={level},xrpbot_data={level}",
                    level = cli.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("XRP Market Data Collector 시작");

    // 설정 로드
    let config = CollectorConfig::from_env()?;
    tracing::debug!(symbol_id = %config.coinapi.symbol_id, "설정 로드 완료");

    // DB 연결 및 스키마 확인
    let pool = sqlx::PgPool::connect(&config.database_url).await?;
    tracing::info!("데이터베이스 연결 성공");

    let repo = OhlcvRepository::new(pool.clone());
    repo.ensure_schema().await?;

    // 제공자 클라이언트
    let provider = CoinApiClient::new(&config.coinapi.api_key, &config.coinapi.symbol_id)
        .with_base_url(&config.coinapi.base_url)
        .with_rows_per_call(config.backfill.rows_per_call);

    let mut budget = RateBudget::new(
        config.backfill.daily_call_limit,
        config.backfill.rows_per_call,
    );
    let policy = ReconcilePolicy {
        max_backfill_days: config.backfill.max_backfill_days,
        initial_load_days: config.backfill.initial_load_days,
    };

    // 명령 실행
    match cli.command {
        Commands::Collect => {
            let written = collect_latest(&repo, &provider).await?;
            tracing::info!(written = written, "수집 완료");
        }

        Commands::Backfill { days, yes } => {
            let mut policy = policy;
            if let Some(days) = days {
                policy.initial_load_days = days;
            }

            let outcome = if yes {
                reconcile(
                    &repo,
                    &provider,
                    &mut budget,
                    &policy,
                    Utc::now(),
                    &|_: &BackfillPlan| true,
                )
                .await?
            } else {
                reconcile(
                    &repo,
                    &provider,
                    &mut budget,
                    &policy,
                    Utc::now(),
                    &prompt_confirm,
                )
                .await?
            };

            report_outcome(&outcome);
        }

        Commands::Status => {
            if let (Some(earliest), Some(latest)) =
                (repo.earliest_timestamp().await?, repo.latest_timestamp().await?)
            {
                let stored = repo
                    .count_range(earliest, latest + xrpbot_core::grid::grid_step())
                    .await?;
                tracing::info!(
                    earliest = %earliest,
                    latest = %latest,
                    stored = stored,
                    "저장소 현황"
                );
            }

            let state = detect_gap(&repo, Utc::now(), config.backfill.max_backfill_days).await?;
            match state {
                GapState::UpToDate => tracing::info!("갭 없음, 시리즈 최신 상태"),
                GapState::InitialLoadRequired => {
                    tracing::info!("저장소 비어 있음, `backfill --days N`으로 초기 적재 필요")
                }
                GapState::Reconcilable { missing, start, end } => tracing::info!(
                    missing = missing,
                    start = %start,
                    end = %end,
                    calls_required = budget.calls_required(missing.max(0) as u64),
                    "보정 가능한 갭"
                ),
                GapState::Unreconcilable { missing } => tracing::warn!(
                    missing = missing,
                    max_backfill_days = config.backfill.max_backfill_days,
                    "갭이 허용 한도 초과, 전체 재초기화 필요"
                ),
            }
        }

        Commands::Daemon => {
            tracing::info!(
                "=== 데몬 모드 시작 (주기: {}분) ===",
                config.daemon.interval_minutes
            );

            // 재시작 직후의 작은 갭은 스스로 메운다
            if config.daemon.reconcile_on_start {
                match reconcile(
                    &repo,
                    &provider,
                    &mut budget,
                    &policy,
                    Utc::now(),
                    &auto_confirm,
                )
                .await
                {
                    Ok(outcome) => report_outcome(&outcome),
                    Err(e) => tracing::error!("시작 시 갭 보정 실패: {}", e),
                }
            }

            let mut interval = tokio::time::interval(config.daemon.interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("종료 신호 수신, 데몬 종료 중...");
                        break;
                    }
                    _ = interval.tick() => {
                        match collect_latest(&repo, &provider).await {
                            Ok(written) => {
                                tracing::info!(written = written, "주기 수집 완료");
                            }
                            Err(e) => {
                                tracing::error!("주기 수집 실패: {}", e);
                            }
                        }
                    }
                }
            }
        }
    }

    pool.close().await;
    tracing::info!("XRP Market Data Collector 종료");

    Ok(())
}

/// 실행 결과 요약 로그.
fn report_outcome(outcome: &ReconcileOutcome) {
    match outcome {
        ReconcileOutcome::UpToDate => {}
        ReconcileOutcome::Completed { stats, .. } => stats.log_summary("백필"),
        ReconcileOutcome::RefusedUnreconcilable { missing } => {
            tracing::warn!(missing = missing, "백필 거부됨 (갭 초과)")
        }
        ReconcileOutcome::Declined { plan } => {
            tracing::info!(calls_required = plan.calls_required, "백필 취소됨")
        }
    }
}

/// 터미널 확인 프롬프트.
fn prompt_confirm(plan: &BackfillPlan) -> bool {
    print!(
        "예상 API 호출 {}회가 남은 예산 {}회를 초과합니다. 계속할까요? [y/N] ",
        plan.calls_required, plan.budget_remaining
    );
    io::stdout().flush().ok();

    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_err() {
        return false;
    }

    matches!(line.trim(), "y" | "Y" | "yes")
}

/// 비대화형 경로의 자동 확인. 경고를 남기고 진행한다.
fn auto_confirm(plan: &BackfillPlan) -> bool {
    tracing::warn!(
        calls_required = plan.calls_required,
        budget_remaining = plan.budget_remaining,
        "예산 추정 초과, 비대화형 모드에서 자동 진행"
    );
    true
}
