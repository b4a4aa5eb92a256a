//! 환경변수 기반 설정 모듈.

use crate::Result;
use std::time::Duration;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL
    pub database_url: String,
    /// CoinAPI 설정
    pub coinapi: CoinApiConfig,
    /// 백필 설정
    pub backfill: BackfillConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
}

/// CoinAPI 접속 설정
#[derive(Debug, Clone)]
pub struct CoinApiConfig {
    /// API 키
    pub api_key: String,
    /// REST 기본 URL
    pub base_url: String,
    /// 심볼 ID
    pub symbol_id: String,
}

/// 백필 / 예산 설정
#[derive(Debug, Clone)]
pub struct BackfillConfig {
    /// 일일 API 호출 한도 (로컬 추정치, 서버가 실제 한도를 강제)
    pub daily_call_limit: u32,
    /// 호출당 최대 행 수 (100행 = 크레딧 1개)
    pub rows_per_call: u32,
    /// 자동 백필을 허용하는 최대 갭 (일)
    pub max_backfill_days: i64,
    /// 초기 적재 기본 기간 (일)
    pub initial_load_days: i64,
}

/// 데몬 모드 설정
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// 수집 주기 (분 단위)
    pub interval_minutes: u64,
    /// 시작 시 갭 보정 실행 여부
    pub reconcile_on_start: bool,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL").map_err(|_| {
            crate::error::CollectorError::Config(
                "DATABASE_URL 환경변수가 설정되지 않았습니다".to_string(),
            )
        })?;

        let api_key = std::env::var("COINAPI_API_KEY").map_err(|_| {
            crate::error::CollectorError::Config(
                "COINAPI_API_KEY 환경변수가 설정되지 않았습니다".to_string(),
            )
        })?;

        Ok(Self {
            database_url,
            coinapi: CoinApiConfig {
                api_key,
                base_url: std::env::var("COINAPI_BASE_URL")
                    .unwrap_or_else(|_| "https://rest.coinapi.io/v1".to_string()),
                symbol_id: std::env::var("COINAPI_SYMBOL_ID")
                    .unwrap_or_else(|_| "BITSTAMP_SPOT_XRP_USD".to_string()),
            },
            backfill: BackfillConfig {
                daily_call_limit: env_var_parse("COINAPI_DAILY_LIMIT", 100),
                rows_per_call: env_var_parse("COINAPI_ROWS_PER_CALL", 100),
                max_backfill_days: env_var_parse("MAX_BACKFILL_DAYS", 90),
                initial_load_days: env_var_parse("INITIAL_LOAD_DAYS", 30),
            },
            daemon: DaemonConfig {
                interval_minutes: env_var_parse("DAEMON_INTERVAL_MINUTES", 15),
                reconcile_on_start: env_var_bool("DAEMON_RECONCILE_ON_START", true),
            },
        })
    }
}

impl DaemonConfig {
    /// 수집 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 환경변수에서 bool 값 파싱
fn env_var_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_parse_uses_default_when_missing() {
        assert_eq!(env_var_parse("XRPBOT_TEST_UNSET_KEY", 42_u32), 42);
    }

    #[test]
    fn test_env_var_parse_reads_value() {
        std::env::set_var("XRPBOT_TEST_PARSE_KEY", "7");
        assert_eq!(env_var_parse("XRPBOT_TEST_PARSE_KEY", 42_u32), 7);
        std::env::remove_var("XRPBOT_TEST_PARSE_KEY");
    }

    #[test]
    fn test_env_var_bool() {
        std::env::set_var("XRPBOT_TEST_BOOL_KEY", "1");
        assert!(env_var_bool("XRPBOT_TEST_BOOL_KEY", false));
        std::env::set_var("XRPBOT_TEST_BOOL_KEY", "false");
        assert!(!env_var_bool("XRPBOT_TEST_BOOL_KEY", true));
        std::env::remove_var("XRPBOT_TEST_BOOL_KEY");
    }
}
