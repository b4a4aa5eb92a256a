//! 15분봉 OHLCV 저장소.
//!
//! TimescaleDB(PostgreSQL)의 `ohlcv_data_15_min` 테이블에 캔들을
//! 저장하고 조회합니다. `timestamp`가 시리즈의 업무 키이며, 쓰기는
//! `ON CONFLICT (timestamp) DO UPDATE`로 재시도에 대해 멱등합니다.
//!
//! 백필 엔진의 커밋 단위는 청크 하나입니다. `upsert_chunk`는 청크
//! 전체를 단일 트랜잭션으로 기록하므로, 중간 실패 시 해당 청크만
//! 롤백되고 이전 청크는 그대로 유지됩니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use tracing::{debug, info, instrument};
use xrpbot_core::Candle;

use crate::error::{DataError, Result};
use crate::storage::CandleStore;

/// OHLCV 캔들 저장소.
#[derive(Clone)]
pub struct OhlcvRepository {
    pool: PgPool,
}

impl OhlcvRepository {
    /// 새로운 저장소 생성.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 내부 연결 풀을 반환합니다.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 테이블이 없으면 생성합니다.
    ///
    /// TimescaleDB가 설치된 경우 하이퍼테이블로 변환을 시도하고,
    /// 확장이 없으면 일반 테이블로 동작합니다.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ohlcv_data_15_min (
                id BIGINT GENERATED ALWAYS AS IDENTITY,
                timestamp TIMESTAMPTZ NOT NULL,
                open NUMERIC NOT NULL,
                high NUMERIC NOT NULL,
                low NUMERIC NOT NULL,
                close NUMERIC NOT NULL,
                volume NUMERIC NOT NULL,
                price_change NUMERIC NOT NULL,
                UNIQUE (timestamp)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DataError::QueryError(e.to_string()))?;

        // TimescaleDB 하이퍼테이블 변환은 best-effort
        let hypertable = sqlx::query(
            "SELECT create_hypertable('ohlcv_data_15_min', 'timestamp', if_not_exists => TRUE)",
        )
        .execute(&self.pool)
        .await;

        match hypertable {
            Ok(_) => info!("ohlcv_data_15_min 하이퍼테이블 준비 완료"),
            Err(e) => debug!(error = %e, "TimescaleDB 미사용, 일반 테이블로 동작"),
        }

        Ok(())
    }

    /// 가장 최근에 저장된 캔들의 타임스탬프 조회.
    ///
    /// 갭 판정의 기준점 결정에 사용합니다.
    pub async fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        let result: Option<(DateTime<Utc>,)> = sqlx::query_as(
            r#"
            SELECT timestamp FROM ohlcv_data_15_min
            ORDER BY timestamp DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DataError::QueryError(e.to_string()))?;

        Ok(result.map(|(t,)| t))
    }

    /// 가장 오래된 캔들의 타임스탬프 조회.
    pub async fn earliest_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        let result: Option<(DateTime<Utc>,)> = sqlx::query_as(
            r#"
            SELECT timestamp FROM ohlcv_data_15_min
            ORDER BY timestamp ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DataError::QueryError(e.to_string()))?;

        Ok(result.map(|(t,)| t))
    }

    /// `[start, end)` 범위에 저장된 캔들 수 조회.
    pub async fn count_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64> {
        let result: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM ohlcv_data_15_min
            WHERE timestamp >= $1 AND timestamp < $2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DataError::QueryError(e.to_string()))?;

        Ok(result.0)
    }

    /// 한 청크의 캔들을 단일 트랜잭션으로 upsert합니다.
    ///
    /// 타임스탬프당 최대 한 레코드 불변식을 ON CONFLICT upsert로
    /// 유지합니다. 실패 시 트랜잭션 전체가 롤백됩니다.
    #[instrument(skip(self, candles), fields(count = candles.len()))]
    pub async fn upsert_chunk(&self, candles: &[Candle]) -> Result<usize> {
        if candles.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        let mut written = 0;

        for chunk in candles.chunks(500) {
            let mut query_builder = String::from(
                r#"
                INSERT INTO ohlcv_data_15_min (timestamp, open, high, low, close, volume, price_change)
                VALUES
                "#,
            );

            for (i, _candle) in chunk.iter().enumerate() {
                if i > 0 {
                    query_builder.push_str(", ");
                }
                let base = i * 7;
                query_builder.push_str(&format!(
                    "(${}, ${}, ${}, ${}, ${}, ${}, ${})",
                    base + 1,
                    base + 2,
                    base + 3,
                    base + 4,
                    base + 5,
                    base + 6,
                    base + 7
                ));
            }

            query_builder.push_str(
                r#"
                ON CONFLICT (timestamp) DO UPDATE SET
                    open = EXCLUDED.open,
                    high = EXCLUDED.high,
                    low = EXCLUDED.low,
                    close = EXCLUDED.close,
                    volume = EXCLUDED.volume,
                    price_change = EXCLUDED.price_change
                "#,
            );

            let mut query = sqlx::query(&query_builder);

            for candle in chunk {
                query = query
                    .bind(candle.timestamp)
                    .bind(candle.open)
                    .bind(candle.high)
                    .bind(candle.low)
                    .bind(candle.close)
                    .bind(candle.volume)
                    .bind(candle.price_change);
            }

            let result = query
                .execute(&mut *tx)
                .await
                .map_err(|e| DataError::InsertError(e.to_string()))?;

            written += result.rows_affected() as usize;
        }

        tx.commit()
            .await
            .map_err(|e| DataError::InsertError(e.to_string()))?;

        debug!(written = written, "캔들 청크 커밋");
        Ok(written)
    }
}

#[async_trait]
impl CandleStore for OhlcvRepository {
    async fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        OhlcvRepository::latest_timestamp(self).await
    }

    async fn upsert_chunk(&self, candles: &[Candle]) -> Result<usize> {
        OhlcvRepository::upsert_chunk(self, candles).await
    }
}
