//! 통합 테스트용 대역 (메모리 저장소, 합성 제공자).
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal_macros::dec;
use xrpbot_core::grid::grid_step;
use xrpbot_core::Candle;
use xrpbot_data::{CandleStore, DataError, OhlcvProvider, ProviderCandle};

/// BTreeMap 기반 메모리 캔들 저장소.
///
/// `upsert_chunk` 호출 하나가 커밋 단위 하나이며, 타임스탬프 키가
/// 유일성을 보장한다.
#[derive(Default)]
pub struct MemoryStore {
    candles: Mutex<BTreeMap<DateTime<Utc>, Candle>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, candle: Candle) {
        self.candles.lock().unwrap().insert(candle.timestamp, candle);
    }

    pub fn len(&self) -> usize {
        self.candles.lock().unwrap().len()
    }

    pub fn all(&self) -> Vec<Candle> {
        self.candles.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl CandleStore for MemoryStore {
    async fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>, DataError> {
        Ok(self.candles.lock().unwrap().keys().next_back().copied())
    }

    async fn upsert_chunk(&self, candles: &[Candle]) -> Result<usize, DataError> {
        let mut map = self.candles.lock().unwrap();
        for candle in candles {
            map.insert(candle.timestamp, candle.clone());
        }
        Ok(candles.len())
    }
}

/// 그리드 슬롯마다 합성 캔들을 생성하는 제공자 대역.
#[derive(Default)]
pub struct MockProvider {
    /// n번째 fetch_history 호출에서 실패 (1부터 시작)
    pub fail_on_call: Option<usize>,
    calls: Mutex<usize>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::default()
        }
    }

    /// 지금까지의 fetch_history 호출 수.
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

/// `[start, end)` 범위의 각 15분 슬롯에 대한 합성 캔들.
pub fn synthetic_candles(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<ProviderCandle> {
    let mut out = Vec::new();
    let mut ts = start;
    while ts < end {
        out.push(ProviderCandle {
            period_start: ts,
            period_end: ts + grid_step(),
            open: dec!(1.0),
            high: dec!(1.1),
            low: dec!(0.9),
            close: dec!(1.05),
            volume: dec!(1000000),
            trade_count: Some(8),
        });
        ts += grid_step();
    }
    out
}

#[async_trait]
impl OhlcvProvider for MockProvider {
    async fn fetch_latest(&self) -> Result<Vec<ProviderCandle>, DataError> {
        let now = xrpbot_core::grid::round_down_to_grid(Utc::now());
        Ok(synthetic_candles(now, now + grid_step()))
    }

    async fn fetch_history(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProviderCandle>, DataError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;

        if self.fail_on_call == Some(*calls) {
            return Err(DataError::FetchError("synthetic outage".to_string()));
        }

        Ok(synthetic_candles(start, end))
    }
}
