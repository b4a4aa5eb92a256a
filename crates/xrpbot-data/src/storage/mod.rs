//! 캔들 저장소 인터페이스.

pub mod ohlcv;

pub use ohlcv::OhlcvRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use xrpbot_core::Candle;

use crate::Result;

/// 수집 엔진이 요구하는 저장소 작업.
///
/// 엔진은 이 trait을 통해 저장소를 주입받습니다. `upsert_chunk` 한 번이
/// 커밋 단위 하나이며, 반환 후에는 해당 청크가 내구적으로 저장된
/// 상태입니다. 테스트에서는 메모리 저장소로 교체할 수 있습니다.
#[async_trait]
pub trait CandleStore: Send + Sync {
    /// 시리즈에서 가장 최근에 저장된 타임스탬프를 조회합니다.
    ///
    /// 저장소가 비어 있으면 `None`을 반환합니다.
    async fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>>;

    /// 한 청크의 캔들을 단일 트랜잭션으로 upsert합니다.
    ///
    /// 타임스탬프 충돌 시 기존 레코드를 덮어쓰므로 재시도에 대해
    /// 멱등합니다. 실패 시 청크 전체가 롤백됩니다.
    async fn upsert_chunk(&self, candles: &[Candle]) -> Result<usize>;
}
