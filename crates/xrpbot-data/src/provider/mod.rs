//! OHLCV 제공자 인터페이스.

pub mod coinapi;

pub use coinapi::CoinApiClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::Result;

/// 제공자가 반환하는 한 구간의 OHLCV 레코드.
///
/// 타임스탬프는 클라이언트에서 이미 UTC로 정규화되고 초 단위로
/// 절삭된 상태입니다.
#[derive(Debug, Clone)]
pub struct ProviderCandle {
    /// 구간 시작 시간
    pub period_start: DateTime<Utc>,
    /// 구간 종료 시간
    pub period_end: DateTime<Utc>,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량
    pub volume: Decimal,
    /// 체결 건수
    pub trade_count: Option<u32>,
}

/// OHLCV 시계열 제공자 trait.
///
/// 수집 엔진은 이 trait을 통해 제공자를 주입받습니다. 테스트에서는
/// 합성 데이터를 반환하는 대역으로 교체할 수 있습니다.
#[async_trait]
pub trait OhlcvProvider: Send + Sync {
    /// 가장 최근 15분봉을 조회합니다.
    async fn fetch_latest(&self) -> Result<Vec<ProviderCandle>>;

    /// `[start, end)` 범위의 과거 15분봉을 조회합니다.
    ///
    /// 호출자는 한 번에 최대 하루 범위만 요청하며, 한 페이지
    /// 분량(rows_per_call) 이하의 레코드를 기대합니다.
    async fn fetch_history(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProviderCandle>>;
}
