//! CoinAPI OHLCV 클라이언트.
//!
//! CoinAPI REST API를 통해 XRP/USD 15분봉 데이터를 수집합니다.
//! 과거 데이터 조회는 100행당 API 크레딧 1개가 차감되므로 호출자는
//! 일일 한도를 감안해 범위를 나눠 요청해야 합니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use xrpbot_data::provider::CoinApiClient;
//!
//! let client = CoinApiClient::new(api_key, "BITSTAMP_SPOT_XRP_USD");
//! let candles = client.fetch_history(start, end).await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Timelike, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{DataError, Result};
use crate::provider::{OhlcvProvider, ProviderCandle};

/// CoinAPI 기본 URL.
const DEFAULT_BASE_URL: &str = "https://rest.coinapi.io/v1";

/// 기본 페이지 크기 (행/호출).
const DEFAULT_ROWS_PER_CALL: u32 = 100;

/// CoinAPI REST 클라이언트.
#[derive(Clone)]
pub struct CoinApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    symbol_id: String,
    rows_per_call: u32,
}

/// CoinAPI OHLCV 원본 레코드.
#[derive(Debug, Deserialize)]
struct RawOhlcv {
    time_period_start: String,
    time_period_end: String,
    price_open: Decimal,
    price_high: Decimal,
    price_low: Decimal,
    price_close: Decimal,
    volume_traded: Decimal,
    #[serde(default)]
    trades_count: Option<u32>,
}

impl RawOhlcv {
    /// 타임스탬프를 정규화해 provider 레코드로 변환.
    fn into_provider_candle(self) -> Result<ProviderCandle> {
        Ok(ProviderCandle {
            period_start: parse_period_timestamp(&self.time_period_start)?,
            period_end: parse_period_timestamp(&self.time_period_end)?,
            open: self.price_open,
            high: self.price_high,
            low: self.price_low,
            close: self.price_close,
            volume: self.volume_traded,
            trade_count: self.trades_count,
        })
    }
}

impl CoinApiClient {
    /// 새로운 CoinAPI 클라이언트 생성.
    ///
    /// # Arguments
    /// * `api_key` - CoinAPI 인증키 (X-CoinAPI-Key 헤더로 전달)
    /// * `symbol_id` - 조회할 심볼 ID (예: "BITSTAMP_SPOT_XRP_USD")
    pub fn new(api_key: impl Into<String>, symbol_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("HTTP 클라이언트 생성 실패"),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            symbol_id: symbol_id.into(),
            rows_per_call: DEFAULT_ROWS_PER_CALL,
        }
    }

    /// 기본 URL 변경 (테스트용).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 호출당 최대 행 수 변경.
    pub fn with_rows_per_call(mut self, rows_per_call: u32) -> Self {
        self.rows_per_call = rows_per_call.max(1);
        self
    }

    /// 조회 대상 심볼 ID.
    pub fn symbol_id(&self) -> &str {
        &self.symbol_id
    }

    async fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Vec<RawOhlcv>> {
        let url = format!("{}/ohlcv/{}/{}", self.base_url, self.symbol_id, endpoint);

        tracing::debug!(
            endpoint = endpoint,
            symbol_id = %self.symbol_id,
            url = %url,
            "CoinAPI 요청"
        );

        let response = self
            .client
            .get(&url)
            .query(params)
            .header("X-CoinAPI-Key", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DataError::FetchError(format!(
                "CoinAPI 오류 [{}]: {} - {}",
                endpoint, status, body
            )));
        }

        let records: Vec<RawOhlcv> = response.json().await?;
        Ok(records)
    }
}

#[async_trait]
impl OhlcvProvider for CoinApiClient {
    async fn fetch_latest(&self) -> Result<Vec<ProviderCandle>> {
        let params = [
            ("period_id", "15MIN".to_string()),
            ("limit", "1".to_string()),
        ];

        let records = self.request("latest", &params).await?;

        tracing::info!(count = records.len(), "최신 OHLCV 조회 완료");

        records
            .into_iter()
            .map(RawOhlcv::into_provider_candle)
            .collect()
    }

    async fn fetch_history(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProviderCandle>> {
        let params = [
            ("period_id", "15MIN".to_string()),
            (
                "time_start",
                start.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("time_end", end.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("limit", self.rows_per_call.to_string()),
        ];

        let records = self.request("history", &params).await?;

        tracing::info!(
            start = %start,
            end = %end,
            count = records.len(),
            "과거 OHLCV 조회 완료"
        );

        records
            .into_iter()
            .map(RawOhlcv::into_provider_candle)
            .collect()
    }
}

/// 제공자 타임스탬프 문자열을 UTC 시각으로 정규화합니다.
///
/// 후행 UTC 마커와 가변 정밀도의 소수 초를 허용하며, 결과는 항상
/// 초 단위로 절삭된 timezone-aware UTC 시각입니다.
pub fn parse_period_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|e| {
                DataError::ParseError(format!("잘못된 구간 타임스탬프 {:?}: {}", raw, e))
            })?
            .and_utc(),
    };

    Ok(parsed.with_nanosecond(0).unwrap_or(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_plain_utc_marker() {
        let parsed = parse_period_timestamp("2023-01-01T00:15:00Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2023, 1, 1, 0, 15, 0).unwrap());
    }

    #[test]
    fn test_parse_seven_digit_fraction() {
        // CoinAPI는 100ns 정밀도의 소수 초를 내려준다
        let parsed = parse_period_timestamp("2023-01-01T00:15:00.0000000Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2023, 1, 1, 0, 15, 0).unwrap());
    }

    #[test]
    fn test_parse_truncates_to_whole_seconds() {
        let parsed = parse_period_timestamp("2023-01-01T00:15:07.123456Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2023, 1, 1, 0, 15, 7).unwrap());
        assert_eq!(parsed.nanosecond(), 0);
    }

    #[test]
    fn test_parse_naive_assumes_utc() {
        let parsed = parse_period_timestamp("2023-01-01T00:15:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2023, 1, 1, 0, 15, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_period_timestamp("not-a-timestamp"),
            Err(DataError::ParseError(_))
        ));
    }
}
