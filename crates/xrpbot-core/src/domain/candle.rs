//! 15분봉 OHLCV 캔들 타입.
//!
//! 이 모듈은 시계열 저장소에 기록되는 단일 캔들 구조체와
//! 소프트 데이터 품질 검사를 정의합니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 15분 그리드 한 칸에 대한 OHLCV 캔들.
///
/// `timestamp`는 그리드에 정렬된 구간 시작 시간이며 시리즈의 유일한
/// 업무 키입니다. `price_change`는 `close - open`으로 파생되지만 조회
/// 효율을 위해 저장소에도 중복 기록됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// 구간 시작 시간 (UTC, 15분 그리드 정렬)
    pub timestamp: DateTime<Utc>,
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
    /// 가격 변화 (close - open)
    pub price_change: Decimal,
}

impl Candle {
    /// 새 캔들을 생성합니다. `price_change`는 여기서 파생됩니다.
    pub fn new(
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            price_change: close - open,
        }
    }

    /// 캔들 범위(고가 - 저가)를 반환합니다.
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// 양봉(종가 > 시가)인지 확인합니다.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// 소프트 데이터 품질 검사.
    ///
    /// 위반은 저장을 차단하지 않습니다. 호출자가 경고로 로깅한 뒤
    /// 값을 받은 그대로 저장합니다.
    pub fn anomalies(&self) -> Vec<QualityIssue> {
        let mut issues = Vec::new();

        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ] {
            if value < Decimal::ZERO {
                issues.push(QualityIssue::Negative { field, value });
            }
        }

        if self.high < self.low {
            issues.push(QualityIssue::HighBelowLow {
                high: self.high,
                low: self.low,
            });
        }

        issues
    }
}

/// 캔들 데이터 품질 위반.
#[derive(Debug, Clone, PartialEq)]
pub enum QualityIssue {
    /// 음수 필드 값
    Negative {
        /// 필드 이름
        field: &'static str,
        /// 관측된 값
        value: Decimal,
    },
    /// 고가가 저가보다 낮음
    HighBelowLow {
        /// 고가
        high: Decimal,
        /// 저가
        low: Decimal,
    },
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negative { field, value } => {
                write!(f, "negative {}: {}", field, value)
            }
            Self::HighBelowLow { high, low } => {
                write!(f, "high {} is less than low {}", high, low)
            }
        }
    }
}
