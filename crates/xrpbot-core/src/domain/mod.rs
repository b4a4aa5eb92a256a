//! 도메인 타입.

pub mod candle;

pub use candle::{Candle, QualityIssue};
