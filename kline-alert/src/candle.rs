use chrono::{DateTime, Utc};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// Milliseconds in one calendar minute.
pub const MINUTE_MS: i64 = 60_000;

/// One OHLCV bar as delivered by the kline feed.
///
/// Only bars with `is_final == true` have stopped changing and are eligible for evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Candle {
    pub open_time_ms: i64,
    pub close_time_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub is_final: bool,
}

impl Candle {
    /// Calendar minute this candle closes in (`close_time_ms / 60_000`, floored).
    pub fn minute_bucket(&self) -> i64 {
        self.close_time_ms.div_euclid(MINUTE_MS)
    }

    /// Close time as a UTC timestamp, if representable.
    pub fn close_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.close_time_ms)
    }
}
