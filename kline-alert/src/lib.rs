//! # Kline Alert
//! Streaming one-minute kline anomaly detection for a single Binance symbol.
//!
//! Finalized candles arrive over a reconnecting WebSocket [`CandleFeed`], are scored by an
//! [`AnomalyDetector`] (volume z-score & price percentage change, with cooldowns and merging)
//! and every anomaly is pushed through a [`Notifier`], by default Telegram.
//!
//! While the stream is down the [`IngestionLoop`] polls a REST [`FallbackSource`] once per
//! reconnect attempt and backs off exponentially between attempts.
//!
//! [`CandleFeed`]: exchange::CandleFeed
//! [`FallbackSource`]: exchange::FallbackSource
//! [`Notifier`]: notify::Notifier

/// Exponential reconnect backoff.
pub mod backoff;

/// [`Candle`] value type.
pub mod candle;

/// Injected wall clock.
pub mod clock;

/// Environment driven [`Settings`].
pub mod config;

/// Serde helpers.
pub mod de;

/// Volume & price anomaly detection.
pub mod detector;

/// All [`Error`](std::error::Error)s generated in kline-alert.
pub mod error;

/// Candle sources, live and fallback.
pub mod exchange;

/// Reconnecting ingestion loop.
pub mod ingest;

/// Alert delivery.
pub mod notify;

/// Rolling window statistics.
pub mod stats;

/// Stream adapters.
pub mod streams;

pub use backoff::{Backoff, BackoffPolicy};
pub use candle::Candle;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Settings;
pub use detector::{AnomalyDetector, DetectorConfig, SignalKind, SignalSet};
pub use error::{AlertError, ConfigError};
pub use ingest::{ConnectionStatus, CycleReport, IngestionLoop, Market};
pub use notify::{Alert, AlertSource};
