//! Alert delivery.

use crate::{candle::Candle, detector::SignalKind, error::AlertError};
use async_trait::async_trait;
use derive_more::{Constructor, Display};

/// Telegram Bot API notifier.
pub mod telegram;

pub use telegram::{TelegramNotifier, format_alert_html};

/// Where the candle behind an [`Alert`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AlertSource {
    #[display("stream")]
    Stream,
    #[display("rest_fallback")]
    Fallback,
}

/// One anomaly ready for delivery.
#[derive(Debug, Clone, PartialEq, Constructor)]
pub struct Alert {
    pub symbol: String,
    pub interval: String,
    pub base_asset: String,
    pub kind: SignalKind,
    pub candle: Candle,
    pub source: AlertSource,
}

impl Alert {
    /// Human readable origin, e.g. `Binance 1m kline`.
    pub fn source_label(&self) -> String {
        match self.source {
            AlertSource::Stream => format!("Binance {} kline", self.interval),
            AlertSource::Fallback => format!("Binance {} kline (REST fallback)", self.interval),
        }
    }
}

/// Delivers alerts to an operator channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &Alert) -> Result<(), AlertError>;
}
