//! Candle sources consumed by the ingestion loop.
//!
//! A [`CandleFeed`] opens a persistent subscription; a [`FallbackSource`] answers a single-shot
//! "latest finalized candle" request while the subscription is down.

use crate::{candle::Candle, error::AlertError};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Binance spot kline WebSocket & REST integration.
pub mod binance;

/// Decoded subscription items. `Err` items with [`AlertError::is_terminal`] end the subscription,
/// others only cost the message that produced them.
pub type CandleStream = BoxStream<'static, Result<Candle, AlertError>>;

/// Persistent candle subscription for one symbol & interval.
#[async_trait]
pub trait CandleFeed: Send {
    /// Open a fresh subscription. The returned stream ends when the connection closes.
    async fn subscribe(&mut self) -> Result<CandleStream, AlertError>;
}

/// Single-shot source of the most recently finalized candle.
#[async_trait]
pub trait FallbackSource: Send + Sync {
    /// `Ok(None)` when no finalized candle is available.
    async fn latest_final(&self) -> Result<Option<Candle>, AlertError>;
}
