use crate::{
    candle::Candle,
    config::Settings,
    error::{AlertError, ConfigError},
    exchange::FallbackSource,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Binance spot REST klines path.
pub const KLINES_PATH: &str = "/api/v3/klines";

/// Binance kline response format
#[derive(Debug, Deserialize)]
pub struct BinanceRestKline(
    i64,               // 0: Open time
    String,            // 1: Open
    String,            // 2: High
    String,            // 3: Low
    String,            // 4: Close
    String,            // 5: Volume
    i64,               // 6: Close time
    String,            // 7: Quote asset volume
    i64,               // 8: Number of trades
    String,            // 9: Taker buy base asset volume
    String,            // 10: Taker buy quote asset volume
    serde_json::Value, // 11: Ignore
);

impl BinanceRestKline {
    /// Convert into a [`Candle`], marking it final if its close time has passed at `now_ms`.
    pub fn to_candle(&self, now_ms: i64) -> Result<Candle, AlertError> {
        let parse = |field: &str, raw: &str| {
            raw.parse::<f64>()
                .map_err(|error| AlertError::Decode(format!("kline {field} {raw:?}: {error}")))
        };

        Ok(Candle {
            open_time_ms: self.0,
            close_time_ms: self.6,
            open: parse("open", &self.1)?,
            high: parse("high", &self.2)?,
            low: parse("low", &self.3)?,
            close: parse("close", &self.4)?,
            volume: parse("volume", &self.5)?,
            is_final: self.6 < now_ms,
        })
    }
}

/// Newest kline whose close time has passed at `now_ms`.
pub fn latest_final_candle(
    klines: &[BinanceRestKline],
    now_ms: i64,
) -> Result<Option<Candle>, AlertError> {
    klines
        .iter()
        .rev()
        .map(|kline| kline.to_candle(now_ms))
        .find(|candle| candle.as_ref().map_or(true, |candle| candle.is_final))
        .transpose()
}

/// Single-shot REST fetch of the last finalized kline, used while the stream is down.
#[derive(Debug, Clone)]
pub struct BinanceRestFallback {
    client: Client,
    url: Url,
    symbol: String,
    interval: String,
    timeout: Duration,
}

impl BinanceRestFallback {
    pub fn new(
        rest_base: &str,
        symbol: &str,
        interval: &str,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let url = Url::parse(rest_base)
            .and_then(|base| base.join(KLINES_PATH))
            .map_err(|error| ConfigError::Invalid {
                key: "BINANCE_REST_URL",
                reason: error.to_string(),
            })?;

        Ok(Self {
            client: Client::new(),
            url,
            symbol: symbol.to_uppercase(),
            interval: interval.to_string(),
            timeout,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Self::new(
            &settings.binance_rest_url,
            &settings.symbol,
            &settings.kline_interval,
            settings.http_timeout,
        )
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl FallbackSource for BinanceRestFallback {
    async fn latest_final(&self) -> Result<Option<Candle>, AlertError> {
        // The newest kline is usually still open, so ask for the one before it too
        let klines = self
            .client
            .get(self.url.clone())
            .query(&[
                ("symbol", self.symbol.as_str()),
                ("interval", self.interval.as_str()),
                ("limit", "2"),
            ])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<BinanceRestKline>>()
            .await?;

        let candle = latest_final_candle(&klines, Utc::now().timestamp_millis())?;
        debug!(symbol = %self.symbol, ?candle, "fetched fallback kline");
        Ok(candle)
    }
}
