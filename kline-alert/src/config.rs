//! Runtime configuration loaded once at startup.
//!
//! Values come from environment variables (optionally seeded from a `.env` file). Unparseable
//! numeric values fall back to their defaults; missing Telegram credentials abort startup.

use crate::{
    backoff::BackoffPolicy, detector::DetectorConfig, error::ConfigError,
    streams::DEFAULT_READ_TIMEOUT,
};
use std::{fmt, str::FromStr, time::Duration};
use tracing::warn;

pub const DEFAULT_SYMBOL: &str = "SOLUSDT";
pub const DEFAULT_BINANCE_WS_URL: &str = "wss://stream.binance.com:9443/ws";
pub const DEFAULT_BINANCE_REST_URL: &str = "https://api.binance.com";

/// Largest accepted `VOLUME_WINDOW` / `PRICE_WINDOW`, one week of one-minute candles.
pub const MAX_WINDOW: usize = 7 * 24 * 60;

/// Quote assets stripped from the symbol to find the traded base asset.
const QUOTE_ASSETS: [&str; 6] = ["FDUSD", "USDT", "USDC", "BUSD", "BTC", "ETH"];

#[derive(Clone)]
pub struct Settings {
    pub telegram_token: String,
    pub telegram_chat_id: String,
    /// Upper-case Binance symbol, e.g. `SOLUSDT`.
    pub symbol: String,
    pub kline_interval: String,
    pub volume_window: usize,
    pub volume_zscore: f64,
    pub minute_volume_min: f64,
    pub price_window: usize,
    pub price_pct_change: f64,
    pub alert_cooldown_min: u64,
    pub merge_signals_window: u32,
    pub binance_ws_url: String,
    pub binance_rest_url: String,
    pub backoff: BackoffPolicy,
    pub ws_ping_interval: Duration,
    pub ws_read_timeout: Duration,
    pub http_timeout: Duration,
}

impl Settings {
    /// Load configuration from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key -> value lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let telegram_token = string("TELEGRAM_BOT_TOKEN", "");
        if telegram_token.is_empty() {
            return Err(ConfigError::Missing("TELEGRAM_BOT_TOKEN"));
        }

        let telegram_chat_id = string("TELEGRAM_CHAT_ID", "");
        if telegram_chat_id.is_empty() {
            return Err(ConfigError::Missing("TELEGRAM_CHAT_ID"));
        }

        let volume_window = parse_or(&lookup, "VOLUME_WINDOW", 30usize);
        if volume_window == 0 || volume_window > MAX_WINDOW {
            return Err(ConfigError::Invalid {
                key: "VOLUME_WINDOW",
                reason: format!("must be between 1 and {MAX_WINDOW}, got {volume_window}"),
            });
        }

        let price_window = parse_or(&lookup, "PRICE_WINDOW", 10usize);
        if price_window > MAX_WINDOW {
            return Err(ConfigError::Invalid {
                key: "PRICE_WINDOW",
                reason: format!("must be at most {MAX_WINDOW}, got {price_window}"),
            });
        }

        let multiplier = parse_or(&lookup, "BACKOFF_MULTIPLIER", 2.0f64);
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "BACKOFF_MULTIPLIER",
                reason: format!("must be a finite positive number, got {multiplier}"),
            });
        }

        Ok(Self {
            telegram_token,
            telegram_chat_id,
            symbol: string("SYMBOL", DEFAULT_SYMBOL).to_uppercase(),
            kline_interval: string("KLINE_INTERVAL", "1m"),
            volume_window,
            volume_zscore: parse_or(&lookup, "VOLUME_ZSCORE", 3.0),
            minute_volume_min: parse_or(&lookup, "MINUTE_VOLUME_MIN", 0.0),
            price_window,
            price_pct_change: parse_or(&lookup, "PRICE_PCT_CHANGE", 2.0),
            alert_cooldown_min: parse_or(&lookup, "ALERT_COOLDOWN_MIN", 10),
            merge_signals_window: parse_or(&lookup, "MERGE_SIGNALS_WINDOW", 1),
            binance_ws_url: string("BINANCE_WS_URL", DEFAULT_BINANCE_WS_URL),
            binance_rest_url: string("BINANCE_REST_URL", DEFAULT_BINANCE_REST_URL),
            backoff: BackoffPolicy {
                floor: secs_or(&lookup, "BACKOFF_FLOOR_SECS", 1.0),
                multiplier,
                ceiling: secs_or(&lookup, "BACKOFF_CEILING_SECS", 60.0),
            },
            ws_ping_interval: Duration::from_secs(parse_or(&lookup, "WS_PING_INTERVAL_SECS", 25)),
            ws_read_timeout: Duration::from_secs(parse_or(
                &lookup,
                "WS_READ_TIMEOUT_SECS",
                DEFAULT_READ_TIMEOUT.as_secs(),
            )),
            http_timeout: Duration::from_secs(parse_or(&lookup, "HTTP_TIMEOUT_SECS", 10)),
        })
    }

    /// Thresholds for the [`AnomalyDetector`](crate::detector::AnomalyDetector).
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            volume_window: self.volume_window,
            volume_zscore: self.volume_zscore,
            min_volume: self.minute_volume_min,
            price_window: self.price_window,
            price_pct_change: self.price_pct_change,
            cooldown: i64::try_from(self.alert_cooldown_min)
                .ok()
                .and_then(chrono::Duration::try_minutes)
                .unwrap_or(chrono::Duration::MAX),
            merge_window_minutes: self.merge_signals_window,
        }
    }

    /// Base asset of the symbol, e.g. `SOL` for `SOLUSDT`.
    pub fn base_asset(&self) -> &str {
        QUOTE_ASSETS
            .iter()
            .find_map(|quote| {
                self.symbol
                    .strip_suffix(quote)
                    .filter(|base| !base.is_empty())
            })
            .unwrap_or(&self.symbol)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("telegram_token", &"<redacted>")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("symbol", &self.symbol)
            .field("kline_interval", &self.kline_interval)
            .field("volume_window", &self.volume_window)
            .field("volume_zscore", &self.volume_zscore)
            .field("minute_volume_min", &self.minute_volume_min)
            .field("price_window", &self.price_window)
            .field("price_pct_change", &self.price_pct_change)
            .field("alert_cooldown_min", &self.alert_cooldown_min)
            .field("merge_signals_window", &self.merge_signals_window)
            .field("binance_ws_url", &self.binance_ws_url)
            .field("binance_rest_url", &self.binance_rest_url)
            .field("backoff", &self.backoff)
            .field("ws_ping_interval", &self.ws_ping_interval)
            .field("ws_read_timeout", &self.ws_read_timeout)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + fmt::Debug,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, raw = %raw, ?default, "invalid configuration value, using default");
            default
        }),
    }
}

fn secs_or<F>(lookup: &F, key: &str, default: f64) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    let secs = parse_or(lookup, key, default);
    Duration::try_from_secs_f64(secs).unwrap_or_else(|_| {
        warn!(key, secs, default, "invalid duration, using default");
        Duration::from_secs_f64(default)
    })
}
