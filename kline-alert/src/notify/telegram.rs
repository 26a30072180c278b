use super::{Alert, Notifier};
use crate::{config::Settings, detector::SignalKind, error::AlertError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use tracing::{debug, warn};

pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Render an [`Alert`] as a Telegram HTML message.
pub fn format_alert_html(alert: &Alert) -> String {
    let base = &alert.base_asset;
    let headline = match alert.kind {
        SignalKind::Merged => format!("🚨 <b>{base} anomaly</b>: <b>VOLUME + PRICE</b>"),
        SignalKind::Volume => format!("📈 <b>{base} Volume Spike</b>"),
        SignalKind::Price => format!("⚡ <b>{base} Price Spike</b>"),
    };

    let candle = &alert.candle;
    let when = candle
        .close_time()
        .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| candle.close_time_ms.to_string());

    [
        headline,
        format!(
            "Symbol: <b>{}</b>  |  Interval: <b>{}</b>",
            alert.symbol, alert.interval
        ),
        format!(
            "Close: <b>{:.4}</b>  High/Low: <b>{:.4}</b>/<b>{:.4}</b>",
            candle.close, candle.high, candle.low
        ),
        format!("Minute Volume: <b>{:.2} {base}</b>", candle.volume),
        format!("Time: <code>{when} UTC</code>"),
        format!("Source: {}", alert.source_label()),
    ]
    .join("\n")
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// [`Notifier`] posting HTML messages through the Telegram Bot API `sendMessage` method.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    token: String,
    chat_id: String,
    timeout: Duration,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_url: DEFAULT_TELEGRAM_API_URL.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.telegram_token.clone(),
            settings.telegram_chat_id.clone(),
            settings.http_timeout,
        )
    }

    /// Point at a different Bot API host, e.g. a local bot server.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.token)
    }
}

impl fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, alert: &Alert) -> Result<(), AlertError> {
        let text = format_alert_html(alert);
        let body = SendMessage {
            chat_id: &self.chat_id,
            text: &text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        // reqwest errors embed the url, which carries the bot token
        let response = self
            .client
            .post(self.send_message_url())
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|error| AlertError::Notify(error.without_url().to_string()))?;

        let status = response.status();
        let reply = response
            .json::<TelegramResponse>()
            .await
            .map_err(|error| AlertError::Notify(error.without_url().to_string()))?;

        if !reply.ok {
            let reason = reply.description.unwrap_or_else(|| status.to_string());
            warn!(%status, %reason, "Telegram rejected alert");
            return Err(AlertError::Notify(reason));
        }

        debug!(kind = %alert.kind, symbol = %alert.symbol, "alert delivered");
        Ok(())
    }
}
