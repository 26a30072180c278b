use self::kline::parse_kline_message;
use crate::{
    candle::Candle,
    config::Settings,
    error::{AlertError, ConfigError},
    exchange::{CandleFeed, CandleStream},
    streams::TimeoutStream,
};
use async_trait::async_trait;
use futures::{SinkExt, Stream, StreamExt, future, stream::BoxStream};
use std::{
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, Message},
};
use tracing::{debug, info, warn};
use url::Url;

/// Kline stream payloads & decoding.
pub mod kline;

/// REST kline fetch used as the fallback source.
pub mod rest;

pub use kline::{BinanceKline, BinanceKlineEvent, BinanceKlineMessage};
pub use rest::{BinanceRestFallback, BinanceRestKline};

/// Build the raw kline stream url, e.g. `wss://stream.binance.com:9443/ws/solusdt@kline_1m`.
pub fn kline_stream_url(ws_base: &str, symbol: &str, interval: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "{}/{}@kline_{}",
        ws_base.trim_end_matches('/'),
        symbol.to_lowercase(),
        interval
    ))
}

/// Binance spot kline WebSocket [`CandleFeed`].
#[derive(Debug, Clone)]
pub struct BinanceKlineFeed {
    url: Url,
    ping_interval: Duration,
    read_timeout: Duration,
}

impl BinanceKlineFeed {
    pub fn new(
        ws_base: &str,
        symbol: &str,
        interval: &str,
        ping_interval: Duration,
        read_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let url = kline_stream_url(ws_base, symbol, interval).map_err(|error| {
            ConfigError::Invalid {
                key: "BINANCE_WS_URL",
                reason: error.to_string(),
            }
        })?;

        Ok(Self {
            url,
            ping_interval,
            read_timeout,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Self::new(
            &settings.binance_ws_url,
            &settings.symbol,
            &settings.kline_interval,
            settings.ws_ping_interval,
            settings.ws_read_timeout,
        )
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl CandleFeed for BinanceKlineFeed {
    async fn subscribe(&mut self) -> Result<CandleStream, AlertError> {
        debug!(url = %self.url, "connecting to kline stream");
        let (websocket, _) = connect_async(self.url.as_str()).await?;
        info!(url = %self.url, "connected to kline stream");

        let (mut write, read) = websocket.split();

        // Binance drops connections that stay silent, so keep pinging until the stream is dropped
        let ping = (!self.ping_interval.is_zero()).then(|| {
            let ping_interval = self.ping_interval;
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(ping_interval);
                interval.tick().await;
                loop {
                    interval.tick().await;
                    if let Err(error) = write.send(Message::Ping(vec![].into())).await {
                        debug!(%error, "failed to send ping, connection likely dead");
                        break;
                    }
                }
            })
        });

        let inner = TimeoutStream::new(read, self.read_timeout)
            .filter_map(|frame| future::ready(decode_frame(frame)))
            .boxed();

        Ok(KlineStream { inner, ping }.boxed())
    }
}

/// Map one WebSocket frame to a stream item. `None` for frames carrying no kline.
pub fn decode_frame(
    frame: Result<Message, tungstenite::Error>,
) -> Option<Result<Candle, AlertError>> {
    match frame {
        Ok(Message::Text(text)) => parse_kline_message(text.as_str()).transpose(),
        Ok(Message::Close(close)) => {
            let reason = close
                .map(|frame| format!("{} {}", frame.code, frame.reason))
                .unwrap_or_else(|| "no close frame".to_string());
            info!(%reason, "server closed kline stream");
            Some(Err(AlertError::StreamClosed(reason)))
        }
        Ok(Message::Ping(_) | Message::Pong(_)) => None,
        Ok(Message::Binary(_) | Message::Frame(_)) => {
            debug!("ignoring non-text kline stream frame");
            None
        }
        Err(error) => {
            warn!(%error, "kline stream socket error");
            Some(Err(AlertError::from(error)))
        }
    }
}

/// Decoded kline stream owning its keep-alive ping task.
struct KlineStream {
    inner: BoxStream<'static, Result<Candle, AlertError>>,
    ping: Option<JoinHandle<()>>,
}

impl Stream for KlineStream {
    type Item = Result<Candle, AlertError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl Drop for KlineStream {
    fn drop(&mut self) {
        if let Some(ping) = self.ping.take() {
            ping.abort();
        }
    }
}
