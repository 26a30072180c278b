//! Reconnecting ingestion loop driving the [`AnomalyDetector`].
//!
//! Each cycle walks `Connecting -> Streaming -> Degraded`: subscribe, evaluate finalized candles
//! until the stream ends, fetch one fallback candle, then sleep the current backoff.

use crate::{
    backoff::{Backoff, BackoffPolicy},
    candle::Candle,
    clock::{Clock, SystemClock},
    config::Settings,
    detector::AnomalyDetector,
    exchange::{CandleFeed, FallbackSource},
    notify::{Alert, AlertSource, Notifier},
};
use derive_more::{Constructor, Display};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Connection state published by the [`IngestionLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ConnectionStatus {
    #[display("connecting")]
    Connecting,
    #[display("streaming")]
    Streaming,
    #[display("degraded")]
    Degraded,
}

/// Outcome of one [`IngestionLoop::cycle`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Subscription succeeded this cycle.
    pub connected: bool,
    /// Finalized candles handed to the detector, fallback included.
    pub candles_evaluated: usize,
    /// Alerts successfully delivered.
    pub alerts_sent: usize,
    /// Fallback returned a candle.
    pub fallback_used: bool,
    /// Delay slept before the next cycle.
    pub backoff: Duration,
}

/// Labels attached to every [`Alert`].
#[derive(Debug, Clone, PartialEq, Eq, Constructor)]
pub struct Market {
    pub symbol: String,
    pub interval: String,
    pub base_asset: String,
}

impl Market {
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.symbol.clone(),
            settings.kline_interval.clone(),
            settings.base_asset().to_string(),
        )
    }
}

/// Single consumer that owns the detector and feeds it at most one candle per minute.
#[derive(Debug)]
pub struct IngestionLoop<Feed, Fallback, Notify, C = SystemClock> {
    feed: Feed,
    fallback: Fallback,
    notifier: Notify,
    detector: AnomalyDetector<C>,
    backoff: Backoff,
    market: Market,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl<Feed, Fallback, Notify, C> IngestionLoop<Feed, Fallback, Notify, C>
where
    Feed: CandleFeed,
    Fallback: FallbackSource,
    Notify: Notifier,
    C: Clock,
{
    pub fn new(
        feed: Feed,
        fallback: Fallback,
        notifier: Notify,
        detector: AnomalyDetector<C>,
        backoff: BackoffPolicy,
        market: Market,
    ) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Connecting);
        Self {
            feed,
            fallback,
            notifier,
            detector,
            backoff: Backoff::new(backoff),
            market,
            status_tx,
        }
    }

    /// Subscribe to [`ConnectionStatus`] changes.
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    pub fn detector(&self) -> &AnomalyDetector<C> {
        &self.detector
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Run cycles until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            symbol = %self.market.symbol,
            interval = %self.market.interval,
            "starting kline anomaly ingestion"
        );

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            tokio::select! {
                report = self.cycle() => {
                    debug!(?report, "ingestion cycle complete");
                }
                // Resolves only on `true` or a dropped sender
                _ = shutdown.wait_for(|stop| *stop) => break,
            }
        }

        info!(symbol = %self.market.symbol, "ingestion stopped");
    }

    /// Run one `Connecting -> Streaming -> Degraded` cycle, including the backoff sleep.
    pub async fn cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        self.set_status(ConnectionStatus::Connecting);
        match self.feed.subscribe().await {
            Ok(mut stream) => {
                report.connected = true;
                self.backoff.reset();
                self.set_status(ConnectionStatus::Streaming);

                while let Some(item) = stream.next().await {
                    match item {
                        Ok(candle) if candle.is_final => {
                            report.candles_evaluated += 1;
                            if self.dispatch(&candle, AlertSource::Stream).await {
                                report.alerts_sent += 1;
                            }
                        }
                        Ok(_) => {}
                        Err(error) if error.is_terminal() => {
                            warn!(%error, "kline stream terminated");
                            break;
                        }
                        Err(error) => {
                            warn!(%error, "skipping undecodable kline message");
                        }
                    }
                }
                info!(symbol = %self.market.symbol, "kline stream ended");
            }
            Err(error) => {
                warn!(%error, "failed to subscribe to kline stream");
            }
        }

        self.set_status(ConnectionStatus::Degraded);
        match self.fallback.latest_final().await {
            Ok(Some(candle)) => {
                report.fallback_used = true;
                report.candles_evaluated += 1;
                if self.dispatch(&candle, AlertSource::Fallback).await {
                    report.alerts_sent += 1;
                }
            }
            Ok(None) => debug!("no finalized fallback kline available"),
            Err(error) => warn!(%error, "fallback kline fetch failed"),
        }

        report.backoff = self.backoff.advance();
        info!(delay = ?report.backoff, "waiting before reconnecting");
        tokio::time::sleep(report.backoff).await;

        report
    }

    /// Evaluate one candle and deliver an alert if it fired. Returns whether an alert was sent.
    async fn dispatch(&mut self, candle: &Candle, source: AlertSource) -> bool {
        let Some(kind) = self.detector.evaluate(candle).kind() else {
            return false;
        };

        let alert = Alert::new(
            self.market.symbol.clone(),
            self.market.interval.clone(),
            self.market.base_asset.clone(),
            kind,
            *candle,
            source,
        );
        info!(%kind, %source, close = candle.close, volume = candle.volume, "anomaly detected");

        match self.notifier.notify(&alert).await {
            Ok(()) => true,
            Err(error) => {
                error!(%error, %kind, "failed to deliver alert");
                false
            }
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.status_tx.send_replace(status);
    }
}
