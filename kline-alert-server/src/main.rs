use kline_alert::{
    AnomalyDetector, IngestionLoop, Market, Settings,
    exchange::binance::{BinanceKlineFeed, BinanceRestFallback},
    notify::TelegramNotifier,
};
use rustls::crypto::ring::default_provider;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Initialize logging
    init_logging();

    // Install crypto provider for rustls (required for WSS & HTTPS)
    let _ = default_provider().install_default();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(error) => {
            error!(%error, "invalid configuration, set TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID in .env");
            std::process::exit(1);
        }
    };
    info!(?settings, "loaded configuration");

    let feed = match BinanceKlineFeed::from_settings(&settings) {
        Ok(feed) => feed,
        Err(error) => {
            error!(%error, "invalid kline stream configuration");
            std::process::exit(1);
        }
    };
    let fallback = match BinanceRestFallback::from_settings(&settings) {
        Ok(fallback) => fallback,
        Err(error) => {
            error!(%error, "invalid REST fallback configuration");
            std::process::exit(1);
        }
    };

    let mut ingest = IngestionLoop::new(
        feed,
        fallback,
        TelegramNotifier::from_settings(&settings),
        AnomalyDetector::new(settings.detector_config()),
        settings.backoff,
        Market::from_settings(&settings),
    );

    // Log connection status transitions
    let mut status = ingest.status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = *status.borrow_and_update();
            info!(status = %current, "connection status changed");
        }
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl-C, shutting down"),
            Err(error) => warn!(%error, "failed to listen for Ctrl-C, shutting down"),
        }
        let _ = shutdown_tx.send(true);
    });

    info!(
        symbol = %settings.symbol,
        interval = %settings.kline_interval,
        "starting kline anomaly alerts"
    );
    ingest.run(shutdown_rx).await;
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
