//! Volume z-score & price percentage-change anomaly detection over finalized klines.
//!
//! Every finalized candle is evaluated against statistics of the candles *before* it, then
//! folded into those statistics. Raw triggers pass through a per-kind cooldown and are merged
//! into a single signal when volume and price fire on the same candle.

use crate::{
    candle::Candle,
    clock::{Clock, SystemClock},
    stats::RollingWindow,
};
use chrono::{DateTime, Duration, Utc};
use derive_more::Display;
use fnv::FnvHashMap;
use tracing::debug;

/// Minimum number of prior volume samples before a z-score is trusted, regardless of window size.
pub const MIN_VOLUME_SAMPLES: usize = 5;

/// Fraction of the volume window that must be filled before a z-score is trusted.
pub const MIN_VOLUME_FILL_RATIO: f64 = 0.3;

/// Thresholds & window sizes for an [`AnomalyDetector`].
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Number of prior minute volumes forming the z-score baseline.
    pub volume_window: usize,
    /// Volume signal fires when `z >= volume_zscore`.
    pub volume_zscore: f64,
    /// Minute volumes below this floor never fire (disabled when `<= 0`).
    pub min_volume: f64,
    /// Lookback, in minutes, of the price-change baseline.
    pub price_window: usize,
    /// Price signal fires when `|pct change| >= price_pct_change`.
    pub price_pct_change: f64,
    /// Minimum time between two reports of the same signal kind.
    pub cooldown: Duration,
    /// Accepted for configuration compatibility; volume & price only merge on the same candle.
    pub merge_window_minutes: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            volume_window: 30,
            volume_zscore: 3.0,
            min_volume: 0.0,
            price_window: 10,
            price_pct_change: 2.0,
            cooldown: Duration::minutes(10),
            merge_window_minutes: 1,
        }
    }
}

impl DetectorConfig {
    /// Number of prior volume samples required before the volume signal may fire.
    pub fn min_volume_samples(&self) -> usize {
        let fill = (self.volume_window as f64 * MIN_VOLUME_FILL_RATIO).floor() as usize;
        MIN_VOLUME_SAMPLES.max(fill)
    }
}

/// Kind of alert reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum SignalKind {
    #[display("volume")]
    Volume,
    #[display("price")]
    Price,
    #[display("merged")]
    Merged,
}

/// Outcome of evaluating one candle. At most one flag is ever set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalSet {
    pub volume: bool,
    pub price: bool,
    pub merged: bool,
}

impl SignalSet {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn of(kind: SignalKind) -> Self {
        match kind {
            SignalKind::Volume => Self { volume: true, ..Self::default() },
            SignalKind::Price => Self { price: true, ..Self::default() },
            SignalKind::Merged => Self { merged: true, ..Self::default() },
        }
    }

    pub fn any(&self) -> bool {
        self.volume || self.price || self.merged
    }

    /// The reported kind, if any.
    pub fn kind(&self) -> Option<SignalKind> {
        if self.merged {
            Some(SignalKind::Merged)
        } else if self.volume {
            Some(SignalKind::Volume)
        } else if self.price {
            Some(SignalKind::Price)
        } else {
            None
        }
    }
}

/// Stateful anomaly detector for a single symbol.
///
/// Owned by exactly one ingestion loop, which calls [`evaluate`](AnomalyDetector::evaluate)
/// sequentially in arrival order.
#[derive(Debug)]
pub struct AnomalyDetector<C = SystemClock> {
    config: DetectorConfig,
    clock: C,
    volumes: RollingWindow,
    prices: RollingWindow,
    last_fired: FnvHashMap<SignalKind, DateTime<Utc>>,
    last_minute: Option<i64>,
}

impl AnomalyDetector<SystemClock> {
    pub fn new(config: DetectorConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C> AnomalyDetector<C>
where
    C: Clock,
{
    pub fn with_clock(config: DetectorConfig, clock: C) -> Self {
        Self {
            volumes: RollingWindow::new(config.volume_window),
            // Oldest element is the baseline, the rest is the lookback
            prices: RollingWindow::new(config.price_window.saturating_add(1)),
            last_fired: FnvHashMap::default(),
            last_minute: None,
            config,
            clock,
        }
    }

    /// Minute bucket of the last evaluated candle.
    pub fn last_minute(&self) -> Option<i64> {
        self.last_minute
    }

    /// Number of volume samples currently forming the baseline.
    pub fn volume_samples(&self) -> usize {
        self.volumes.len()
    }

    /// Number of close prices currently held for the price baseline.
    pub fn price_samples(&self) -> usize {
        self.prices.len()
    }

    /// Last time `kind` was reported.
    pub fn last_fired(&self, kind: SignalKind) -> Option<DateTime<Utc>> {
        self.last_fired.get(&kind).copied()
    }

    /// Evaluate one candle, updating rolling statistics and cooldowns.
    ///
    /// Non-final candles and candles for an already-processed minute yield [`SignalSet::none`]
    /// without touching any statistics.
    pub fn evaluate(&mut self, candle: &Candle) -> SignalSet {
        if !candle.is_final {
            return SignalSet::none();
        }

        let minute = candle.minute_bucket();
        if self.last_minute.is_some_and(|last| minute <= last) {
            debug!(minute, last_minute = ?self.last_minute, "skipping already processed minute");
            return SignalSet::none();
        }
        self.last_minute = Some(minute);

        let mut volume = self.volume_signal(candle.volume);
        let mut price = self.price_signal(candle.close);

        let now = self.clock.now();
        if volume && self.cooling_down(SignalKind::Volume, now) {
            debug!(minute, "volume signal suppressed by cooldown");
            volume = false;
        }
        if price && self.cooling_down(SignalKind::Price, now) {
            debug!(minute, "price signal suppressed by cooldown");
            price = false;
        }

        let signals = match (volume, price) {
            (true, true) => SignalSet::of(SignalKind::Merged),
            (true, false) => SignalSet::of(SignalKind::Volume),
            (false, true) => SignalSet::of(SignalKind::Price),
            (false, false) => SignalSet::none(),
        };

        if let Some(kind) = signals.kind() {
            self.last_fired.insert(kind, now);
        }

        signals
    }

    /// Volume z-score against prior minutes. The sample is pushed after scoring, always.
    fn volume_signal(&mut self, volume: f64) -> bool {
        let below_floor = self.config.min_volume > 0.0 && volume < self.config.min_volume;

        let signal = if below_floor {
            false
        } else {
            let z = self.volumes.z_score(volume);
            let warmed_up = self.volumes.len() >= self.config.min_volume_samples();
            debug!(volume, z, samples = self.volumes.len(), "volume z-score");
            warmed_up && z >= self.config.volume_zscore
        };

        self.volumes.push(volume);
        signal
    }

    /// Percentage change of `close` against the oldest close in the window.
    fn price_signal(&mut self, close: f64) -> bool {
        let baseline = self.prices.oldest().unwrap_or(close);

        let signal = if self.prices.len() >= self.config.price_window {
            let pct = if baseline != 0.0 {
                (close - baseline) / baseline * 100.0
            } else {
                0.0
            };
            debug!(close, baseline, pct, "price change");
            pct.abs() >= self.config.price_pct_change
        } else {
            false
        };

        self.prices.push(close);
        signal
    }

    fn cooling_down(&self, kind: SignalKind, now: DateTime<Utc>) -> bool {
        self.last_fired
            .get(&kind)
            .is_some_and(|fired| now.signed_duration_since(*fired) < self.config.cooldown)
    }
}
