/// Rolling statistics used by the anomaly detector
///
/// Provides a fixed-capacity FIFO window with mean & population standard deviation
use std::collections::VecDeque;

/// Upper bound on the samples allocated up front, larger windows grow on demand
const MAX_PREALLOCATED: usize = 4096;

/// Fixed-capacity window of `f64` samples
///
/// Pushing into a full window evicts the oldest sample first, so `len() <= capacity()` always.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    /// Maximum number of samples to keep
    capacity: usize,
    /// Samples, oldest at the front
    values: VecDeque<f64>,
}

impl RollingWindow {
    /// Create a new window holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity.min(MAX_PREALLOCATED)),
        }
    }

    /// Append a sample, evicting the oldest one if at capacity
    pub fn push(&mut self, value: f64) {
        if self.capacity == 0 {
            return;
        }

        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the window is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Oldest sample still in the window
    pub fn oldest(&self) -> Option<f64> {
        self.values.front().copied()
    }

    /// Arithmetic mean, `0.0` when empty
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Population standard deviation (divides by `n`), `0.0` with fewer than 2 samples
    pub fn std_dev(&self) -> f64 {
        self.mean_std_dev().1
    }

    /// Mean and population standard deviation in a single pass over the mean
    pub fn mean_std_dev(&self) -> (f64, f64) {
        let n = self.values.len();
        if n == 0 {
            return (0.0, 0.0);
        }

        let mean = self.mean();
        if n == 1 {
            return (mean, 0.0);
        }

        let variance = self
            .values
            .iter()
            .map(|&v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / n as f64;

        (mean, variance.sqrt())
    }

    /// Z-score of `value` against the current contents, `0.0` when the window has no spread
    pub fn z_score(&self, value: f64) -> f64 {
        let (mean, std_dev) = self.mean_std_dev();
        if std_dev > 0.0 {
            (value - mean) / std_dev
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_window_evicts_oldest() {
        let mut window = RollingWindow::new(3);

        window.push(1.0);
        window.push(2.0);
        window.push(3.0);
        assert_eq!(window.len(), 3);
        assert_eq!(window.oldest(), Some(1.0));

        // Overflow
        window.push(4.0);
        assert_eq!(window.len(), 3);
        assert_eq!(window.oldest(), Some(2.0));
        assert_eq!(window.mean(), 3.0);
    }

    #[test]
    fn test_rolling_window_empty_is_zero() {
        let window = RollingWindow::new(5);
        assert!(window.is_empty());
        assert_eq!(window.mean(), 0.0);
        assert_eq!(window.std_dev(), 0.0);
        assert_eq!(window.z_score(1_000.0), 0.0);
        assert_eq!(window.oldest(), None);
    }

    #[test]
    fn test_rolling_window_single_sample_has_no_spread() {
        let mut window = RollingWindow::new(5);
        window.push(42.0);
        assert_eq!(window.mean(), 42.0);
        assert_eq!(window.std_dev(), 0.0);
    }

    #[test]
    fn test_population_std_dev() {
        let mut window = RollingWindow::new(8);
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            window.push(v);
        }

        // Textbook population example: mean 5, sigma 2 (sample sigma would be ~2.138)
        let (mean, std_dev) = window.mean_std_dev();
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((std_dev - 2.0).abs() < 1e-12);
        assert!((window.z_score(11.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_identical_samples_give_zero_z_score() {
        let mut window = RollingWindow::new(30);
        for _ in 0..30 {
            window.push(100.0);
        }
        assert_eq!(window.std_dev(), 0.0);
        assert_eq!(window.z_score(500.0), 0.0);
    }

    #[test]
    fn test_huge_capacity_grows_on_demand() {
        let mut window = RollingWindow::new(usize::MAX);
        for v in [1.0, 2.0, 3.0] {
            window.push(v);
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.oldest(), Some(1.0));
    }

    #[test]
    fn test_zero_capacity_never_grows() {
        let mut window = RollingWindow::new(0);
        window.push(1.0);
        assert_eq!(window.len(), 0);
    }
}
