//! Exponential reconnect backoff.

use std::time::Duration;

/// Reconnect delay policy: start at `floor`, multiply by `multiplier` after every failed
/// cycle, never exceed `ceiling`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub floor: Duration,
    pub multiplier: f64,
    pub ceiling: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            floor: Duration::from_secs(1),
            multiplier: 2.0,
            ceiling: Duration::from_secs(60),
        }
    }
}

/// Running backoff state for one [`BackoffPolicy`].
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    current: Duration,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            current: policy.floor.min(policy.ceiling),
            policy,
        }
    }

    /// Delay the next [`advance`](Backoff::advance) will return.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Back to the floor, e.g. after a successful reconnect.
    pub fn reset(&mut self) {
        self.current = self.policy.floor.min(self.policy.ceiling);
    }

    /// Return the delay to wait now and grow the next one.
    pub fn advance(&mut self) -> Duration {
        let delay = self.current;
        let ceiling = self.policy.ceiling;
        let next = self.current.as_secs_f64() * self.policy.multiplier.max(1.0);
        self.current = Duration::try_from_secs_f64(next).map_or(ceiling, |next| next.min(ceiling));
        delay
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_ceiling() {
        let mut backoff = Backoff::default();

        let delays = (0..8).map(|_| backoff.advance().as_secs()).collect::<Vec<_>>();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 60, 60]);
    }

    #[test]
    fn test_backoff_reset() {
        let mut backoff = Backoff::default();
        backoff.advance();
        backoff.advance();
        assert_eq!(backoff.current(), Duration::from_secs(4));

        backoff.reset();
        assert_eq!(backoff.advance(), Duration::from_secs(1));
    }

    #[test]
    fn test_custom_policy() {
        struct TestCase {
            policy: BackoffPolicy,
            expected: Vec<Duration>,
        }

        let tests = vec![
            TestCase {
                // TC0: tripling with a low ceiling
                policy: BackoffPolicy {
                    floor: Duration::from_millis(500),
                    multiplier: 3.0,
                    ceiling: Duration::from_secs(5),
                },
                expected: vec![
                    Duration::from_millis(500),
                    Duration::from_millis(1500),
                    Duration::from_millis(4500),
                    Duration::from_secs(5),
                ],
            },
            TestCase {
                // TC1: multiplier below 1 is treated as a constant delay
                policy: BackoffPolicy {
                    floor: Duration::from_secs(2),
                    multiplier: 0.5,
                    ceiling: Duration::from_secs(60),
                },
                expected: vec![Duration::from_secs(2); 4],
            },
            TestCase {
                // TC2: infinite multiplier jumps straight to the ceiling
                policy: BackoffPolicy {
                    floor: Duration::from_secs(1),
                    multiplier: f64::INFINITY,
                    ceiling: Duration::from_secs(60),
                },
                expected: vec![
                    Duration::from_secs(1),
                    Duration::from_secs(60),
                    Duration::from_secs(60),
                    Duration::from_secs(60),
                ],
            },
            TestCase {
                // TC3: ceiling near Duration::MAX saturates instead of overflowing
                policy: BackoffPolicy {
                    floor: Duration::MAX / 2,
                    multiplier: 4.0,
                    ceiling: Duration::MAX,
                },
                expected: vec![Duration::MAX / 2, Duration::MAX, Duration::MAX, Duration::MAX],
            },
            TestCase {
                // TC4: floor above ceiling is clamped
                policy: BackoffPolicy {
                    floor: Duration::from_secs(90),
                    multiplier: 2.0,
                    ceiling: Duration::from_secs(60),
                },
                expected: vec![Duration::from_secs(60); 4],
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let mut backoff = Backoff::new(test.policy);
            let actual = (0..4).map(|_| backoff.advance()).collect::<Vec<_>>();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }
}
