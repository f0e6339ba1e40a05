//! Adaptive retransmission timeout (RTO).
//!
//! [`TimeoutEstimator`] keeps a window of the most recent round-trip samples
//! and derives the timeout from their spread:
//!   `RTO = mean + 4 × stddev`
//! clamped to `[min_rto, max_rto]`.  Each retransmission doubles the RTO
//! (exponential back-off) up to `max_rto`; the next RTT sample recomputes it
//! from the window.

use std::collections::VecDeque;
use std::time::Duration;

/// Adjustable timeout parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerConfig {
    /// RTO before any RTT sample is available.
    pub initial_rto: Duration,
    /// Lower bound on the RTO.
    pub min_rto: Duration,
    /// Upper bound on the RTO, including after back-off.
    pub max_rto: Duration,
    /// Number of RTT samples kept; the oldest is evicted first.
    pub max_samples: usize,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            initial_rto: Duration::from_millis(500),
            min_rto: Duration::from_millis(100),
            max_rto: Duration::from_secs(30),
            max_samples: 50,
        }
    }
}

/// Retransmission-timeout state for one sender.
#[derive(Debug, Clone)]
pub struct TimeoutEstimator {
    config: TimerConfig,
    samples: VecDeque<Duration>,
    current_rto: Duration,
}

impl Default for TimeoutEstimator {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}

impl TimeoutEstimator {
    pub fn new(config: TimerConfig) -> Self {
        let current_rto = config.initial_rto.clamp(config.min_rto, config.max_rto);
        Self {
            samples: VecDeque::with_capacity(config.max_samples),
            config,
            current_rto,
        }
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Current retransmission timeout.
    pub fn timeout(&self) -> Duration {
        self.current_rto
    }

    /// Number of RTT samples in the window.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Record an RTT sample from an acknowledged transmission and recompute
    /// the RTO from the sample window.
    pub fn record_rtt(&mut self, rtt: Duration) {
        self.samples.push_back(rtt);
        while self.samples.len() > self.config.max_samples.max(1) {
            self.samples.pop_front();
        }

        let n = self.samples.len() as f64;
        let mean = self.samples.iter().map(Duration::as_secs_f64).sum::<f64>() / n;
        let variance = self
            .samples
            .iter()
            .map(|s| (s.as_secs_f64() - mean).powi(2))
            .sum::<f64>()
            / n;

        let rto = Duration::from_secs_f64(mean + 4.0 * variance.sqrt());
        self.current_rto = rto.clamp(self.config.min_rto, self.config.max_rto);
    }

    /// Double the RTO after a retransmission, capped at `max_rto`.
    pub fn on_retransmission(&mut self) {
        self.current_rto = (self.current_rto * 2).min(self.config.max_rto);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// RTO arithmetic goes through `f64`; allow for rounding.
    fn assert_close(actual: Duration, expected: Duration) {
        let diff = actual.abs_diff(expected);
        assert!(diff < Duration::from_micros(1), "{actual:?} != {expected:?}");
    }

    #[test]
    fn starts_at_initial_rto() {
        assert_eq!(TimeoutEstimator::default().timeout(), ms(500));
    }

    #[test]
    fn initial_rto_is_clamped() {
        let e = TimeoutEstimator::new(TimerConfig {
            initial_rto: ms(1),
            ..TimerConfig::default()
        });
        assert_eq!(e.timeout(), ms(100));
    }

    #[test]
    fn steady_samples_give_mean() {
        let mut e = TimeoutEstimator::default();
        for _ in 0..5 {
            e.record_rtt(ms(200));
        }
        // Zero spread: RTO is just the mean.
        assert_close(e.timeout(), ms(200));
    }

    #[test]
    fn spread_adds_four_stddev() {
        let mut e = TimeoutEstimator::default();
        e.record_rtt(ms(100));
        e.record_rtt(ms(300));
        // mean 200 ms, population stddev 100 ms -> 600 ms.
        assert_close(e.timeout(), ms(600));
    }

    #[test]
    fn small_samples_clamp_to_min() {
        let mut e = TimeoutEstimator::default();
        e.record_rtt(ms(1));
        assert_eq!(e.timeout(), ms(100));
    }

    #[test]
    fn huge_samples_clamp_to_max() {
        let mut e = TimeoutEstimator::default();
        e.record_rtt(Duration::from_secs(120));
        assert_eq!(e.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn window_evicts_oldest_sample() {
        let mut e = TimeoutEstimator::default();
        e.record_rtt(Duration::from_secs(10));
        for _ in 0..50 {
            e.record_rtt(ms(150));
        }
        assert_eq!(e.sample_count(), 50);
        // The 10 s outlier has been evicted, so there is no spread left.
        assert_close(e.timeout(), ms(150));
    }

    #[test]
    fn back_off_doubles_and_caps() {
        let mut e = TimeoutEstimator::default();
        let mut last = e.timeout();
        for _ in 0..3 {
            e.on_retransmission();
            assert!(e.timeout() > last);
            last = e.timeout();
        }
        assert_eq!(last, Duration::from_secs(4));
        for _ in 0..10 {
            e.on_retransmission();
        }
        assert_eq!(e.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn sample_after_back_off_recomputes() {
        let mut e = TimeoutEstimator::default();
        e.on_retransmission();
        e.on_retransmission();
        e.record_rtt(ms(250));
        assert_close(e.timeout(), ms(250));
    }
}
