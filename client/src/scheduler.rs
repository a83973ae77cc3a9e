use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Bounds and growth factors for the poll delay, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub initial_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    /// Ceiling reached by quiet polls alone; errors may back off past it.
    pub quiet_max_ms: u64,
    pub success_multiplier: f64,
    pub error_multiplier: f64,
    pub quiet_multiplier: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_ms: 1000,
            min_ms: 1000,
            max_ms: 10_000,
            quiet_max_ms: 5000,
            success_multiplier: 0.1,
            error_multiplier: 2.0,
            quiet_multiplier: 1.1,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |reason: String| Err(ConfigError::InvalidScheduler { reason });
        if self.min_ms == 0 {
            return fail("min_ms must be > 0".into());
        }
        if self.min_ms > self.max_ms {
            return fail(format!("min_ms {} exceeds max_ms {}", self.min_ms, self.max_ms));
        }
        if !(self.min_ms..=self.max_ms).contains(&self.initial_ms) {
            return fail(format!(
                "initial_ms {} outside [{}, {}]",
                self.initial_ms, self.min_ms, self.max_ms
            ));
        }
        if !(self.min_ms..=self.max_ms).contains(&self.quiet_max_ms) {
            return fail(format!(
                "quiet_max_ms {} outside [{}, {}]",
                self.quiet_max_ms, self.min_ms, self.max_ms
            ));
        }
        if !(self.success_multiplier > 0.0 && self.success_multiplier < 1.0) {
            return fail(format!(
                "success_multiplier {} must be in (0, 1)",
                self.success_multiplier
            ));
        }
        if !(self.error_multiplier > 1.0 && self.error_multiplier.is_finite()) {
            return fail(format!("error_multiplier {} must be > 1", self.error_multiplier));
        }
        if !(self.quiet_multiplier >= 1.0 && self.quiet_multiplier.is_finite()) {
            return fail(format!("quiet_multiplier {} must be >= 1", self.quiet_multiplier));
        }
        Ok(())
    }
}

/// Adapts the poll period to what the last poll saw.
#[derive(Debug, Clone)]
pub struct PollScheduler {
    config: SchedulerConfig,
    delay_ms: u64,
}

impl PollScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let delay_ms = config.initial_ms;
        Self { config, delay_ms }
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The last poll returned changes: poll again soon.
    pub fn on_success_with_data(&mut self) {
        let next = scale_floor(self.delay_ms, self.config.success_multiplier);
        self.delay_ms = next.clamp(self.config.min_ms, self.config.max_ms);
    }

    /// The last poll failed: back off toward `max_ms`.
    pub fn on_error(&mut self) {
        if self.delay_ms == self.config.max_ms {
            return;
        }
        let next = scale_ceil(self.delay_ms, self.config.error_multiplier);
        self.delay_ms = next.clamp(self.config.min_ms, self.config.max_ms);
    }

    /// The last poll succeeded with nothing new: drift toward `quiet_max_ms`.
    pub fn on_quiet(&mut self) {
        if self.delay_ms == self.config.max_ms || self.delay_ms == self.config.quiet_max_ms {
            return;
        }
        let next = scale_floor(self.delay_ms, self.config.quiet_multiplier);
        self.delay_ms = next.min(self.config.quiet_max_ms);
    }

    pub fn reset(&mut self) {
        self.delay_ms = self.config.initial_ms;
    }
}

fn scale_floor(value: u64, factor: f64) -> u64 {
    (value as f64 * factor).floor() as u64
}

fn scale_ceil(value: u64, factor: f64) -> u64 {
    (value as f64 * factor).ceil() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> PollScheduler {
        PollScheduler::new(SchedulerConfig::default())
    }

    #[test]
    fn defaults_are_valid() {
        SchedulerConfig::default().validate().unwrap();
    }

    #[test]
    fn error_doubles_delay() {
        let mut s = scheduler();
        s.on_error();
        assert_eq!(s.delay_ms(), 2000);
    }

    #[test]
    fn success_clamps_to_min() {
        let mut s = scheduler();
        s.on_error();
        s.on_success_with_data();
        assert_eq!(s.delay_ms(), 1000);
    }

    #[test]
    fn quiet_polls_grow_gently() {
        let mut s = scheduler();
        let mut seen = vec![s.delay_ms()];
        for _ in 0..3 {
            s.on_quiet();
            seen.push(s.delay_ms());
        }
        assert_eq!(seen, vec![1000, 1100, 1210, 1331]);
    }

    #[test]
    fn quiet_polls_never_pass_quiet_max() {
        let mut s = scheduler();
        let mut previous = s.delay_ms();
        for _ in 0..100 {
            s.on_quiet();
            assert!(s.delay_ms() <= 5000);
            assert!(s.delay_ms() >= previous);
            previous = s.delay_ms();
        }
        assert_eq!(s.delay_ms(), 5000);
    }

    #[test]
    fn max_delay_is_sticky_for_errors_and_quiet() {
        let mut s = scheduler();
        for _ in 0..10 {
            s.on_error();
        }
        assert_eq!(s.delay_ms(), 10_000);
        s.on_error();
        assert_eq!(s.delay_ms(), 10_000);
        s.on_quiet();
        assert_eq!(s.delay_ms(), 10_000);
        s.on_success_with_data();
        assert_eq!(s.delay_ms(), 1000);
    }

    #[test]
    fn quiet_after_backoff_settles_to_quiet_max() {
        let mut s = scheduler();
        s.on_error();
        s.on_error();
        s.on_error();
        assert_eq!(s.delay_ms(), 8000);
        s.on_quiet();
        assert_eq!(s.delay_ms(), 5000);
    }

    #[test]
    fn rejects_inverted_bounds() {
        let config = SchedulerConfig {
            min_ms: 5000,
            max_ms: 1000,
            ..SchedulerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SchedulerConfig {
            success_multiplier: 1.5,
            ..SchedulerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
