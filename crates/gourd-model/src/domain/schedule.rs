use std::time::Duration;

/// Upper bound for any configured interval (ten years).
///
/// Keeps timer arithmetic far away from `Instant` overflow when a remote config carries an absurd value.
const MAX_INTERVAL_SECS: f64 = 10.0 * 365.0 * 24.0 * 3600.0;

/// Timing parameters of one periodic task.
///
/// A task is enabled if and only if its period is non-zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScheduleParams {
    /// Delay before the first firing.
    pub start_interval: Duration,
    /// Delay between consecutive firings.
    pub period: Duration,
}

impl ScheduleParams {
    pub const DISABLED: ScheduleParams = ScheduleParams {
        start_interval: Duration::ZERO,
        period: Duration::ZERO,
    };

    pub fn new(start_interval: Duration, period: Duration) -> Self {
        Self {
            start_interval,
            period,
        }
    }

    /// Build from second values as they appear in the configuration document.
    ///
    /// Negative, zero and non-finite values map to zero.
    pub fn from_secs(start_interval: f64, period: f64) -> Self {
        Self {
            start_interval: secs(start_interval),
            period: secs(period),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        !self.period.is_zero()
    }
}

fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value.min(MAX_INTERVAL_SECS))
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_period_is_disabled() {
        assert!(!ScheduleParams::from_secs(10.0, 0.0).is_enabled());
        assert!(!ScheduleParams::from_secs(10.0, -5.0).is_enabled());
        assert!(!ScheduleParams::from_secs(10.0, f64::NAN).is_enabled());
        assert!(ScheduleParams::from_secs(0.0, 0.1).is_enabled());
    }

    #[test]
    fn huge_values_are_clamped() {
        let p = ScheduleParams::from_secs(f64::MAX, 1e300);
        assert_eq!(p.period, Duration::from_secs_f64(MAX_INTERVAL_SECS));
        assert_eq!(p.start_interval, p.period);
    }
}
