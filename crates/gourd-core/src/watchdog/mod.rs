//! Liveness watchdog.
//!
//! Successful outbound deliveries call [`Watchdog::touch`]. The watchdog task
//! calls [`Watchdog::tick`], which fires the [`RestartAction`] once the device
//! has been silent for longer than the configured threshold.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, error};

pub const WATCHDOG_REASON: &str = "Watchdog exceeded min reboot time";

/// What to do when liveness is lost.
#[async_trait]
pub trait RestartAction: Send + Sync {
    async fn restart(&self, reason: &str);
}

#[derive(Debug, Default)]
struct Liveness {
    last: Option<Instant>,
    /// Set when a breach fired the action; cleared by the next `touch`.
    tripped: bool,
}

pub struct Watchdog {
    liveness: Mutex<Liveness>,
    threshold: Mutex<Duration>,
    action: Arc<dyn RestartAction>,
}

impl Watchdog {
    pub fn new(threshold: Duration, action: Arc<dyn RestartAction>) -> Self {
        Self {
            liveness: Mutex::new(Liveness::default()),
            threshold: Mutex::new(threshold),
            action,
        }
    }

    /// Update the silence threshold; zero disables the watchdog.
    pub fn set_threshold(&self, threshold: Duration) {
        *self.threshold.lock().unwrap() = threshold;
    }

    pub fn threshold(&self) -> Duration {
        *self.threshold.lock().unwrap()
    }

    /// Record a successful delivery.
    pub fn touch(&self) {
        let mut l = self.liveness.lock().unwrap();
        l.last = Some(Instant::now());
        l.tripped = false;
    }

    pub fn last_liveness(&self) -> Option<Instant> {
        self.liveness.lock().unwrap().last
    }

    /// Check liveness; returns `true` when this call fired the restart action.
    ///
    /// Never fires before the first `touch`, never with a zero threshold, and
    /// at most once per breach.
    pub async fn tick(&self) -> bool {
        let threshold = self.threshold();
        let elapsed = {
            let mut l = self.liveness.lock().unwrap();
            let Some(last) = l.last else {
                debug!("watchdog: no delivery recorded yet");
                return false;
            };
            let elapsed = last.elapsed();
            if threshold.is_zero() || l.tripped || elapsed <= threshold {
                return false;
            }
            l.tripped = true;
            elapsed
        };

        error!(
            elapsed = elapsed.as_secs_f64(),
            threshold = threshold.as_secs_f64(),
            "watchdog exceeded min reboot time"
        );
        self.action.restart(WATCHDOG_REASON).await;
        true
    }
}

impl std::fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watchdog")
            .field("liveness", &*self.liveness.lock().unwrap())
            .field("threshold", &self.threshold())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingRestart {
        calls: AtomicUsize,
        reasons: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RestartAction for CountingRestart {
        async fn restart(&self, reason: &str) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reasons.lock().unwrap().push(reason.to_string());
        }
    }

    fn watchdog(secs: u64) -> (Watchdog, Arc<CountingRestart>) {
        let action = Arc::new(CountingRestart::default());
        (Watchdog::new(Duration::from_secs(secs), action.clone()), action)
    }

    #[tokio::test(start_paused = true)]
    async fn breach_triggers_exactly_once() {
        let (wd, action) = watchdog(900);
        wd.touch();
        tokio::time::advance(Duration::from_secs(901)).await;

        assert!(wd.tick().await);
        assert!(!wd.tick().await);
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(!wd.tick().await);

        assert_eq!(action.calls.load(Ordering::SeqCst), 1);
        assert_eq!(action.reasons.lock().unwrap()[0], WATCHDOG_REASON);
    }

    #[tokio::test(start_paused = true)]
    async fn within_threshold_does_nothing() {
        let (wd, action) = watchdog(900);
        wd.touch();
        tokio::time::advance(Duration::from_secs(900)).await;
        assert!(!wd.tick().await);
        assert_eq!(action.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn never_touched_never_triggers() {
        let (wd, action) = watchdog(900);
        tokio::time::advance(Duration::from_secs(10_000)).await;
        assert!(!wd.tick().await);
        assert_eq!(action.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_threshold_disables() {
        let (wd, action) = watchdog(0);
        wd.touch();
        tokio::time::advance(Duration::from_secs(10_000)).await;
        assert!(!wd.tick().await);
        assert_eq!(action.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn touch_rearms_after_breach() {
        let (wd, action) = watchdog(10);
        wd.touch();
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(wd.tick().await);

        wd.touch();
        assert!(!wd.tick().await);
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(wd.tick().await);
        assert_eq!(action.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn threshold_is_live_adjustable() {
        let (wd, action) = watchdog(900);
        wd.touch();
        tokio::time::advance(Duration::from_secs(120)).await;
        assert!(!wd.tick().await);

        wd.set_threshold(Duration::from_secs(60));
        assert!(wd.tick().await);
        assert_eq!(action.calls.load(Ordering::SeqCst), 1);
    }
}
