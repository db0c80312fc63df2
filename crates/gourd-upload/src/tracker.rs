use std::sync::Arc;

use gourd_core::watchdog::Watchdog;
use gourd_model::{Delivery, DeliveryOutcome};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::InFlightFlags;

/// Settles message acknowledgments.
///
/// A positive delivery proves the device is online: it feeds the watchdog,
/// removes the files named by the correlation token and releases the video
/// in-flight flag when asked to. A negative one leaves everything in place,
/// so the next upload tick finds the same artifact again.
#[derive(Debug)]
pub struct DeliveryTracker {
    flags: Arc<InFlightFlags>,
    watchdog: Arc<Watchdog>,
}

impl DeliveryTracker {
    pub fn new(flags: Arc<InFlightFlags>, watchdog: Arc<Watchdog>) -> Self {
        Self { flags, watchdog }
    }

    pub async fn on_delivery(&self, delivery: Delivery) {
        let Delivery {
            message_id,
            token,
            outcome,
        } = delivery;

        if let DeliveryOutcome::Error(reason) = outcome {
            warn!(%message_id, %reason, %token, "message not delivered; files kept");
            return;
        }

        debug!(%message_id, "message delivered");
        self.watchdog.touch();

        for path in &token.files_to_remove {
            match tokio::fs::remove_file(path).await {
                Ok(()) => info!(path = %path.display(), "removed delivered file"),
                Err(e) => error!(path = %path.display(), error = %e, "failed to remove delivered file"),
            }
        }
        if token.clear_video_uploading {
            self.flags.video.release();
        }
    }

    /// Drain deliveries until `cancel` fires or every sender is gone.
    pub async fn run(self: Arc<Self>, mut rx: UnboundedReceiver<Delivery>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = rx.recv() => match next {
                    Some(delivery) => self.on_delivery(delivery).await,
                    None => break,
                },
            }
        }
        debug!("delivery tracker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gourd_core::watchdog::RestartAction;
    use gourd_model::CorrelationToken;
    use std::{path::PathBuf, time::Duration};
    use tempfile::TempDir;

    struct NoRestart;

    #[async_trait]
    impl RestartAction for NoRestart {
        async fn restart(&self, _reason: &str) {}
    }

    fn tracker() -> (DeliveryTracker, Arc<InFlightFlags>, Arc<Watchdog>) {
        let flags = Arc::new(InFlightFlags::default());
        let watchdog = Arc::new(Watchdog::new(Duration::from_secs(900), Arc::new(NoRestart)));
        (
            DeliveryTracker::new(flags.clone(), watchdog.clone()),
            flags,
            watchdog,
        )
    }

    fn pair(dir: &TempDir) -> (PathBuf, PathBuf) {
        let artifact = dir.path().join("clip.mp4");
        let sidecar = dir.path().join("clip.mp4.json");
        std::fs::write(&artifact, b"v").unwrap();
        std::fs::write(&sidecar, b"{}").unwrap();
        (artifact, sidecar)
    }

    fn delivery(token: CorrelationToken, outcome: DeliveryOutcome) -> Delivery {
        Delivery {
            message_id: "m-1".into(),
            token,
            outcome,
        }
    }

    #[tokio::test]
    async fn positive_delivery_cleans_up_and_releases() {
        let dir = TempDir::new().unwrap();
        let (artifact, sidecar) = pair(&dir);
        let (tracker, flags, watchdog) = tracker();
        assert!(flags.video.try_claim(None));

        let token = CorrelationToken::for_companion(artifact.clone(), sidecar.clone(), true);
        tracker.on_delivery(delivery(token, DeliveryOutcome::Ok)).await;

        assert!(!artifact.exists());
        assert!(!sidecar.exists());
        assert!(!flags.video.is_set());
        assert!(watchdog.last_liveness().is_some());
    }

    #[tokio::test]
    async fn negative_delivery_keeps_everything() {
        let dir = TempDir::new().unwrap();
        let (artifact, sidecar) = pair(&dir);
        let (tracker, flags, watchdog) = tracker();
        assert!(flags.video.try_claim(None));

        let token = CorrelationToken::for_companion(artifact.clone(), sidecar.clone(), true);
        tracker
            .on_delivery(delivery(token, DeliveryOutcome::Error("timeout".into())))
            .await;

        assert!(artifact.exists());
        assert!(sidecar.exists());
        assert!(flags.video.is_set());
        assert!(watchdog.last_liveness().is_none());
    }

    #[tokio::test]
    async fn missing_file_still_releases_flag() {
        let dir = TempDir::new().unwrap();
        let (artifact, sidecar) = pair(&dir);
        std::fs::remove_file(&artifact).unwrap();
        let (tracker, flags, _) = tracker();
        assert!(flags.video.try_claim(None));

        let token = CorrelationToken::for_companion(artifact, sidecar.clone(), true);
        tracker.on_delivery(delivery(token, DeliveryOutcome::Ok)).await;

        assert!(!sidecar.exists());
        assert!(!flags.video.is_set());
    }

    #[tokio::test]
    async fn plain_telemetry_only_feeds_watchdog() {
        let (tracker, flags, watchdog) = tracker();
        assert!(flags.video.try_claim(None));

        tracker
            .on_delivery(delivery(CorrelationToken::default(), DeliveryOutcome::Ok))
            .await;

        assert!(flags.video.is_set());
        assert!(watchdog.last_liveness().is_some());
    }

    #[tokio::test]
    async fn run_drains_until_senders_drop() {
        let dir = TempDir::new().unwrap();
        let (artifact, sidecar) = pair(&dir);
        let (tracker, flags, _) = tracker();
        assert!(flags.video.try_claim(None));

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let token = CorrelationToken::for_companion(artifact.clone(), sidecar, true);
        tx.send(delivery(token, DeliveryOutcome::Ok)).unwrap();
        drop(tx);

        Arc::new(tracker).run(rx, CancellationToken::new()).await;
        assert!(!artifact.exists());
        assert!(!flags.video.is_set());
    }
}
