use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, RwLock},
    time::Duration,
};

use gourd_model::{
    CompanionMessage, CorrelationToken, FileKind, OutboundMessage, TransferContext, UploadClass,
};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    MessageChannel, ObjectStore, PutRequest, UploadError,
    scan::{list_sorted, sidecar_path},
};

/// Single-flight guard for one upload class.
///
/// Holds the instant it was claimed. With a lease, a claim older than the
/// lease may be taken over; without one it stays until released.
#[derive(Debug, Default)]
pub struct InFlight {
    claimed: Mutex<Option<Instant>>,
}

impl InFlight {
    /// Atomically claim the flag; `false` when another transfer owns it.
    pub fn try_claim(&self, lease: Option<Duration>) -> bool {
        let mut claimed = self.claimed.lock().unwrap();
        match *claimed {
            Some(at) if lease.is_none_or(|l| at.elapsed() < l) => false,
            Some(at) => {
                warn!(held_secs = at.elapsed().as_secs(), "in-flight lease expired; reclaiming");
                *claimed = Some(Instant::now());
                true
            }
            None => {
                *claimed = Some(Instant::now());
                true
            }
        }
    }

    pub fn release(&self) {
        *self.claimed.lock().unwrap() = None;
    }

    pub fn is_set(&self) -> bool {
        self.claimed.lock().unwrap().is_some()
    }
}

/// The two per-class flags; shared with the delivery tracker.
#[derive(Debug, Default)]
pub struct InFlightFlags {
    pub video: InFlight,
    pub log: InFlight,
}

impl InFlightFlags {
    pub fn get(&self, class: UploadClass) -> &InFlight {
        match class {
            UploadClass::Video => &self.video,
            UploadClass::Log => &self.log,
        }
    }
}

/// Where uploads go; rebuilt from configuration on every update.
#[derive(Clone)]
pub struct UploadTarget {
    pub device_id: String,
    pub container: String,
    /// `None` while storage credentials are missing; upload ticks are then no-ops.
    pub store: Option<Arc<dyn ObjectStore>>,
    pub video_lease: Option<Duration>,
}

impl std::fmt::Debug for UploadTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadTarget")
            .field("device_id", &self.device_id)
            .field("container", &self.container)
            .field("configured", &self.store.is_some())
            .field("video_lease", &self.video_lease)
            .finish()
    }
}

impl Default for UploadTarget {
    fn default() -> Self {
        Self {
            device_id: String::new(),
            container: String::new(),
            store: None,
            video_lease: None,
        }
    }
}

/// Result of one upload tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// A transfer of this class is already in flight.
    Busy,
    /// No object store configured.
    NotConfigured,
    /// Nothing to upload.
    Idle,
    /// The transfer failed; files are kept for the next tick.
    Failed,
    Uploaded {
        key: String,
        /// A companion message was dispatched; cleanup waits for its acknowledgment.
        awaiting_delivery: bool,
    },
}

struct Transferred {
    key: String,
    deferred: bool,
}

/// Drives oldest-first, single-flight uploads for each class.
pub struct UploadCoordinator {
    data_dir: PathBuf,
    flags: Arc<InFlightFlags>,
    target: RwLock<UploadTarget>,
    channel: Arc<dyn MessageChannel>,
    retain_newest_logs: usize,
}

impl UploadCoordinator {
    pub fn new(data_dir: impl Into<PathBuf>, channel: Arc<dyn MessageChannel>) -> Self {
        Self {
            data_dir: data_dir.into(),
            flags: Arc::new(InFlightFlags::default()),
            target: RwLock::new(UploadTarget::default()),
            channel,
            retain_newest_logs: 0,
        }
    }

    /// Never upload the `n` newest log files (the one still being written).
    pub fn retain_newest_logs(mut self, n: usize) -> Self {
        self.retain_newest_logs = n;
        self
    }

    pub fn configure(&self, target: UploadTarget) {
        debug!(?target, "upload target configured");
        *self.target.write().unwrap() = target;
    }

    pub fn is_configured(&self) -> bool {
        self.target.read().unwrap().store.is_some()
    }

    pub fn flags(&self) -> &Arc<InFlightFlags> {
        &self.flags
    }

    pub fn dir(&self, class: UploadClass) -> PathBuf {
        self.data_dir.join(class.folder())
    }

    /// One upload tick for `class`.
    #[instrument(skip_all, fields(class = %class))]
    pub async fn upload(&self, class: UploadClass) -> UploadOutcome {
        let target = self.target.read().unwrap().clone();
        let flag = self.flags.get(class);

        let Some(store) = target.store.clone() else {
            error!("uploads disabled: object store is not configured");
            return UploadOutcome::NotConfigured;
        };
        let lease = match class {
            UploadClass::Video => target.video_lease,
            UploadClass::Log => None,
        };
        if !flag.try_claim(lease) {
            debug!("upload already in flight");
            return UploadOutcome::Busy;
        }

        match self.transfer(class, &target, store.as_ref()).await {
            Ok(Some(Transferred { key, deferred })) => {
                if !deferred {
                    flag.release();
                }
                UploadOutcome::Uploaded {
                    key,
                    awaiting_delivery: deferred,
                }
            }
            Ok(None) => {
                flag.release();
                UploadOutcome::Idle
            }
            Err(e) => {
                error!(error = %e, "upload failed; files kept for retry");
                flag.release();
                UploadOutcome::Failed
            }
        }
    }

    async fn transfer(
        &self,
        class: UploadClass,
        target: &UploadTarget,
        store: &dyn ObjectStore,
    ) -> Result<Option<Transferred>, UploadError> {
        let dir = self.dir(class);

        let mut candidates = list_sorted(&dir, class.extension())
            .await
            .map_err(|source| UploadError::List {
                dir: dir.clone(),
                source,
            })?;
        if class == UploadClass::Log {
            let keep = self.retain_newest_logs.min(candidates.len());
            candidates.truncate(candidates.len() - keep);
        }
        let Some(path) = candidates.into_iter().next() else {
            return Ok(None);
        };

        let ctx = self.context(class, target, path).await?;
        info!(
            path = %ctx.source_path.display(),
            key = %ctx.destination_key,
            bytes = ctx.byte_size,
            "uploading {} file",
            ctx.file_kind.as_str()
        );

        store
            .put(PutRequest {
                container: target.container.clone(),
                key: ctx.destination_key.clone(),
                local_path: ctx.source_path.clone(),
                content_type: ctx.content_type.clone(),
                metadata: BTreeMap::new(),
            })
            .await?;

        let elapsed = ctx.started_at.elapsed();
        info!(
            path = %ctx.source_path.display(),
            bytes = ctx.byte_size,
            secs = elapsed.as_secs_f64(),
            bytes_per_sec = ctx.throughput(elapsed),
            "upload succeeded"
        );

        let deferred = self.settle(&ctx).await;
        Ok(Some(Transferred {
            key: ctx.destination_key,
            deferred,
        }))
    }

    async fn context(
        &self,
        class: UploadClass,
        target: &UploadTarget,
        path: PathBuf,
    ) -> Result<TransferContext, UploadError> {
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|source| UploadError::Stat {
                path: path.clone(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let companion_path = if class.has_companion() {
            let sidecar = sidecar_path(&path);
            tokio::fs::try_exists(&sidecar)
                .await
                .unwrap_or(false)
                .then_some(sidecar)
        } else {
            None
        };

        Ok(TransferContext {
            started_at: std::time::Instant::now(),
            file_kind: class.file_kind(),
            destination_key: format!("{}/{}/{}", target.device_id, class.folder(), file_name),
            content_type: class.content_type().to_string(),
            byte_size: meta.len(),
            source_path: path,
            companion_path,
        })
    }

    /// Post-upload cleanup. Returns `true` when cleanup is deferred to a delivery.
    async fn settle(&self, ctx: &TransferContext) -> bool {
        if let Some(sidecar) = &ctx.companion_path {
            match read_companion(sidecar).await {
                Ok(companion) => {
                    let token = CorrelationToken::for_companion(
                        ctx.source_path.clone(),
                        sidecar.clone(),
                        ctx.file_kind == FileKind::Video,
                    );
                    let message = OutboundMessage::new(
                        Uuid::new_v4().to_string(),
                        companion.payload_bytes(),
                        companion.properties,
                    );
                    info!(
                        sidecar = %sidecar.display(),
                        message_id = %message.message_id,
                        %token,
                        "sending companion message"
                    );
                    let deferred = token.clear_video_uploading;
                    self.channel.send(message, token);
                    return deferred;
                }
                Err(e) => {
                    warn!(error = %e, "companion message unusable; removing artifact only");
                }
            }
        }

        remove_artifact(&ctx.source_path).await;
        false
    }
}

async fn read_companion(path: &Path) -> Result<CompanionMessage, UploadError> {
    let companion_err = |reason: String| UploadError::Companion {
        path: path.to_path_buf(),
        reason,
    };
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| companion_err(e.to_string()))?;
    CompanionMessage::parse(&bytes).map_err(|e| companion_err(e.to_string()))
}

async fn remove_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed uploaded file"),
        Err(e) => error!(path = %path.display(), error = %e, "failed to remove uploaded file"),
    }
}
