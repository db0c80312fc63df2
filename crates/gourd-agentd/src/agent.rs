use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use gourd_core::{
    AgentSettings, ConfigStore, CoreError, ReconcileReport, RestartAction, StorageSettings,
    TaskRegistry, Watchdog, callback, resolve_device_id,
};
use gourd_model::{Delivery, TaskInfo, TaskKind, UpdateKind, UploadClass};
use gourd_observe::LoggerHandle;
use gourd_upload::{
    CodecTool, DeliveryTracker, MessageChannel, ObjectStore, UploadCoordinator, UploadTarget,
};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    capture::{Capture, CaptureCommands},
    restart::{DeviceRestart, REBOOT_REASON_KEY, REBOOT_TIME_KEY},
};

/// Builds an object store from the storage settings of the current configuration.
pub type StoreFactory =
    Arc<dyn Fn(&StorageSettings) -> Option<Arc<dyn ObjectStore>> + Send + Sync>;

/// Everything [`EdgeAgent::new`] wires together.
pub struct AgentParts {
    pub data_dir: PathBuf,
    pub config: ConfigStore,
    pub channel: Arc<dyn MessageChannel>,
    pub deliveries: UnboundedReceiver<Delivery>,
    pub stores: StoreFactory,
    pub codec: Option<CodecTool>,
    pub captures: CaptureCommands,
    pub restart_cmd: String,
    pub logger: Option<Arc<LoggerHandle>>,
}

/// Owner of all agent state.
///
/// Periodic callbacks capture `Arc`s of the parts they drive, never the agent
/// itself; only the restart action holds a weak reference back.
pub struct EdgeAgent {
    data_dir: PathBuf,
    config: Arc<ConfigStore>,
    /// Settings as read at process start.
    boot: AgentSettings,
    registry: Mutex<TaskRegistry>,
    coordinator: Arc<UploadCoordinator>,
    watchdog: Arc<Watchdog>,
    tracker: Arc<DeliveryTracker>,
    restart: Arc<DeviceRestart>,
    channel: Arc<dyn MessageChannel>,
    stores: StoreFactory,
    captures: CaptureCommands,
    codec: Option<Arc<CodecTool>>,
    logger: Option<Arc<LoggerHandle>>,
    deliveries: Mutex<Option<UnboundedReceiver<Delivery>>>,
    cancel: CancellationToken,
}

impl EdgeAgent {
    pub fn new(parts: AgentParts) -> Arc<Self> {
        let AgentParts {
            data_dir,
            config,
            channel,
            deliveries,
            stores,
            codec,
            captures,
            restart_cmd,
            logger,
        } = parts;

        Arc::new_cyclic(|agent| {
            let settings = AgentSettings::from_document(&config.snapshot());
            let restart = Arc::new(DeviceRestart::new(agent.clone(), restart_cmd));
            let watchdog = Arc::new(Watchdog::new(
                settings.watchdog_min_reboot,
                restart.clone(),
            ));

            let mut coordinator = UploadCoordinator::new(&data_dir, channel.clone());
            if logger.as_ref().is_some_and(|l| l.log_dir().is_some()) {
                coordinator = coordinator.retain_newest_logs(1);
            }
            let coordinator = Arc::new(coordinator);
            let tracker = Arc::new(DeliveryTracker::new(
                coordinator.flags().clone(),
                watchdog.clone(),
            ));

            Self {
                data_dir,
                config: Arc::new(config),
                boot: settings,
                registry: Mutex::new(TaskRegistry::new()),
                coordinator,
                watchdog,
                tracker,
                restart,
                channel,
                stores,
                captures,
                codec: codec.map(Arc::new),
                logger,
                deliveries: Mutex::new(Some(deliveries)),
                cancel: CancellationToken::new(),
            }
        })
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn channel(&self) -> &Arc<dyn MessageChannel> {
        &self.channel
    }

    pub fn coordinator(&self) -> &Arc<UploadCoordinator> {
        &self.coordinator
    }

    pub fn watchdog(&self) -> &Arc<Watchdog> {
        &self.watchdog
    }

    pub fn tasks(&self) -> Vec<TaskInfo> {
        self.registry.lock().unwrap().snapshot()
    }

    /// Register callbacks, enable the schedulers and start the delivery tracker.
    pub fn start(&self) -> ReconcileReport {
        {
            let mut registry = self.registry.lock().unwrap();
            for kind in [TaskKind::Sensor, TaskKind::Image, TaskKind::Video] {
                let mut capture = Capture::new(
                    kind,
                    self.captures.get(kind).map(str::to_string),
                    &self.data_dir,
                    self.config.clone(),
                    self.channel.clone(),
                );
                if kind == TaskKind::Video
                    && let Some(codec) = &self.codec
                {
                    capture = capture.with_codec(codec.clone());
                }
                let capture = Arc::new(capture);
                registry.register(
                    kind,
                    callback(move || {
                        let capture = capture.clone();
                        async move { capture.fire().await }
                    }),
                );
            }
            for (kind, class) in [
                (TaskKind::VideoUpload, UploadClass::Video),
                (TaskKind::LogUpload, UploadClass::Log),
            ] {
                let coordinator = self.coordinator.clone();
                registry.register(
                    kind,
                    callback(move || {
                        let coordinator = coordinator.clone();
                        async move {
                            coordinator.upload(class).await;
                            Ok(())
                        }
                    }),
                );
            }
            let watchdog = self.watchdog.clone();
            registry.register(
                TaskKind::Watchdog,
                callback(move || {
                    let watchdog = watchdog.clone();
                    async move {
                        watchdog.tick().await;
                        Ok(())
                    }
                }),
            );
            registry.set_enabled(true);
        }

        if let Some(rx) = self.deliveries.lock().unwrap().take() {
            tokio::spawn(self.tracker.clone().run(rx, self.cancel.child_token()));
        }

        let report = self.reconcile();
        info!(tasks = self.tasks().len(), "agent started");
        report
    }

    /// Apply a remote configuration update, then reconcile.
    ///
    /// A persist failure is logged; the update stays live in memory.
    pub fn apply_update(
        &self,
        kind: UpdateKind,
        payload: Value,
    ) -> Result<ReconcileReport, CoreError> {
        if self.cancel.is_cancelled() {
            return Err(CoreError::ShuttingDown);
        }
        info!(?kind, "configuration update received");
        match self.config.apply_update(kind, payload) {
            Ok(_) => {}
            Err(e) if e.is_persist() => {
                error!(error = %e, "configuration applied but not saved");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(self.reconcile())
    }

    /// Push the current configuration into every component and the registry.
    pub fn reconcile(&self) -> ReconcileReport {
        let doc = self.config.snapshot();
        self.apply_settings(&AgentSettings::from_document(&doc));
        self.registry.lock().unwrap().reconcile(&doc)
    }

    fn apply_settings(&self, settings: &AgentSettings) {
        for key in settings.restart_required_since(&self.boot) {
            warn!(key, "setting changed; it takes effect after the agent restarts");
        }
        if let Some(logger) = &self.logger
            && let Err(e) = logger.set_level(settings.log_level)
        {
            warn!(error = %e, level = settings.log_level, "failed to apply log level");
        }
        self.watchdog.set_threshold(settings.watchdog_min_reboot);

        let store = if settings.storage.is_configured() {
            (self.stores)(&settings.storage)
        } else {
            error!("storage account name or key missing; uploads disabled");
            None
        };
        self.coordinator.configure(UploadTarget {
            device_id: resolve_device_id(&settings.device_id),
            container: settings.storage.container.clone(),
            store,
            video_lease: settings.video_upload_lease,
        });
    }

    /// Stop the capture kinds; uploads and the watchdog keep running.
    pub(crate) fn stop_capture(&self) -> Vec<TaskKind> {
        self.registry.lock().unwrap().stop_all(false)
    }

    pub async fn restart(&self, reason: &str) {
        self.restart.restart(reason).await;
    }

    /// Report identity and the reason of the previous reboot, if any.
    pub async fn report_startup(&self) {
        let doc = self.config.snapshot();
        let mut reported = BTreeMap::from([
            ("deviceStatus".to_string(), Value::from("running")),
            ("agentVersion".to_string(), Value::from(env!("CARGO_PKG_VERSION"))),
            ("platform".to_string(), Value::from(gourd_core::platform())),
            ("arch".to_string(), Value::from(gourd_core::arch())),
            ("osInfo".to_string(), Value::from(gourd_core::os_info())),
            ("uptimeSeconds".to_string(), Value::from(gourd_core::uptime_seconds())),
        ]);
        for key in [REBOOT_REASON_KEY, REBOOT_TIME_KEY] {
            if let Some(value) = doc.get::<String>(key) {
                reported.insert(key.to_string(), Value::from(value));
            }
        }

        if let Err(e) = self.channel.report(reported).await {
            warn!(error = %e, "failed to report startup properties");
        }
    }

    /// Stop every task and the delivery tracker.
    pub fn stop(&self) {
        self.cancel.cancel();
        let stopped = {
            let mut registry = self.registry.lock().unwrap();
            registry.set_enabled(false);
            registry.stop_all(true)
        };
        info!(?stopped, "agent stopped");
    }
}

impl std::fmt::Debug for EdgeAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeAgent")
            .field("data_dir", &self.data_dir)
            .field("registry", &*self.registry.lock().unwrap())
            .field("watchdog", &self.watchdog)
            .field("stopped", &self.cancel.is_cancelled())
            .finish()
    }
}
