//! Owner of every periodic task, reconciled against the configuration.

use std::collections::{BTreeMap, HashMap};

use gourd_model::{ScheduleParams, TaskId, TaskInfo, TaskKind};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    config::{AgentSettings, ConfigDocument},
    periodic::{PeriodicTask, TaskCallback},
};

/// Stop/start actions performed by one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub stopped: Vec<TaskKind>,
    pub started: Vec<TaskKind>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.stopped.is_empty() && self.started.is_empty()
    }
}

/// Running tasks, keyed by kind.
///
/// Starts disabled: until [`TaskRegistry::set_enabled`] flips the master
/// switch, reconciliation only ever stops tasks.
#[derive(Default)]
pub struct TaskRegistry {
    callbacks: HashMap<TaskKind, TaskCallback>,
    tasks: BTreeMap<TaskKind, PeriodicTask>,
    enabled: bool,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the callback a kind fires with. Takes effect for instances started afterwards.
    pub fn register(&mut self, kind: TaskKind, callback: TaskCallback) {
        self.callbacks.insert(kind, callback);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            info!(enabled, "schedulers master switch changed");
        }
        self.enabled = enabled;
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn snapshot(&self) -> Vec<TaskInfo> {
        self.tasks.values().map(PeriodicTask::info).collect()
    }

    pub fn task_id(&self, kind: TaskKind) -> Option<&TaskId> {
        self.tasks.get(&kind).map(PeriodicTask::id)
    }

    pub fn params(&self, kind: TaskKind) -> Option<ScheduleParams> {
        self.tasks.get(&kind).map(PeriodicTask::params)
    }

    /// Bring running tasks in line with `doc`.
    ///
    /// Tasks whose parameters changed are stopped, then every absent kind with
    /// a positive period is started. Unchanged tasks keep their instance.
    pub fn reconcile(&mut self, doc: &ConfigDocument) -> ReconcileReport {
        if !self.enabled {
            let stopped = self.stop_all(false);
            return ReconcileReport {
                stopped,
                started: Vec::new(),
            };
        }

        let settings = AgentSettings::from_document(doc);
        let mut report = ReconcileReport::default();

        for kind in TaskKind::ALL {
            let desired = settings.schedule(kind);
            if !self.tasks.get(&kind).is_some_and(|t| t.params() != desired) {
                continue;
            }
            if let Some(task) = self.tasks.remove(&kind) {
                debug!(%kind, from = ?task.params(), to = ?desired, "schedule changed");
                task.stop();
                report.stopped.push(kind);
            }
        }

        for kind in TaskKind::ALL {
            let desired = settings.schedule(kind);
            if self.tasks.contains_key(&kind) || !desired.is_enabled() {
                continue;
            }
            let Some(callback) = self.callbacks.get(&kind) else {
                warn!(%kind, "no callback registered; task not started");
                continue;
            };
            self.tasks
                .insert(kind, PeriodicTask::start(kind, desired, callback.clone()));
            report.started.push(kind);
        }

        if !report.is_noop() {
            info!(stopped = ?report.stopped, started = ?report.started, "reconciled periodic tasks");
        }
        report
    }

    /// Stop managed tasks. Always-on kinds (watchdog, uploads) survive unless
    /// `include_always_on` is set.
    pub fn stop_all(&mut self, include_always_on: bool) -> Vec<TaskKind> {
        let doomed: Vec<TaskKind> = self
            .tasks
            .keys()
            .copied()
            .filter(|k| include_always_on || !k.is_always_on())
            .collect();

        for kind in &doomed {
            if let Some(task) = self.tasks.remove(kind) {
                task.stop();
            }
        }
        doomed
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("enabled", &self.enabled)
            .field("tasks", &self.tasks)
            .field("callbacks", &self.callbacks.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periodic::callback;
    use serde_json::json;
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    fn registry() -> TaskRegistry {
        let mut reg = TaskRegistry::new();
        for kind in TaskKind::ALL {
            reg.register(kind, callback(|| async { Ok(()) }));
        }
        reg.set_enabled(true);
        reg
    }

    fn doc(desired: serde_json::Value) -> ConfigDocument {
        ConfigDocument::from_value(json!({"Twin": {"desired": desired}})).unwrap()
    }

    fn running(reg: &TaskRegistry) -> Vec<TaskKind> {
        reg.snapshot().into_iter().map(|t| t.kind).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn defaults_start_sensor_uploads_and_watchdog() {
        let mut reg = registry();
        let report = reg.reconcile(&ConfigDocument::new());

        assert!(report.stopped.is_empty());
        assert_eq!(
            running(&reg),
            vec![
                TaskKind::Sensor,
                TaskKind::VideoUpload,
                TaskKind::LogUpload,
                TaskKind::Watchdog
            ]
        );
        assert!(reg.task_id(TaskKind::Video).is_none());
        assert!(reg.task_id(TaskKind::Image).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_video_frequency_creates_no_video_task() {
        let mut reg = registry();
        reg.reconcile(&doc(json!({"VideoCaptureFrequency": 0})));
        assert!(reg.task_id(TaskKind::Video).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_is_idempotent() {
        let mut reg = registry();
        let cfg = doc(json!({"ImageCaptureFrequency": 30}));
        reg.reconcile(&cfg);
        let ids: Vec<_> = reg.snapshot().into_iter().map(|t| t.id).collect();

        let second = reg.reconcile(&cfg);
        assert!(second.is_noop());
        let again: Vec<_> = reg.snapshot().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, again);
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_touches_only_changed_kind() {
        let mut reg = registry();
        reg.reconcile(&doc(json!({"SensorCaptureFrequency": 60})));
        let before: BTreeMap<_, _> = reg.snapshot().into_iter().map(|t| (t.kind, t.id)).collect();

        let report = reg.reconcile(&doc(json!({"SensorCaptureFrequency": 30})));
        assert_eq!(report.stopped, vec![TaskKind::Sensor]);
        assert_eq!(report.started, vec![TaskKind::Sensor]);

        for info in reg.snapshot() {
            if info.kind == TaskKind::Sensor {
                assert_ne!(before[&info.kind], info.id);
                assert_eq!(info.period_secs, 30.0);
            } else {
                assert_eq!(before[&info.kind], info.id, "{} was restarted", info.kind);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_interval_change_restarts_task() {
        let mut reg = registry();
        reg.reconcile(&doc(json!({"WatchdogFrequency": 15})));
        let id = reg.task_id(TaskKind::Watchdog).cloned();

        let report = reg.reconcile(&doc(json!({"WatchdogFrequency": 15, "WatchdogStartInterval": 60})));
        assert_eq!(report.stopped, vec![TaskKind::Watchdog]);
        assert_ne!(reg.task_id(TaskKind::Watchdog).cloned(), id);
        assert_eq!(
            reg.params(TaskKind::Watchdog),
            Some(ScheduleParams::from_secs(60.0, 15.0))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn disabling_a_kind_stops_it() {
        let mut reg = registry();
        reg.reconcile(&doc(json!({"ImageCaptureFrequency": 10})));
        assert!(reg.task_id(TaskKind::Image).is_some());

        let report = reg.reconcile(&doc(json!({"ImageCaptureFrequency": 0})));
        assert_eq!(report.stopped, vec![TaskKind::Image]);
        assert!(report.started.is_empty());
        assert!(reg.task_id(TaskKind::Image).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_registry_only_stops() {
        let mut reg = registry();
        reg.reconcile(&ConfigDocument::new());

        reg.set_enabled(false);
        let report = reg.reconcile(&doc(json!({"ImageCaptureFrequency": 10})));
        assert_eq!(report.stopped, vec![TaskKind::Sensor]);
        assert!(report.started.is_empty());
        assert_eq!(
            running(&reg),
            vec![TaskKind::VideoUpload, TaskKind::LogUpload, TaskKind::Watchdog]
        );

        reg.set_enabled(true);
        let report = reg.reconcile(&doc(json!({"ImageCaptureFrequency": 10})));
        assert_eq!(report.started, vec![TaskKind::Sensor, TaskKind::Image]);
    }

    #[tokio::test(start_paused = true)]
    async fn never_enabled_registry_starts_nothing() {
        let mut reg = registry();
        reg.set_enabled(false);
        let report = reg.reconcile(&ConfigDocument::new());
        assert!(report.is_noop());
        assert!(reg.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_all_respects_always_on() {
        let mut reg = registry();
        reg.reconcile(&doc(json!({"ImageCaptureFrequency": 10})));

        let stopped = reg.stop_all(false);
        assert_eq!(stopped, vec![TaskKind::Sensor, TaskKind::Image]);
        assert_eq!(
            running(&reg),
            vec![TaskKind::VideoUpload, TaskKind::LogUpload, TaskKind::Watchdog]
        );

        let stopped = reg.stop_all(true);
        assert_eq!(
            stopped,
            vec![TaskKind::VideoUpload, TaskKind::LogUpload, TaskKind::Watchdog]
        );
        assert!(reg.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_kind_does_not_delay_another() {
        let sensor = Arc::new(AtomicUsize::new(0));
        let video = Arc::new(AtomicUsize::new(0));

        let mut reg = TaskRegistry::new();
        let counter = sensor.clone();
        reg.register(
            TaskKind::Sensor,
            callback(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        );
        let counter = video.clone();
        reg.register(
            TaskKind::Video,
            callback(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(1_000)).await;
                    Ok(())
                }
            }),
        );
        reg.set_enabled(true);
        reg.reconcile(&doc(json!({
            "SensorCaptureFrequency": 2,
            "SensorCaptureStartInterval": 1,
            "VideoCaptureFrequency": 1,
            "VideoCaptureStartInterval": 1
        })));

        // Sensor fires at t = 1, 3, 5, 7 and 9 while the first video firing is still running.
        tokio::time::sleep(Duration::from_millis(9_500)).await;
        assert_eq!(sensor.load(Ordering::SeqCst), 5);
        assert_eq!(video.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn kinds_without_callback_are_skipped() {
        let mut reg = TaskRegistry::new();
        reg.register(TaskKind::Watchdog, callback(|| async { Ok(()) }));
        reg.set_enabled(true);

        let report = reg.reconcile(&ConfigDocument::new());
        assert_eq!(report.started, vec![TaskKind::Watchdog]);
    }
}
