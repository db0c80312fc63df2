use std::{
    future::Future,
    sync::{Arc, Mutex},
    time::{Duration, SystemTime},
};

use futures::{FutureExt, future::BoxFuture};
use gourd_model::{ScheduleParams, TaskId, TaskInfo, TaskKind};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::periodic::TaskError;

/// Floor for the firing period; `tokio::time::interval` rejects zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

pub type TaskFuture = BoxFuture<'static, Result<(), TaskError>>;

/// Zero-argument callback invoked on every firing.
pub type TaskCallback = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// Wrap an async closure into a [`TaskCallback`].
pub fn callback<F, Fut>(f: F) -> TaskCallback
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Handle to one running periodic task.
///
/// Dropping the handle stops the task.
pub struct PeriodicTask {
    id: TaskId,
    kind: TaskKind,
    params: ScheduleParams,
    started_at: SystemTime,
    cancel: CancellationToken,
    /// Held while a firing is being launched; `stop` takes it so no firing starts after it returns.
    gate: Arc<Mutex<()>>,
}

impl PeriodicTask {
    /// Spawn the timer loop on the current tokio runtime.
    pub fn start(kind: TaskKind, params: ScheduleParams, callback: TaskCallback) -> Self {
        let id = Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();
        let gate = Arc::new(Mutex::new(()));

        info!(
            %kind,
            task_id = %id,
            start_interval = params.start_interval.as_secs_f64(),
            period = params.period.as_secs_f64(),
            "starting periodic task"
        );
        tokio::spawn(run(
            kind,
            id.clone(),
            params,
            callback,
            cancel.clone(),
            Arc::clone(&gate),
        ));

        Self {
            id,
            kind,
            params,
            started_at: SystemTime::now(),
            cancel,
            gate,
        }
    }

    /// Cancel future firings.
    ///
    /// Idempotent. Returns once no new firing can begin; a callback that is
    /// already executing is left to finish on its own.
    pub fn stop(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        let _gate = self.gate.lock().unwrap();
        self.cancel.cancel();
        info!(kind = %self.kind, task_id = %self.id, "stopped periodic task");
    }

    #[inline]
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    #[inline]
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    #[inline]
    pub fn params(&self) -> ScheduleParams {
        self.params
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn info(&self) -> TaskInfo {
        TaskInfo::new(self.id.clone(), self.kind, self.params, self.started_at)
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for PeriodicTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicTask")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("params", &self.params)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

async fn run(
    kind: TaskKind,
    id: TaskId,
    params: ScheduleParams,
    callback: TaskCallback,
    cancel: CancellationToken,
    gate: Arc<Mutex<()>>,
) {
    let mut ticker = time::interval_at(
        Instant::now() + params.start_interval,
        params.period.max(MIN_PERIOD),
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let firing = {
            let _gate = gate.lock().unwrap();
            if cancel.is_cancelled() {
                break;
            }
            tokio::spawn(callback())
        };

        match firing.await {
            Ok(Ok(())) => debug!(%kind, task_id = %id, "firing completed"),
            Ok(Err(e)) => warn!(%kind, task_id = %id, error = %e, "firing failed"),
            Err(e) if e.is_panic() => error!(%kind, task_id = %id, "firing panicked"),
            Err(e) => warn!(%kind, task_id = %id, error = %e, "firing aborted"),
        }
    }
    debug!(%kind, task_id = %id, "periodic task loop exited");
}
