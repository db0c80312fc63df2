use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::{ScheduleParams, TaskId, TaskKind};

/// Public view of a running periodic task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub id: TaskId,
    pub kind: TaskKind,
    pub start_interval_secs: f64,
    pub period_secs: f64,
    pub started_at: SystemTime,
}

impl TaskInfo {
    pub fn new(id: TaskId, kind: TaskKind, params: ScheduleParams, started_at: SystemTime) -> Self {
        Self {
            id,
            kind,
            start_interval_secs: params.start_interval.as_secs_f64(),
            period_secs: params.period.as_secs_f64(),
            started_at,
        }
    }
}
