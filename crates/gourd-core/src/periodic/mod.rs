//! Independently timed repeating tasks.
//!
//! A [`PeriodicTask`] owns one tokio task that fires a [`TaskCallback`] first
//! after `start_interval`, then every `period`. Firings of one task never
//! overlap; a firing that overruns its period is followed immediately by the
//! next one, without a catch-up burst.

mod error;
pub use error::TaskError;

mod task;
pub use task::{PeriodicTask, TaskCallback, TaskFuture, callback};
