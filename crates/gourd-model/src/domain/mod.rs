mod schedule;
pub use schedule::ScheduleParams;

mod transfer;
pub use transfer::TransferContext;

mod token;
pub use token::CorrelationToken;

mod message;
pub use message::{CompanionMessage, Delivery, DeliveryOutcome, OutboundMessage};

mod update;
pub use update::UpdateKind;

mod task_info;
pub use task_info::TaskInfo;

/// Identifier of a running periodic task instance.
///
/// A fresh id is minted every time a task is (re)started, so an unchanged id across a reconciliation pass means the instance was left untouched.
pub type TaskId = String;

/// String properties attached to an outbound message.
pub type Properties = std::collections::BTreeMap<String, String>;
