mod task;
pub use task::TaskKind;

mod upload;
pub use upload::{FileKind, UploadClass};
