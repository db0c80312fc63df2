//! Domain types shared by the gourd agent crates.
//!
//! Nothing here performs I/O: these are the values that flow between the
//! config store, the task registry and the upload pipeline.

mod error;
pub use error::ModelError;

mod domain;
pub use domain::*;

mod kind;
pub use kind::*;
