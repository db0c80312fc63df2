//! Upload pipeline: object store and message channel seams, the per-class
//! upload coordinator and the delivery tracker that settles acknowledgments.

mod error;
pub use error::{ChannelError, CodecError, StoreError, UploadError};

pub mod store;
pub use store::{HttpObjectStore, ObjectStore, PutRequest};

pub mod channel;
pub use channel::{HttpMessageChannel, MESSAGE_TIMEOUT, MessageChannel};

mod codec;
pub use codec::CodecTool;

mod scan;

mod coordinator;
pub use coordinator::{InFlight, InFlightFlags, UploadCoordinator, UploadOutcome, UploadTarget};

mod tracker;
pub use tracker::DeliveryTracker;

#[cfg(test)]
mod testing;
