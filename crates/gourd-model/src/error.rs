use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("unknown task kind: {0}")]
    UnknownTaskKind(String),
    #[error("unknown update kind: {0} (expected: complete|partial)")]
    UnknownUpdateKind(String),
    #[error("invalid companion sidecar: {0}")]
    InvalidSidecar(String),
    #[error("companion sidecar has no payload")]
    MissingPayload,
}
