use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// How a remote configuration payload is applied.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateKind {
    /// Replace the whole remote document (`desired` and `reported` sections).
    Complete,
    /// Merge the payload into the desired section.
    Partial,
}

impl FromStr for UpdateKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "complete" => Ok(UpdateKind::Complete),
            "partial" => Ok(UpdateKind::Partial),
            _ => Err(ModelError::UnknownUpdateKind(s.to_string())),
        }
    }
}
