//! Error taxonomy of the dispatch engine.
//!
//! Record- and entity-level failures are recovered into these variants and
//! turned into client errors by the HTTP shell; `Store` failures are fatal
//! for the request and never retried.

use crate::entities::EntityKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DispatchError>;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// A batch import was rejected; `invalid` lists every offending id
    /// (`None` when the id itself was missing or malformed). Field errors
    /// and id collisions with stored records both land here.
    #[error("{entity} import rejected: {} invalid record(s)", .invalid.len())]
    Validation {
        entity: EntityKind,
        invalid: Vec<Option<i64>>,
    },

    #[error("courier {id} patch rejected")]
    PatchRejected { id: i64 },

    /// Malformed or incomplete request payload
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Lifecycle violation (double completion, foreign order)
    #[error("{0}")]
    Conflict(String),

    #[error("store failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl DispatchError {
    /// True for failures caused by the caller rather than the system
    pub fn is_client_error(&self) -> bool {
        !matches!(self, DispatchError::Store(_))
    }
}
