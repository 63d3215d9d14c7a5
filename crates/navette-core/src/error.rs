//! Error types for `navette-core`.

use thiserror::Error;

use crate::id::RecordId;

/// Coarse classification of a failure, used by callers that branch on the
/// kind of error rather than its exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// The target identifier is not present in the store.
  NotFound,
  /// Caller-supplied data failed a required-field check.
  Validation,
  /// A backing operation failed; retrying may succeed.
  Transient,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: RecordId },

  #[error("invalid {entity}: {message}")]
  Validation { entity: &'static str, message: String },

  #[error("unknown sort key for {entity}: {key:?}")]
  UnknownSortKey { entity: &'static str, key: String },

  #[error("duplicate {entity} identifier: {id}")]
  DuplicateId { entity: &'static str, id: RecordId },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Build a validation error for `entity`.
  pub fn validation(entity: &'static str, message: impl Into<String>) -> Self {
    Self::Validation { entity, message: message.into() }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::NotFound { .. } => ErrorKind::NotFound,
      Self::Validation { .. }
      | Self::UnknownSortKey { .. }
      | Self::DuplicateId { .. } => ErrorKind::Validation,
      Self::Serialization(_) => ErrorKind::Transient,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
