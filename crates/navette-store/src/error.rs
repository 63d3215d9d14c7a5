//! Error type for `navette-store`.

use std::time::Duration;

use navette_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] navette_core::Error),

  /// The backend rejected or failed the call.
  #[error("backend failure: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("backend call timed out after {0:?}")]
  Timeout(Duration),
}

impl Error {
  pub(crate) fn backend(error: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Backend(Box::new(error))
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      Self::Backend(_) | Self::Timeout(_) => ErrorKind::Transient,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
