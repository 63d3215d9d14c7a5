//! The backend a command runs against: the data file itself, or an in-memory
//! copy of it when `--dry-run` is given.

use std::path::Path;

use navette_core::{Entity, RecordId, persistence::Persistence};
use navette_store::{
  JsonFileBackend, MemoryBackend, StoreConfig, file::FileError, memory::MemoryError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
  #[error(transparent)]
  File(#[from] FileError),

  #[error(transparent)]
  Memory(#[from] MemoryError),
}

pub enum Backend<E> {
  File(JsonFileBackend),
  /// Seeded from the data file; changes are discarded on exit.
  Memory(MemoryBackend<E>),
}

impl<E: Entity> Backend<E> {
  pub async fn open(
    path: &Path,
    dry_run: bool,
    config: &StoreConfig,
  ) -> Result<Self, BackendError> {
    let file = JsonFileBackend::new(path);
    if !dry_run {
      return Ok(Self::File(file));
    }
    let seed: Vec<E> = Persistence::<E>::fetch(&file).await?;
    tracing::debug!(records = seed.len(), "seeded in-memory backend");
    Ok(Self::Memory(MemoryBackend::from_config(seed, config)))
  }
}

impl<E: Entity> Persistence<E> for Backend<E> {
  type Error = BackendError;

  async fn fetch(&self) -> Result<Vec<E>, BackendError> {
    Ok(match self {
      Self::File(b) => Persistence::<E>::fetch(b).await?,
      Self::Memory(b) => b.fetch().await?,
    })
  }

  async fn insert(&self, record: E) -> Result<E, BackendError> {
    Ok(match self {
      Self::File(b) => b.insert(record).await?,
      Self::Memory(b) => b.insert(record).await?,
    })
  }

  async fn replace(&self, record: E) -> Result<E, BackendError> {
    Ok(match self {
      Self::File(b) => b.replace(record).await?,
      Self::Memory(b) => b.replace(record).await?,
    })
  }

  async fn remove(&self, id: &RecordId) -> Result<bool, BackendError> {
    Ok(match self {
      Self::File(b) => Persistence::<E>::remove(b, id).await?,
      Self::Memory(b) => b.remove(id).await?,
    })
  }
}
