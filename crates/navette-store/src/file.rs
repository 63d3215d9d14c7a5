//! [`JsonFileBackend`]: records kept as a JSON array in a single file.
//!
//! Each write rewrites the whole file through a sibling temporary file and a
//! rename. Writes are serialised by an async lock; nothing guards against
//! other processes touching the file.
//!
//! Writes are not cancel-safe: once the rename has been handed to the
//! blocking pool it completes even if the calling future is dropped, for
//! instance by a store timeout.

use std::path::{Path, PathBuf};

use navette_core::{Entity, RecordId, persistence::Persistence};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum FileError {
  #[error("io error on {path}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("json error in {path}: {source}")]
  Json {
    path:   PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("no stored record with id {0}")]
  Missing(RecordId),

  #[error("a record with id {0} is already stored")]
  Conflict(RecordId),
}

pub struct JsonFileBackend {
  path:  PathBuf,
  write: Mutex<()>,
}

impl JsonFileBackend {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into(), write: Mutex::new(()) }
  }

  pub fn path(&self) -> &Path { &self.path }

  /// Read every record; a missing file reads as an empty list.
  async fn load<E: Entity>(&self) -> Result<Vec<E>, FileError> {
    let raw = match tokio::fs::read(&self.path).await {
      Ok(raw) => raw,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
      Err(source) => return Err(self.io(source)),
    };
    serde_json::from_slice(&raw).map_err(|source| FileError::Json {
      path: self.path.clone(),
      source,
    })
  }

  async fn store<E: Entity>(&self, records: &[E]) -> Result<(), FileError> {
    let json = serde_json::to_vec_pretty(records).map_err(|source| FileError::Json {
      path: self.path.clone(),
      source,
    })?;
    let tmp = self.path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await.map_err(|e| self.io(e))?;
    tokio::fs::rename(&tmp, &self.path).await.map_err(|e| self.io(e))
  }

  /// Load, edit and store the record list under the write lock.
  async fn modify<E, T>(
    &self,
    edit: impl FnOnce(&mut Vec<E>) -> Result<T, FileError> + Send,
  ) -> Result<T, FileError>
  where
    E: Entity,
  {
    let _guard = self.write.lock().await;
    let mut records = self.load().await?;
    let output = edit(&mut records)?;
    self.store(&records).await?;
    Ok(output)
  }

  fn io(&self, source: std::io::Error) -> FileError {
    FileError::Io { path: self.path.clone(), source }
  }
}

impl<E: Entity> Persistence<E> for JsonFileBackend {
  type Error = FileError;

  async fn fetch(&self) -> Result<Vec<E>, FileError> { self.load().await }

  async fn insert(&self, record: E) -> Result<E, FileError> {
    self
      .modify(move |records: &mut Vec<E>| {
        if records.iter().any(|r| r.id() == record.id()) {
          return Err(FileError::Conflict(record.id().clone()));
        }
        E::PLACEMENT.place(records, record.clone());
        Ok(record)
      })
      .await
  }

  async fn replace(&self, record: E) -> Result<E, FileError> {
    self
      .modify(move |records: &mut Vec<E>| {
        let slot = records
          .iter_mut()
          .find(|r| r.id() == record.id())
          .ok_or_else(|| FileError::Missing(record.id().clone()))?;
        *slot = record.clone();
        Ok(record)
      })
      .await
  }

  async fn remove(&self, id: &RecordId) -> Result<bool, FileError> {
    self
      .modify(|records: &mut Vec<E>| {
        let before = records.len();
        records.retain(|r| r.id() != id);
        Ok(records.len() != before)
      })
      .await
  }
}
