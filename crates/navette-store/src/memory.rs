//! [`MemoryBackend`]: the in-memory mock implementation of [`Persistence`].
//!
//! Every call sleeps for a fixed simulated latency before touching the rows,
//! standing in for a network round trip. Faults can be injected to exercise
//! the gateway's failure path.

use std::{
  sync::{Mutex, MutexGuard, PoisonError},
  time::Duration,
};

use navette_core::{Entity, RecordId, persistence::Persistence};
use thiserror::Error;

use crate::StoreConfig;

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("simulated failure: {0}")]
  Injected(String),

  #[error("no stored record with id {0}")]
  Missing(RecordId),

  #[error("a record with id {0} is already stored")]
  Conflict(RecordId),
}

#[derive(Debug, Default)]
enum Fault {
  #[default]
  None,
  Next(String),
  Always(String),
}

/// In-memory backend seeded with a fixed record list.
pub struct MemoryBackend<E> {
  seed:    Vec<E>,
  rows:    Mutex<Vec<E>>,
  fault:   Mutex<Fault>,
  latency: Duration,
}

impl<E: Entity> MemoryBackend<E> {
  /// A backend holding `seed`, with no latency.
  pub fn new(seed: Vec<E>) -> Self {
    Self {
      rows: Mutex::new(seed.clone()),
      seed,
      fault: Mutex::new(Fault::None),
      latency: Duration::ZERO,
    }
  }

  pub fn from_config(seed: Vec<E>, config: &StoreConfig) -> Self {
    Self::new(seed).with_latency(config.latency())
  }

  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = latency;
    self
  }

  /// Fail the next call with `message`, then recover.
  pub fn fail_next(&self, message: impl Into<String>) {
    *lock(&self.fault) = Fault::Next(message.into());
  }

  /// Fail every call with `message` until [`Self::recover`].
  pub fn fail_always(&self, message: impl Into<String>) {
    *lock(&self.fault) = Fault::Always(message.into());
  }

  pub fn recover(&self) { *lock(&self.fault) = Fault::None; }

  /// Restore the rows to the seed list.
  pub fn reset(&self) { *lock(&self.rows) = self.seed.clone(); }

  /// A copy of the currently stored rows.
  pub fn rows(&self) -> Vec<E> { lock(&self.rows).clone() }

  async fn round_trip(&self) -> Result<(), MemoryError> {
    if !self.latency.is_zero() {
      tokio::time::sleep(self.latency).await;
    }
    let mut fault = lock(&self.fault);
    match std::mem::take(&mut *fault) {
      Fault::None => Ok(()),
      Fault::Next(message) => Err(MemoryError::Injected(message)),
      Fault::Always(message) => {
        *fault = Fault::Always(message.clone());
        Err(MemoryError::Injected(message))
      }
    }
  }
}

impl<E: Entity> Persistence<E> for MemoryBackend<E> {
  type Error = MemoryError;

  async fn fetch(&self) -> Result<Vec<E>, MemoryError> {
    self.round_trip().await?;
    Ok(self.rows())
  }

  async fn insert(&self, record: E) -> Result<E, MemoryError> {
    self.round_trip().await?;
    let mut rows = lock(&self.rows);
    if rows.iter().any(|r| r.id() == record.id()) {
      return Err(MemoryError::Conflict(record.id().clone()));
    }
    E::PLACEMENT.place(&mut *rows, record.clone());
    Ok(record)
  }

  async fn replace(&self, record: E) -> Result<E, MemoryError> {
    self.round_trip().await?;
    let mut rows = lock(&self.rows);
    let slot = rows
      .iter_mut()
      .find(|r| r.id() == record.id())
      .ok_or_else(|| MemoryError::Missing(record.id().clone()))?;
    *slot = record.clone();
    Ok(record)
  }

  async fn remove(&self, id: &RecordId) -> Result<bool, MemoryError> {
    self.round_trip().await?;
    let mut rows = lock(&self.rows);
    let before = rows.len();
    rows.retain(|r| r.id() != id);
    Ok(rows.len() != before)
  }
}

/// The rows hold no invariants a panicking writer could break, so a poisoned
/// lock is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
