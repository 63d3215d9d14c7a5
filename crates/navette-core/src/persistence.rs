//! The `Persistence` trait: the backing store a record store drives.
//!
//! The trait is implemented by backends in `navette-store` (an in-memory mock
//! with simulated latency, and a JSON file). The mutation gateway depends on
//! this abstraction only, so a network or database client can replace either
//! without touching the query engine.

use std::future::Future;

use crate::{entity::Entity, id::RecordId};

/// Abstraction over the source of truth for one entity kind.
///
/// Every method is one round trip to the backing store. Implementations must
/// be all-or-nothing: a call that returns an error has changed nothing.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait Persistence<E: Entity>: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Load every record.
  fn fetch(&self) -> impl Future<Output = Result<Vec<E>, Self::Error>> + Send + '_;

  /// Persist a newly created record and return it as stored.
  fn insert(&self, record: E) -> impl Future<Output = Result<E, Self::Error>> + Send + '_;

  /// Overwrite the stored record with the same identifier.
  fn replace(&self, record: E) -> impl Future<Output = Result<E, Self::Error>> + Send + '_;

  /// Remove the record with identifier `id`. Returns whether a record was
  /// present; removing an absent identifier is not an error.
  fn remove<'a>(
    &'a self,
    id: &'a RecordId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
