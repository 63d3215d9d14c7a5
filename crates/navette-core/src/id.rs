//! Record identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The unique, immutable identifier of a record within its store.
///
/// Identifiers are opaque strings so that seed data and foreign backends can
/// bring their own. Identifiers minted by [`RecordId::generate`] are UUIDv7
/// strings, whose lexical order follows creation order; the comparators use
/// that order as their final tie-break.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
  /// Mint a fresh, time-ordered identifier.
  pub fn generate() -> Self { Self(Uuid::now_v7().to_string()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<String> for RecordId {
  fn from(value: String) -> Self { Self(value) }
}

impl From<&str> for RecordId {
  fn from(value: &str) -> Self { Self(value.to_owned()) }
}

impl AsRef<str> for RecordId {
  fn as_ref(&self) -> &str { &self.0 }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn generated_ids_are_unique_and_creation_ordered() {
    let ids: Vec<RecordId> = (0..64).map(|_| RecordId::generate()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), ids.len(), "duplicate identifiers generated");
    assert_eq!(sorted, ids, "lexical order should follow creation order");
  }

  #[test]
  fn serializes_as_plain_string() {
    let id = RecordId::from("abs-001");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"abs-001\"");
  }
}
