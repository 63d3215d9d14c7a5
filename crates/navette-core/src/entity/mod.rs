//! The `Entity` trait and the four record kinds that implement it.
//!
//! An entity describes everything the generic engine needs to know about one
//! record kind: how to identify it, how to compile its filter spec, which
//! comparator each sort key selects, how its records are counted, and how
//! drafts and patches become records.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
  Error, Result,
  filter::{DateRange, Predicate},
  id::RecordId,
  query::Dimension,
  sort::Comparator,
};

pub mod absence;
pub mod document;
pub mod notification;
pub mod trip;

pub use absence::Absence;
pub use document::Document;
pub use notification::Notification;
pub use trip::Trip;

// ─── Traits ──────────────────────────────────────────────────────────────────

/// A filter spec: a struct of optional criteria, empty by default.
pub trait FilterSpec:
  Clone + Default + fmt::Debug + PartialEq + Send + Sync + 'static
{
  fn search_query(&self) -> Option<&str>;

  fn set_search(&mut self, query: Option<String>);

  /// Set the range applied to the entity's primary date field.
  fn set_dates(&mut self, range: DateRange);
}

/// Where a newly added record is inserted into the settled record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
  /// Newest first.
  Prepend,
  Append,
}

impl Placement {
  /// Insert `record` into `records` at this end.
  pub fn place<T>(self, records: &mut Vec<T>, record: T) {
    match self {
      Self::Prepend => records.insert(0, record),
      Self::Append => records.push(record),
    }
  }
}

/// One record kind managed by a store.
pub trait Entity:
  Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
  /// Optional criteria narrowing the view.
  type Filter: FilterSpec;
  /// Sort-key identifier; `Default` selects the entity's default order.
  type Sort: Copy
    + Default
    + fmt::Debug
    + fmt::Display
    + PartialEq
    + FromStr
    + Send
    + Sync
    + 'static;
  /// Input to `add`.
  type Draft: fmt::Debug + Send + 'static;
  /// Input to `update`; every field is optional.
  type Patch: fmt::Debug + Send + 'static;

  /// Human-readable entity name, used in errors and logs.
  const KIND: &'static str;
  const PLACEMENT: Placement;

  fn id(&self) -> &RecordId;

  /// Compile a filter spec into a predicate.
  fn compile(filter: &Self::Filter) -> Predicate<Self>;

  /// The comparator registered for `sort`.
  fn comparator(sort: Self::Sort) -> Comparator<Self>;

  /// The axes along which records of this kind are counted.
  fn dimensions() -> Vec<Dimension<Self>>;

  /// Build a record from a draft, applying defaults and validating required
  /// fields.
  fn create(id: RecordId, draft: Self::Draft, now: DateTime<Utc>) -> Result<Self>;

  /// Merge `patch` into this record and refresh its last-modified timestamp,
  /// if it has one. On error the record is left untouched.
  fn apply(&mut self, patch: Self::Patch, now: DateTime<Utc>) -> Result<()>;

  /// Resolve a sort-key identifier such as `"name-asc"`.
  fn parse_sort(key: &str) -> Result<Self::Sort> {
    key.parse().map_err(|_| Error::UnknownSortKey {
      entity: Self::KIND,
      key:    key.to_owned(),
    })
  }
}

// ─── Validation helpers ──────────────────────────────────────────────────────

/// Fail unless `value` holds something other than whitespace.
pub(crate) fn require_text(entity: &'static str, field: &str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::validation(entity, format!("{field} is required")));
  }
  Ok(())
}

/// Fail unless `end` is not before `start` (or strictly after, if `strict`).
pub(crate) fn require_order(
  entity: &'static str,
  start: DateTime<Utc>,
  end: DateTime<Utc>,
  strict: bool,
  message: &str,
) -> Result<()> {
  let ok = if strict { end > start } else { end >= start };
  if !ok {
    return Err(Error::validation(entity, message));
  }
  Ok(())
}

/// Overwrite `slot` with the patched value, if one was given.
pub(crate) fn merge<T>(slot: &mut T, patch: Option<T>) {
  if let Some(value) = patch {
    *slot = value;
  }
}
