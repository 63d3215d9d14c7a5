//! The predicate compiler.
//!
//! A filter spec is a struct of optional criteria. Each entity compiles its
//! spec into a [`Predicate`] by handing the builder methods below a field
//! accessor per criterion. Absent criteria add no clause, so an empty spec
//! compiles to a predicate that matches every record.

use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

type Clause<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;

// ─── Date range ──────────────────────────────────────────────────────────────

/// An inclusive date range. Either bound may be absent.
///
/// A range whose `from` lies after its `to` is not an error; it simply
/// matches nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
  pub from: Option<DateTime<Utc>>,
  pub to:   Option<DateTime<Utc>>,
}

impl DateRange {
  pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
    Self { from, to }
  }

  pub fn is_unbounded(&self) -> bool { self.from.is_none() && self.to.is_none() }

  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at <= to)
  }
}

// ─── Predicate ───────────────────────────────────────────────────────────────

/// A conjunction of clauses over records of type `E`.
pub struct Predicate<E> {
  clauses: Vec<Clause<E>>,
}

impl<E> Default for Predicate<E> {
  fn default() -> Self { Self { clauses: Vec::new() } }
}

impl<E> fmt::Debug for Predicate<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Predicate")
      .field("clauses", &self.clauses.len())
      .finish()
  }
}

impl<E: 'static> Predicate<E> {
  /// A predicate with no clauses; it matches every record.
  pub fn all() -> Self { Self::default() }

  /// Number of active clauses.
  pub fn len(&self) -> usize { self.clauses.len() }

  pub fn is_empty(&self) -> bool { self.clauses.is_empty() }

  /// Add an arbitrary clause.
  pub fn clause(mut self, test: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
    self.clauses.push(Box::new(test));
    self
  }

  /// Case-insensitive substring search over the fields returned by
  /// `fields`. Blank queries add no clause.
  pub fn search<F>(self, query: Option<&str>, fields: F) -> Self
  where
    F: for<'a> Fn(&'a E) -> Vec<&'a str> + Send + Sync + 'static,
  {
    let Some(needle) = normalize_query(query) else {
      return self;
    };
    self.clause(move |record| {
      fields(record)
        .into_iter()
        .any(|field| field.to_lowercase().contains(&needle))
    })
  }

  /// Membership in `set`. An empty set adds no clause.
  pub fn one_of<T, F>(self, set: &BTreeSet<T>, field: F) -> Self
  where
    T: Ord + Clone + Send + Sync + 'static,
    F: Fn(&E) -> T + Send + Sync + 'static,
  {
    if set.is_empty() {
      return self;
    }
    let set = set.clone();
    self.clause(move |record| set.contains(&field(record)))
  }

  /// Inclusive date range over `field`. An unbounded range adds no clause.
  pub fn within<F>(self, range: DateRange, field: F) -> Self
  where
    F: Fn(&E) -> DateTime<Utc> + Send + Sync + 'static,
  {
    if range.is_unbounded() {
      return self;
    }
    self.clause(move |record| range.contains(field(record)))
  }

  /// Equality on an optional boolean criterion.
  pub fn flag<F>(self, expected: Option<bool>, field: F) -> Self
  where
    F: Fn(&E) -> bool + Send + Sync + 'static,
  {
    match expected {
      Some(expected) => self.clause(move |record| field(record) == expected),
      None => self,
    }
  }

  pub fn matches(&self, record: &E) -> bool {
    self.clauses.iter().all(|clause| clause(record))
  }
}

/// Trim and lowercase a search query; `None` when nothing is left.
pub fn normalize_query(query: Option<&str>) -> Option<String> {
  query
    .map(str::trim)
    .filter(|q| !q.is_empty())
    .map(str::to_lowercase)
}
