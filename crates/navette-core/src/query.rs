//! The query engine: derived views and category counts.
//!
//! Both operations are pure. They take the settled record list by reference,
//! never mutate it, and cannot fail. A store recomputes them in full on every
//! filter change or mutation; there is no incremental maintenance.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;

// ─── Views ───────────────────────────────────────────────────────────────────

/// Filter `records` with the compiled `filter`, then order the survivors with
/// the comparator registered for `sort`.
pub fn derive_view<E: Entity>(
  records: &[E],
  filter: &E::Filter,
  sort: E::Sort,
) -> Vec<E> {
  let predicate = E::compile(filter);
  let comparator = E::comparator(sort);

  let mut view: Vec<E> = records
    .iter()
    .filter(|record| predicate.matches(record))
    .cloned()
    .collect();
  view.sort_by(|a, b| comparator.compare(a, b));
  view
}

// ─── Counts ──────────────────────────────────────────────────────────────────

/// One axis along which records are counted.
pub enum Dimension<E> {
  /// An independent counter; a record may increment any number of flags.
  Flag {
    label: &'static str,
    test:  fn(&E) -> bool,
  },
  /// A mutually exclusive split. Each record increments exactly one of
  /// `labels`, the one returned by `key`.
  Partition {
    labels: &'static [&'static str],
    key:    fn(&E) -> &'static str,
  },
}

/// Label → count, as returned by [`counts_by_category`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Counts(BTreeMap<String, usize>);

impl Counts {
  /// The count for `label`, or zero if no dimension produced it.
  pub fn get(&self, label: &str) -> usize {
    self.0.get(label).copied().unwrap_or(0)
  }

  /// Sum of the counts for `labels`.
  pub fn sum(&self, labels: &[&str]) -> usize {
    labels.iter().map(|label| self.get(label)).sum()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
    self.0.iter().map(|(label, count)| (label.as_str(), *count))
  }

  fn bump(&mut self, label: &str) {
    *self.0.entry(label.to_owned()).or_default() += 1;
  }

  fn seed(&mut self, label: &str) { self.0.entry(label.to_owned()).or_default(); }
}

/// Count `records` along every dimension in a single pass.
///
/// Every label of every dimension is present in the result, even when its
/// count is zero.
pub fn counts_by_category<E>(records: &[E], dimensions: &[Dimension<E>]) -> Counts {
  let mut counts = Counts::default();
  for dimension in dimensions {
    match dimension {
      Dimension::Flag { label, .. } => counts.seed(label),
      Dimension::Partition { labels, .. } => {
        labels.iter().for_each(|label| counts.seed(label))
      }
    }
  }

  for record in records {
    for dimension in dimensions {
      match dimension {
        Dimension::Flag { label, test } => {
          if test(record) {
            counts.bump(label);
          }
        }
        Dimension::Partition { key, .. } => counts.bump(key(record)),
      }
    }
  }
  counts
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Bus {
    full:  bool,
    shift: &'static str,
  }

  fn dimensions() -> Vec<Dimension<Bus>> {
    vec![
      Dimension::Flag { label: "full", test: |b| b.full },
      Dimension::Partition { labels: &["am", "pm"], key: |b| b.shift },
    ]
  }

  #[test]
  fn empty_input_still_lists_every_label() {
    let counts = counts_by_category::<Bus>(&[], &dimensions());
    assert_eq!(counts.iter().count(), 3);
    assert_eq!(counts.get("full"), 0);
    assert_eq!(counts.get("am"), 0);
    assert_eq!(counts.get("unknown"), 0);
  }

  #[test]
  fn flags_are_independent_and_partitions_sum_to_len() {
    let buses = [
      Bus { full: true, shift: "am" },
      Bus { full: true, shift: "pm" },
      Bus { full: false, shift: "pm" },
    ];
    let counts = counts_by_category(&buses, &dimensions());
    assert_eq!(counts.get("full"), 2);
    assert_eq!(counts.get("am"), 1);
    assert_eq!(counts.get("pm"), 2);
    assert_eq!(counts.sum(&["am", "pm"]), buses.len());
  }

  #[test]
  fn counts_serialize_as_an_object() {
    let buses = [Bus { full: false, shift: "am" }];
    let json = serde_json::to_value(counts_by_category(&buses, &dimensions())).unwrap();
    assert_eq!(json, serde_json::json!({ "am": 1, "full": 0, "pm": 0 }));
  }
}
