//! Plain-text rendering of records and counts.

use chrono::{DateTime, Utc};
use navette_core::{
  entity::{Absence, Document, Notification, Trip},
  query::Counts,
};

/// A one-line description of a record for `list` output.
pub trait Summary {
  fn summary(&self) -> String;
}

fn day(at: &DateTime<Utc>) -> String { at.format("%Y-%m-%d").to_string() }

fn minute(at: &DateTime<Utc>) -> String { at.format("%Y-%m-%d %H:%M").to_string() }

impl Summary for Absence {
  fn summary(&self) -> String {
    format!(
      "{}  {:<24} {:<12} {:<9} {} .. {}  (by {})",
      self.id,
      self.student_name,
      self.reason,
      self.status,
      day(&self.start_date),
      day(&self.end_date),
      self.reported_by,
    )
  }
}

impl Summary for Document {
  fn summary(&self) -> String {
    format!(
      "{}  {:<32} {:<8} {:<12} {:>10} B  {}",
      self.id,
      self.name,
      self.category,
      self.kind,
      self.size_bytes,
      minute(&self.updated_at),
    )
  }
}

impl Summary for Notification {
  fn summary(&self) -> String {
    let marks = format!(
      "{}{}",
      if self.pinned { 'P' } else { ' ' },
      if self.read { ' ' } else { '*' },
    );
    format!(
      "{}  {marks} {:<11} {:<32} {}",
      self.id,
      self.priority,
      self.title,
      minute(&self.created_at),
    )
  }
}

impl Summary for Trip {
  fn summary(&self) -> String {
    format!(
      "{}  {:<16} {:<8} {:<11} {} -> {}  {} ({} stops)",
      self.id,
      self.route,
      self.direction,
      self.status,
      minute(&self.departure_at),
      self.arrival_at.format("%H:%M"),
      self.driver,
      self.stops.len(),
    )
  }
}

pub fn counts(counts: &Counts) -> String {
  let width = counts.iter().map(|(label, _)| label.chars().count()).max().unwrap_or(0);
  counts
    .iter()
    .map(|(label, n)| format!("{label:<width$}  {n}"))
    .collect::<Vec<_>>()
    .join("\n")
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use navette_core::{
    entity::notification::{NotificationCategory, Priority},
    query::{Dimension, counts_by_category},
  };

  use super::*;

  #[test]
  fn notification_marks_show_pinned_and_unread() {
    let n = Notification {
      id: "ntf-1".into(),
      title: "Retard ligne 3".into(),
      message: "Le bus aura 10 minutes de retard.".into(),
      priority: Priority::Urgent,
      category: NotificationCategory::Trip,
      read: false,
      pinned: true,
      created_at: Utc.with_ymd_and_hms(2024, 9, 2, 7, 5, 0).unwrap(),
    };
    let line = n.summary();
    assert!(line.starts_with("ntf-1  P* urgent"));
    assert!(line.ends_with("2024-09-02 07:05"));
  }

  #[test]
  fn counts_are_aligned_one_per_line() {
    let dims: Vec<Dimension<Notification>> =
      vec![Dimension::Flag { label: "pinned", test: |n| n.pinned }, Dimension::Partition {
        labels: &["read", "unread"],
        key:    |n| if n.read { "read" } else { "unread" },
      }];
    let text = counts(&counts_by_category(&[], &dims));
    assert_eq!(text, "pinned  0\nread    0\nunread  0");
  }
}
