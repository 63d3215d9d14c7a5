//! Notifications: messages pushed to families and staff, which can be read,
//! pinned, and are ranked by priority.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};

use super::{Entity, FilterSpec, Placement, merge, require_text};
use crate::{
  Result,
  filter::{DateRange, Predicate},
  id::RecordId,
  query::Dimension,
  sort::Comparator,
};

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Exactly one priority per notification; declaration order is urgency order.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
  VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Priority {
  Urgent,
  Important,
  #[default]
  Informative,
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
  VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationCategory {
  Trip,
  Absence,
  Document,
  #[default]
  System,
}

// ─── Record ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
  pub id:         RecordId,
  pub title:      String,
  pub message:    String,
  pub priority:   Priority,
  pub category:   NotificationCategory,
  #[serde(default)]
  pub read:       bool,
  #[serde(default)]
  pub pinned:     bool,
  pub created_at: DateTime<Utc>,
}

/// Input to `add`. New notifications are unread and unpinned.
#[derive(Debug, Clone)]
pub struct NewNotification {
  pub title:    String,
  pub message:  String,
  pub priority: Option<Priority>,
  pub category: NotificationCategory,
}

impl NewNotification {
  pub fn new(
    title: impl Into<String>,
    message: impl Into<String>,
    category: NotificationCategory,
  ) -> Self {
    Self {
      title: title.into(),
      message: message.into(),
      priority: None,
      category,
    }
  }

  pub fn with_priority(mut self, priority: Priority) -> Self {
    self.priority = Some(priority);
    self
  }
}

#[derive(Debug, Clone, Default)]
pub struct NotificationPatch {
  pub title:    Option<String>,
  pub message:  Option<String>,
  pub priority: Option<Priority>,
  pub category: Option<NotificationCategory>,
  pub read:     Option<bool>,
  pub pinned:   Option<bool>,
}

impl NotificationPatch {
  pub fn read(read: bool) -> Self { Self { read: Some(read), ..Default::default() } }

  pub fn pinned(pinned: bool) -> Self {
    Self { pinned: Some(pinned), ..Default::default() }
  }
}

// ─── Filter & sort ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationFilter {
  pub search_query: Option<String>,
  pub priorities:   BTreeSet<Priority>,
  pub categories:   BTreeSet<NotificationCategory>,
  pub read:         Option<bool>,
  pub pinned:       Option<bool>,
  /// Applied to `created_at`.
  pub dates:        DateRange,
}

impl FilterSpec for NotificationFilter {
  fn search_query(&self) -> Option<&str> { self.search_query.as_deref() }

  fn set_search(&mut self, query: Option<String>) { self.search_query = query; }

  fn set_dates(&mut self, range: DateRange) { self.dates = range; }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  VariantNames,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum NotificationSort {
  /// Pinned first, then most recent first.
  #[default]
  Default,
  DateAsc,
  DateDesc,
  /// Most urgent first, then the default order.
  Priority,
}

// ─── Entity impl ─────────────────────────────────────────────────────────────

impl Entity for Notification {
  type Draft = NewNotification;
  type Filter = NotificationFilter;
  type Patch = NotificationPatch;
  type Sort = NotificationSort;

  const KIND: &'static str = "notification";
  const PLACEMENT: Placement = Placement::Prepend;

  fn id(&self) -> &RecordId { &self.id }

  fn compile(filter: &NotificationFilter) -> Predicate<Self> {
    Predicate::all()
      .search(filter.search_query.as_deref(), |n: &Notification| {
        vec![n.title.as_str(), n.message.as_str()]
      })
      .one_of(&filter.priorities, |n: &Notification| n.priority)
      .one_of(&filter.categories, |n: &Notification| n.category)
      .flag(filter.read, |n: &Notification| n.read)
      .flag(filter.pinned, |n: &Notification| n.pinned)
      .within(filter.dates, |n: &Notification| n.created_at)
  }

  fn comparator(sort: NotificationSort) -> Comparator<Self> {
    match sort {
      NotificationSort::Default => Comparator::pinned_first(|n: &Notification| n.pinned)
        .then_by(|a, b| b.created_at.cmp(&a.created_at)),
      NotificationSort::DateAsc => Comparator::ascending(|n: &Notification| n.created_at),
      NotificationSort::DateDesc => {
        Comparator::newest_first(|n: &Notification| n.created_at)
      }
      NotificationSort::Priority => Comparator::ascending(|n: &Notification| n.priority)
        .then_by(|a, b| b.pinned.cmp(&a.pinned))
        .then_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
  }

  fn dimensions() -> Vec<Dimension<Self>> {
    vec![
      Dimension::Partition {
        labels: &["read", "unread"],
        key:    |n| if n.read { "read" } else { "unread" },
      },
      Dimension::Flag { label: "pinned", test: |n| n.pinned },
      Dimension::Partition {
        labels: Priority::VARIANTS,
        key:    |n| n.priority.into(),
      },
    ]
  }

  fn create(id: RecordId, draft: NewNotification, now: DateTime<Utc>) -> Result<Self> {
    require_text(Self::KIND, "title", &draft.title)?;
    require_text(Self::KIND, "message", &draft.message)?;
    Ok(Self {
      id,
      title: draft.title,
      message: draft.message,
      priority: draft.priority.unwrap_or_default(),
      category: draft.category,
      read: false,
      pinned: false,
      created_at: now,
    })
  }

  /// Notifications carry no last-modified timestamp; `now` is unused.
  fn apply(&mut self, patch: NotificationPatch, _now: DateTime<Utc>) -> Result<()> {
    if let Some(title) = &patch.title {
      require_text(Self::KIND, "title", title)?;
    }
    if let Some(message) = &patch.message {
      require_text(Self::KIND, "message", message)?;
    }
    merge(&mut self.title, patch.title);
    merge(&mut self.message, patch.message);
    merge(&mut self.priority, patch.priority);
    merge(&mut self.category, patch.category);
    merge(&mut self.read, patch.read);
    merge(&mut self.pinned, patch.pinned);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;
  use crate::query::{counts_by_category, derive_view};

  fn base() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 11, 4, 6, 0, 0).unwrap() }

  fn notification(n: usize, priority: Priority, read: bool) -> Notification {
    Notification {
      id: format!("ntf-{n:02}").into(),
      title: format!("Message {n}"),
      message: "Le car de la ligne 4 aura du retard".into(),
      priority,
      category: NotificationCategory::Trip,
      read,
      pinned: false,
      created_at: base() + Duration::minutes(n as i64),
    }
  }

  /// 3 urgent/unread, 2 important/read (one pinned), 5 informative/read.
  fn seed() -> Vec<Notification> {
    let mut records = Vec::new();
    for n in 0..3 {
      records.push(notification(n, Priority::Urgent, false));
    }
    for n in 3..5 {
      records.push(notification(n, Priority::Important, true));
    }
    for n in 5..10 {
      records.push(notification(n, Priority::Informative, true));
    }
    records[3].pinned = true;
    records
  }

  fn ids(view: &[Notification]) -> Vec<&str> {
    view.iter().map(|n| n.id.as_str()).collect()
  }

  #[test]
  fn counts_cover_read_pinned_and_priority() {
    let records = seed();
    let counts = counts_by_category(&records, &Notification::dimensions());
    assert_eq!(counts.get("unread"), 3);
    assert_eq!(counts.get("read"), 7);
    assert_eq!(counts.get("pinned"), 1);
    assert_eq!(counts.get("urgent"), 3);
    assert_eq!(counts.get("important"), 2);
    assert_eq!(counts.get("informative"), 5);
    assert_eq!(counts.sum(Priority::VARIANTS), records.len());
    assert_eq!(counts.sum(&["read", "unread"]), records.len());
  }

  #[test]
  fn default_order_is_pinned_then_newest() {
    let view = derive_view(&seed(), &NotificationFilter::default(), NotificationSort::Default);
    assert_eq!(view.len(), 10);
    assert_eq!(view[0].id.as_str(), "ntf-03");
    assert_eq!(
      ids(&view[1..]),
      ["ntf-09", "ntf-08", "ntf-07", "ntf-06", "ntf-05", "ntf-04", "ntf-02", "ntf-01", "ntf-00"]
    );
  }

  #[test]
  fn priority_order_groups_by_urgency() {
    let view = derive_view(&seed(), &NotificationFilter::default(), NotificationSort::Priority);
    let priorities: Vec<Priority> = view.iter().map(|n| n.priority).collect();
    let mut sorted = priorities.clone();
    sorted.sort();
    assert_eq!(priorities, sorted);
    assert_eq!(ids(&view[..3]), ["ntf-02", "ntf-01", "ntf-00"]);
    assert_eq!(view[3].id.as_str(), "ntf-03");
  }

  #[test]
  fn read_and_pinned_flags_filter() {
    let unread = NotificationFilter { read: Some(false), ..Default::default() };
    assert_eq!(derive_view(&seed(), &unread, NotificationSort::Default).len(), 3);

    let pinned = NotificationFilter { pinned: Some(true), ..Default::default() };
    let view = derive_view(&seed(), &pinned, NotificationSort::Default);
    assert_eq!(ids(&view), ["ntf-03"]);
  }

  #[test]
  fn search_spans_title_and_message() {
    let filter = NotificationFilter {
      search_query: Some("LIGNE 4".into()),
      priorities: BTreeSet::from([Priority::Urgent]),
      ..Default::default()
    };
    assert_eq!(derive_view(&seed(), &filter, NotificationSort::Default).len(), 3);

    let filter = NotificationFilter {
      search_query: Some("message 7".into()),
      ..Default::default()
    };
    let view = derive_view(&seed(), &filter, NotificationSort::Default);
    assert_eq!(ids(&view), ["ntf-07"]);
  }

  #[test]
  fn new_notifications_are_unread_and_unpinned() {
    let draft = NewNotification::new("Grève", "Service réduit jeudi", NotificationCategory::System)
      .with_priority(Priority::Urgent);
    let created = Notification::create("ntf-99".into(), draft, base()).unwrap();
    assert!(!created.read);
    assert!(!created.pinned);
    assert_eq!(created.priority, Priority::Urgent);

    let draft = NewNotification::new("Grève", "", NotificationCategory::System);
    assert!(Notification::create("ntf-98".into(), draft, base()).is_err());
  }

  #[test]
  fn patch_toggles_flags_only() {
    let mut record = notification(1, Priority::Urgent, false);
    let before = record.clone();
    record.apply(NotificationPatch::pinned(true), base()).unwrap();
    assert!(record.pinned);
    assert_eq!(record.created_at, before.created_at);
    assert_eq!(record.title, before.title);
  }
}
