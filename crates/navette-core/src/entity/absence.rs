//! Absences: a parent or staff member reporting that a student will miss
//! transport for a period.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};

use super::{Entity, FilterSpec, Placement, merge, require_order, require_text};
use crate::{
  Result,
  filter::{DateRange, Predicate},
  id::RecordId,
  query::Dimension,
  sort::Comparator,
};

// ─── Enumerations ────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
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
pub enum AbsenceReason {
  Illness,
  Appointment,
  Family,
  Other,
}

/// Review state of a reported absence.
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
pub enum AbsenceStatus {
  #[default]
  Pending,
  Approved,
  Rejected,
}

// ─── Record ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Absence {
  pub id:           RecordId,
  pub student_name: String,
  /// The person who reported the absence.
  pub reported_by:  String,
  pub reason:       AbsenceReason,
  pub status:       AbsenceStatus,
  pub start_date:   DateTime<Utc>,
  pub end_date:     DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub observations: Option<String>,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

impl Absence {
  fn validate(&self) -> Result<()> {
    require_text(Self::KIND, "student name", &self.student_name)?;
    require_text(Self::KIND, "reporting person", &self.reported_by)?;
    require_order(
      Self::KIND,
      self.start_date,
      self.end_date,
      false,
      "end date precedes start date",
    )
  }
}

/// Input to `add`. `status` defaults to [`AbsenceStatus::Pending`].
#[derive(Debug, Clone)]
pub struct NewAbsence {
  pub student_name: String,
  pub reported_by:  String,
  pub reason:       AbsenceReason,
  pub start_date:   DateTime<Utc>,
  pub end_date:     DateTime<Utc>,
  pub observations: Option<String>,
  pub status:       Option<AbsenceStatus>,
}

impl NewAbsence {
  /// Convenience constructor with all optional fields unset.
  pub fn new(
    student_name: impl Into<String>,
    reported_by: impl Into<String>,
    reason: AbsenceReason,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
  ) -> Self {
    Self {
      student_name: student_name.into(),
      reported_by: reported_by.into(),
      reason,
      start_date,
      end_date,
      observations: None,
      status: None,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct AbsencePatch {
  pub student_name: Option<String>,
  pub reported_by:  Option<String>,
  pub reason:       Option<AbsenceReason>,
  pub status:       Option<AbsenceStatus>,
  pub start_date:   Option<DateTime<Utc>>,
  pub end_date:     Option<DateTime<Utc>>,
  /// `Some(None)` clears the observations.
  pub observations: Option<Option<String>>,
}

// ─── Filter & sort ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AbsenceFilter {
  pub search_query: Option<String>,
  pub statuses:     BTreeSet<AbsenceStatus>,
  pub reasons:      BTreeSet<AbsenceReason>,
  /// Applied to `start_date`.
  pub dates:        DateRange,
}

impl FilterSpec for AbsenceFilter {
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
pub enum AbsenceSort {
  /// Most recently reported first.
  #[default]
  Default,
  DateAsc,
  DateDesc,
  NameAsc,
  NameDesc,
}

// ─── Entity impl ─────────────────────────────────────────────────────────────

impl Entity for Absence {
  type Draft = NewAbsence;
  type Filter = AbsenceFilter;
  type Patch = AbsencePatch;
  type Sort = AbsenceSort;

  const KIND: &'static str = "absence";
  const PLACEMENT: Placement = Placement::Prepend;

  fn id(&self) -> &RecordId { &self.id }

  fn compile(filter: &AbsenceFilter) -> Predicate<Self> {
    Predicate::all()
      .search(filter.search_query.as_deref(), |a: &Absence| {
        let mut fields = vec![a.student_name.as_str(), a.reported_by.as_str()];
        fields.extend(a.observations.as_deref());
        fields
      })
      .one_of(&filter.statuses, |a: &Absence| a.status)
      .one_of(&filter.reasons, |a: &Absence| a.reason)
      .within(filter.dates, |a: &Absence| a.start_date)
  }

  fn comparator(sort: AbsenceSort) -> Comparator<Self> {
    match sort {
      AbsenceSort::Default => Comparator::newest_first(|a: &Absence| a.created_at),
      AbsenceSort::DateAsc => Comparator::ascending(|a: &Absence| a.start_date),
      AbsenceSort::DateDesc => Comparator::descending(|a: &Absence| a.start_date),
      AbsenceSort::NameAsc => Comparator::text(|a: &Absence| a.student_name.as_str()),
      AbsenceSort::NameDesc => {
        Comparator::text_desc(|a: &Absence| a.student_name.as_str())
      }
    }
  }

  fn dimensions() -> Vec<Dimension<Self>> {
    vec![Dimension::Partition {
      labels: AbsenceStatus::VARIANTS,
      key:    |a| a.status.into(),
    }]
  }

  fn create(id: RecordId, draft: NewAbsence, now: DateTime<Utc>) -> Result<Self> {
    let absence = Self {
      id,
      student_name: draft.student_name,
      reported_by: draft.reported_by,
      reason: draft.reason,
      status: draft.status.unwrap_or_default(),
      start_date: draft.start_date,
      end_date: draft.end_date,
      observations: draft.observations,
      created_at: now,
      updated_at: now,
    };
    absence.validate()?;
    Ok(absence)
  }

  fn apply(&mut self, patch: AbsencePatch, now: DateTime<Utc>) -> Result<()> {
    let mut next = self.clone();
    merge(&mut next.student_name, patch.student_name);
    merge(&mut next.reported_by, patch.reported_by);
    merge(&mut next.reason, patch.reason);
    merge(&mut next.status, patch.status);
    merge(&mut next.start_date, patch.start_date);
    merge(&mut next.end_date, patch.end_date);
    merge(&mut next.observations, patch.observations);
    next.validate()?;
    next.updated_at = now;
    *self = next;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;
  use crate::{ErrorKind, query::derive_view};

  fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, day, 7, 30, 0).unwrap()
  }

  fn absence(id: &str, student: &str, reporter: &str, created: u32) -> Absence {
    Absence {
      id:           id.into(),
      student_name: student.into(),
      reported_by:  reporter.into(),
      reason:       AbsenceReason::Illness,
      status:       AbsenceStatus::Pending,
      start_date:   at(created + 1),
      end_date:     at(created + 2),
      observations: None,
      created_at:   at(created),
      updated_at:   at(created),
    }
  }

  fn seed() -> Vec<Absence> {
    vec![
      absence("abs-1", "Lucas Martin", "Jacqueline Martin", 1),
      absence("abs-2", "Emma Bernard", "Paul Bernard", 2),
      absence("abs-3", "Hugo Petit", "Jacqueline Jacques", 3),
      absence("abs-4", "Léa Durand", "Sophie Durand", 4),
      absence("abs-5", "Nathan Moreau", "Marc Moreau", 5),
    ]
  }

  fn ids(view: &[Absence]) -> Vec<&str> { view.iter().map(|a| a.id.as_str()).collect() }

  #[test]
  fn empty_filter_returns_everything_newest_first() {
    let records = seed();
    let view = derive_view(&records, &AbsenceFilter::default(), AbsenceSort::Default);
    assert_eq!(view.len(), records.len());
    assert_eq!(ids(&view), ["abs-5", "abs-4", "abs-3", "abs-2", "abs-1"]);
  }

  #[test]
  fn search_matches_reporting_person() {
    let filter = AbsenceFilter {
      search_query: Some("jacque".into()),
      ..Default::default()
    };
    let view = derive_view(&seed(), &filter, AbsenceSort::Default);
    assert_eq!(ids(&view), ["abs-3", "abs-1"]);
  }

  #[test]
  fn search_matches_observations() {
    let mut records = seed();
    records[1].observations = Some("Fièvre depuis lundi".into());
    let filter = AbsenceFilter {
      search_query: Some("FIÈVRE".into()),
      ..Default::default()
    };
    let view = derive_view(&records, &filter, AbsenceSort::Default);
    assert_eq!(ids(&view), ["abs-2"]);
  }

  #[test]
  fn and_of_criteria_equals_successive_filtering() {
    let mut records = seed();
    records[0].status = AbsenceStatus::Approved;
    records[2].status = AbsenceStatus::Approved;
    records[3].status = AbsenceStatus::Approved;

    let by_status = AbsenceFilter {
      statuses: BTreeSet::from([AbsenceStatus::Approved]),
      ..Default::default()
    };
    let by_date = AbsenceFilter {
      dates: DateRange::new(Some(at(3)), Some(at(4))),
      ..Default::default()
    };
    let combined = AbsenceFilter {
      statuses: by_status.statuses.clone(),
      dates: by_date.dates,
      ..Default::default()
    };

    let once = derive_view(&records, &combined, AbsenceSort::Default);
    let twice = derive_view(
      &derive_view(&records, &by_status, AbsenceSort::Default),
      &by_date,
      AbsenceSort::Default,
    );
    assert_eq!(once, twice);
    assert_eq!(ids(&once), ["abs-3"]);
  }

  #[test]
  fn name_sort_is_collated_and_reversible() {
    let records = seed();
    let asc = derive_view(&records, &AbsenceFilter::default(), AbsenceSort::NameAsc);
    let names: Vec<&str> = asc.iter().map(|a| a.student_name.as_str()).collect();
    assert_eq!(
      names,
      ["Emma Bernard", "Hugo Petit", "Léa Durand", "Lucas Martin", "Nathan Moreau"]
    );

    let desc = derive_view(&records, &AbsenceFilter::default(), AbsenceSort::NameDesc);
    let mut reversed = desc.clone();
    reversed.reverse();
    assert_eq!(asc, reversed);
  }

  #[test]
  fn equal_keys_tie_break_on_identifier() {
    let mut records = seed();
    for r in &mut records {
      r.created_at = at(1);
    }
    records.reverse();
    let first = derive_view(&records, &AbsenceFilter::default(), AbsenceSort::Default);
    let second = derive_view(&records, &AbsenceFilter::default(), AbsenceSort::Default);
    assert_eq!(first, second);
    assert_eq!(ids(&first), ["abs-1", "abs-2", "abs-3", "abs-4", "abs-5"]);
  }

  #[test]
  fn status_counts_partition_records() {
    let mut records = seed();
    records[0].status = AbsenceStatus::Approved;
    records[1].status = AbsenceStatus::Rejected;
    let counts = crate::query::counts_by_category(&records, &Absence::dimensions());
    assert_eq!(counts.get("pending"), 3);
    assert_eq!(counts.get("approved"), 1);
    assert_eq!(counts.get("rejected"), 1);
    assert_eq!(counts.sum(AbsenceStatus::VARIANTS), records.len());
  }

  #[test]
  fn create_applies_defaults_and_validates() {
    let draft = NewAbsence::new("Lucas", "Jacqueline", AbsenceReason::Family, at(2), at(3));
    let created = Absence::create("abs-9".into(), draft, at(1)).unwrap();
    assert_eq!(created.status, AbsenceStatus::Pending);
    assert_eq!(created.created_at, at(1));
    assert_eq!(created.updated_at, at(1));

    let blank = NewAbsence::new("  ", "Jacqueline", AbsenceReason::Family, at(2), at(3));
    let err = Absence::create("abs-10".into(), blank, at(1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let backwards = NewAbsence::new("Lucas", "Jacqueline", AbsenceReason::Family, at(3), at(2));
    assert!(Absence::create("abs-11".into(), backwards, at(1)).is_err());
  }

  #[test]
  fn apply_merges_and_touches_updated_at() {
    let mut record = absence("abs-1", "Lucas Martin", "Jacqueline Martin", 1);
    let later = at(1) + Duration::hours(5);
    record
      .apply(
        AbsencePatch {
          status: Some(AbsenceStatus::Approved),
          observations: Some(Some("Certificat reçu".into())),
          ..Default::default()
        },
        later,
      )
      .unwrap();
    assert_eq!(record.status, AbsenceStatus::Approved);
    assert_eq!(record.observations.as_deref(), Some("Certificat reçu"));
    assert_eq!(record.student_name, "Lucas Martin");
    assert_eq!(record.created_at, at(1));
    assert_eq!(record.updated_at, later);
  }

  #[test]
  fn failed_apply_leaves_record_untouched() {
    let mut record = absence("abs-1", "Lucas Martin", "Jacqueline Martin", 1);
    let before = record.clone();
    let result = record.apply(
      AbsencePatch {
        status: Some(AbsenceStatus::Approved),
        reported_by: Some(String::new()),
        ..Default::default()
      },
      at(9),
    );
    assert!(result.is_err());
    assert_eq!(record, before);
  }

  #[test]
  fn sort_keys_parse_from_identifiers() {
    assert_eq!(Absence::parse_sort("name-asc").unwrap(), AbsenceSort::NameAsc);
    assert_eq!(Absence::parse_sort("default").unwrap(), AbsenceSort::Default);
    assert!(Absence::parse_sort("size-desc").is_err());
  }
}
