//! Trips: planned bus runs between home stops and school.

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
pub enum Direction {
  /// Home to school.
  Outbound,
  /// School to home.
  Return,
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
pub enum TripStatus {
  #[default]
  Planned,
  InProgress,
  Completed,
  Cancelled,
}

// ─── Record ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
  pub id:           RecordId,
  pub route:        String,
  pub driver:       String,
  pub vehicle:      String,
  pub direction:    Direction,
  pub status:       TripStatus,
  pub departure_at: DateTime<Utc>,
  pub arrival_at:   DateTime<Utc>,
  /// Stop names in visiting order.
  #[serde(default)]
  pub stops:        Vec<String>,
  #[serde(default)]
  pub passengers:   u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes:        Option<String>,
  pub updated_at:   DateTime<Utc>,
}

impl Trip {
  fn validate(&self) -> Result<()> {
    require_text(Self::KIND, "route", &self.route)?;
    require_text(Self::KIND, "driver", &self.driver)?;
    require_order(
      Self::KIND,
      self.departure_at,
      self.arrival_at,
      true,
      "arrival must be after departure",
    )
  }
}

/// Input to `add`. New trips are [`TripStatus::Planned`].
#[derive(Debug, Clone)]
pub struct NewTrip {
  pub route:        String,
  pub driver:       String,
  pub vehicle:      String,
  pub direction:    Direction,
  pub departure_at: DateTime<Utc>,
  pub arrival_at:   DateTime<Utc>,
  pub stops:        Vec<String>,
  pub passengers:   u32,
  pub notes:        Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TripPatch {
  pub route:        Option<String>,
  pub driver:       Option<String>,
  pub vehicle:      Option<String>,
  pub direction:    Option<Direction>,
  pub status:       Option<TripStatus>,
  pub departure_at: Option<DateTime<Utc>>,
  pub arrival_at:   Option<DateTime<Utc>>,
  pub stops:        Option<Vec<String>>,
  pub passengers:   Option<u32>,
  /// `Some(None)` clears the notes.
  pub notes:        Option<Option<String>>,
}

// ─── Filter & sort ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TripFilter {
  pub search_query: Option<String>,
  pub statuses:     BTreeSet<TripStatus>,
  pub directions:   BTreeSet<Direction>,
  /// Applied to `departure_at`.
  pub dates:        DateRange,
}

impl FilterSpec for TripFilter {
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
pub enum TripSort {
  /// Chronological by departure.
  #[default]
  Default,
  DateAsc,
  DateDesc,
  RouteAsc,
}

// ─── Entity impl ─────────────────────────────────────────────────────────────

impl Entity for Trip {
  type Draft = NewTrip;
  type Filter = TripFilter;
  type Patch = TripPatch;
  type Sort = TripSort;

  const KIND: &'static str = "trip";
  const PLACEMENT: Placement = Placement::Append;

  fn id(&self) -> &RecordId { &self.id }

  fn compile(filter: &TripFilter) -> Predicate<Self> {
    Predicate::all()
      .search(filter.search_query.as_deref(), |t: &Trip| {
        let mut fields = vec![t.route.as_str(), t.driver.as_str(), t.vehicle.as_str()];
        fields.extend(t.notes.as_deref());
        fields.extend(t.stops.iter().map(String::as_str));
        fields
      })
      .one_of(&filter.statuses, |t: &Trip| t.status)
      .one_of(&filter.directions, |t: &Trip| t.direction)
      .within(filter.dates, |t: &Trip| t.departure_at)
  }

  fn comparator(sort: TripSort) -> Comparator<Self> {
    match sort {
      TripSort::Default | TripSort::DateAsc => {
        Comparator::ascending(|t: &Trip| t.departure_at)
      }
      TripSort::DateDesc => Comparator::newest_first(|t: &Trip| t.departure_at),
      TripSort::RouteAsc => Comparator::text(|t: &Trip| t.route.as_str())
        .then_by(|a, b| a.departure_at.cmp(&b.departure_at)),
    }
  }

  fn dimensions() -> Vec<Dimension<Self>> {
    vec![Dimension::Partition {
      labels: TripStatus::VARIANTS,
      key:    |t| t.status.into(),
    }]
  }

  fn create(id: RecordId, draft: NewTrip, now: DateTime<Utc>) -> Result<Self> {
    let trip = Self {
      id,
      route: draft.route,
      driver: draft.driver,
      vehicle: draft.vehicle,
      direction: draft.direction,
      status: TripStatus::Planned,
      departure_at: draft.departure_at,
      arrival_at: draft.arrival_at,
      stops: draft.stops,
      passengers: draft.passengers,
      notes: draft.notes,
      updated_at: now,
    };
    trip.validate()?;
    Ok(trip)
  }

  fn apply(&mut self, patch: TripPatch, now: DateTime<Utc>) -> Result<()> {
    let mut next = self.clone();
    merge(&mut next.route, patch.route);
    merge(&mut next.driver, patch.driver);
    merge(&mut next.vehicle, patch.vehicle);
    merge(&mut next.direction, patch.direction);
    merge(&mut next.status, patch.status);
    merge(&mut next.departure_at, patch.departure_at);
    merge(&mut next.arrival_at, patch.arrival_at);
    merge(&mut next.stops, patch.stops);
    merge(&mut next.passengers, patch.passengers);
    merge(&mut next.notes, patch.notes);
    next.validate()?;
    next.updated_at = now;
    *self = next;
    Ok(())
  }
}
