//! Documents: contracts, insurance certificates and other files attached to
//! the transport service, either active or archived.

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

/// Whether a document is in current use. The labels are the ones shown to
/// users and are also the serialised form.
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
pub enum DocumentCategory {
  #[default]
  #[serde(rename = "Actif")]
  #[strum(serialize = "Actif")]
  Active,
  #[serde(rename = "Archivé")]
  #[strum(serialize = "Archivé")]
  Archived,
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
pub enum DocumentKind {
  Contract,
  Insurance,
  Registration,
  Medical,
  Invoice,
  #[default]
  Other,
}

// ─── Record ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
  pub id:          RecordId,
  pub name:        String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub category:    DocumentCategory,
  pub kind:        DocumentKind,
  pub size_bytes:  u64,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to `add`. `category` defaults to [`DocumentCategory::Active`].
#[derive(Debug, Clone)]
pub struct NewDocument {
  pub name:        String,
  pub description: Option<String>,
  pub category:    Option<DocumentCategory>,
  pub kind:        DocumentKind,
  pub size_bytes:  u64,
}

impl NewDocument {
  pub fn new(name: impl Into<String>, kind: DocumentKind, size_bytes: u64) -> Self {
    Self {
      name: name.into(),
      description: None,
      category: None,
      kind,
      size_bytes,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
  pub name:        Option<String>,
  /// `Some(None)` clears the description.
  pub description: Option<Option<String>>,
  pub category:    Option<DocumentCategory>,
  pub kind:        Option<DocumentKind>,
  pub size_bytes:  Option<u64>,
}

impl DocumentPatch {
  /// Move a document between the active and archived lists.
  pub fn category(category: DocumentCategory) -> Self {
    Self { category: Some(category), ..Default::default() }
  }
}

// ─── Filter & sort ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentFilter {
  pub search_query: Option<String>,
  pub categories:   BTreeSet<DocumentCategory>,
  pub kinds:        BTreeSet<DocumentKind>,
  /// Applied to `updated_at`.
  pub dates:        DateRange,
}

impl FilterSpec for DocumentFilter {
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
pub enum DocumentSort {
  /// Most recently updated first.
  #[default]
  Default,
  NameAsc,
  NameDesc,
  DateAsc,
  DateDesc,
  SizeAsc,
  SizeDesc,
}

// ─── Entity impl ─────────────────────────────────────────────────────────────

impl Entity for Document {
  type Draft = NewDocument;
  type Filter = DocumentFilter;
  type Patch = DocumentPatch;
  type Sort = DocumentSort;

  const KIND: &'static str = "document";
  const PLACEMENT: Placement = Placement::Prepend;

  fn id(&self) -> &RecordId { &self.id }

  fn compile(filter: &DocumentFilter) -> Predicate<Self> {
    Predicate::all()
      .search(filter.search_query.as_deref(), |d: &Document| {
        let mut fields = vec![d.name.as_str()];
        fields.extend(d.description.as_deref());
        fields
      })
      .one_of(&filter.categories, |d: &Document| d.category)
      .one_of(&filter.kinds, |d: &Document| d.kind)
      .within(filter.dates, |d: &Document| d.updated_at)
  }

  fn comparator(sort: DocumentSort) -> Comparator<Self> {
    match sort {
      DocumentSort::Default | DocumentSort::DateDesc => {
        Comparator::newest_first(|d: &Document| d.updated_at)
      }
      DocumentSort::DateAsc => Comparator::ascending(|d: &Document| d.updated_at),
      DocumentSort::NameAsc => Comparator::text(|d: &Document| d.name.as_str()),
      DocumentSort::NameDesc => Comparator::text_desc(|d: &Document| d.name.as_str()),
      DocumentSort::SizeAsc => Comparator::ascending(|d: &Document| d.size_bytes),
      DocumentSort::SizeDesc => Comparator::descending(|d: &Document| d.size_bytes),
    }
  }

  fn dimensions() -> Vec<Dimension<Self>> {
    vec![Dimension::Partition {
      labels: DocumentCategory::VARIANTS,
      key:    |d| d.category.into(),
    }]
  }

  fn create(id: RecordId, draft: NewDocument, now: DateTime<Utc>) -> Result<Self> {
    require_text(Self::KIND, "name", &draft.name)?;
    Ok(Self {
      id,
      name: draft.name,
      description: draft.description,
      category: draft.category.unwrap_or_default(),
      kind: draft.kind,
      size_bytes: draft.size_bytes,
      created_at: now,
      updated_at: now,
    })
  }

  fn apply(&mut self, patch: DocumentPatch, now: DateTime<Utc>) -> Result<()> {
    if let Some(name) = &patch.name {
      require_text(Self::KIND, "name", name)?;
    }
    merge(&mut self.name, patch.name);
    merge(&mut self.description, patch.description);
    merge(&mut self.category, patch.category);
    merge(&mut self.kind, patch.kind);
    merge(&mut self.size_bytes, patch.size_bytes);
    self.updated_at = now;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::query::{counts_by_category, derive_view};

  fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap()
  }

  fn document(id: &str, name: &str, category: DocumentCategory, updated: u32) -> Document {
    Document {
      id: id.into(),
      name: name.into(),
      description: None,
      category,
      kind: DocumentKind::Contract,
      size_bytes: u64::from(updated) * 1_000,
      created_at: at(1),
      updated_at: at(updated),
    }
  }

  fn seed() -> Vec<Document> {
    use DocumentCategory::*;
    vec![
      document("doc-1", "Contrat transporteur", Active, 3),
      document("doc-2", "Attestation 2022", Archived, 5),
      document("doc-3", "Assurance flotte", Active, 9),
      document("doc-4", "Inscription 2021", Archived, 2),
      document("doc-5", "Règlement intérieur", Active, 6),
    ]
  }

  fn ids(view: &[Document]) -> Vec<&str> { view.iter().map(|d| d.id.as_str()).collect() }

  #[test]
  fn category_filter_keeps_active_in_date_descending_order() {
    let filter = DocumentFilter {
      categories: BTreeSet::from([DocumentCategory::Active]),
      ..Default::default()
    };
    let view = derive_view(&seed(), &filter, DocumentSort::Default);
    assert_eq!(ids(&view), ["doc-3", "doc-5", "doc-1"]);
    assert!(view.iter().all(|d| d.category == DocumentCategory::Active));
  }

  #[test]
  fn category_counts_partition_records() {
    let records = seed();
    let counts = counts_by_category(&records, &Document::dimensions());
    assert_eq!(counts.get("Actif"), 3);
    assert_eq!(counts.get("Archivé"), 2);
    assert_eq!(counts.sum(DocumentCategory::VARIANTS), records.len());
  }

  #[test]
  fn category_labels_round_trip_through_serde() {
    let json = serde_json::to_string(&DocumentCategory::Archived).unwrap();
    assert_eq!(json, "\"Archivé\"");
    let back: DocumentCategory = "Archivé".parse().unwrap();
    assert_eq!(back, DocumentCategory::Archived);
  }

  #[test]
  fn name_sort_ignores_accents() {
    let view = derive_view(&seed(), &DocumentFilter::default(), DocumentSort::NameAsc);
    assert_eq!(ids(&view), ["doc-3", "doc-2", "doc-1", "doc-4", "doc-5"]);
  }

  #[test]
  fn size_sort() {
    let view = derive_view(&seed(), &DocumentFilter::default(), DocumentSort::SizeDesc);
    assert_eq!(ids(&view), ["doc-3", "doc-5", "doc-2", "doc-1", "doc-4"]);
  }

  #[test]
  fn date_range_applies_to_updated_at() {
    let filter = DocumentFilter {
      dates: DateRange::new(Some(at(5)), None),
      ..Default::default()
    };
    let view = derive_view(&seed(), &filter, DocumentSort::DateAsc);
    assert_eq!(ids(&view), ["doc-2", "doc-5", "doc-3"]);
  }

  #[test]
  fn archiving_refreshes_updated_at() {
    let mut doc = document("doc-1", "Contrat", DocumentCategory::Active, 3);
    doc
      .apply(DocumentPatch::category(DocumentCategory::Archived), at(20))
      .unwrap();
    assert_eq!(doc.category, DocumentCategory::Archived);
    assert_eq!(doc.updated_at, at(20));
    assert_eq!(doc.created_at, at(1));
  }

  #[test]
  fn blank_name_is_rejected_without_changes() {
    let mut doc = document("doc-1", "Contrat", DocumentCategory::Active, 3);
    let before = doc.clone();
    let patch = DocumentPatch {
      name: Some(" ".into()),
      category: Some(DocumentCategory::Archived),
      ..Default::default()
    };
    assert!(doc.apply(patch, at(20)).is_err());
    assert_eq!(doc, before);

    let draft = NewDocument::new("", DocumentKind::Invoice, 10);
    assert!(Document::create("doc-9".into(), draft, at(1)).is_err());
  }
}
