//! The comparator registry.
//!
//! Every entity maps its sort-key enum to a [`Comparator`] built from the
//! helpers below. A comparator is a chain of keys followed by an implicit
//! identifier tie-break, which makes every ordering total: sorting the same
//! input twice yields the same sequence.

use std::{cmp::Ordering, fmt};

use chrono::{DateTime, Utc};

use crate::entity::Entity;

type Key<E> = Box<dyn Fn(&E, &E) -> Ordering + Send + Sync>;

/// A total order over records of type `E`.
pub struct Comparator<E> {
  keys: Vec<Key<E>>,
}

impl<E> fmt::Debug for Comparator<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Comparator").field("keys", &self.keys.len()).finish()
  }
}

impl<E: Entity> Comparator<E> {
  /// Order by identifier only.
  pub fn by_id() -> Self { Self { keys: Vec::new() } }

  /// Start with an arbitrary key.
  pub fn by(cmp: impl Fn(&E, &E) -> Ordering + Send + Sync + 'static) -> Self {
    Self::by_id().then_by(cmp)
  }

  /// Append a key, consulted when every earlier key ties.
  pub fn then_by(
    mut self,
    cmp: impl Fn(&E, &E) -> Ordering + Send + Sync + 'static,
  ) -> Self {
    self.keys.push(Box::new(cmp));
    self
  }

  pub fn ascending<K, F>(field: F) -> Self
  where
    K: Ord,
    F: Fn(&E) -> K + Send + Sync + 'static,
  {
    Self::by(move |a, b| field(a).cmp(&field(b)))
  }

  pub fn descending<K, F>(field: F) -> Self
  where
    K: Ord,
    F: Fn(&E) -> K + Send + Sync + 'static,
  {
    Self::by(move |a, b| field(b).cmp(&field(a)))
  }

  /// Most recent first.
  pub fn newest_first<F>(field: F) -> Self
  where
    F: Fn(&E) -> DateTime<Utc> + Send + Sync + 'static,
  {
    Self::descending(field)
  }

  /// Text order using [`collate`].
  pub fn text<F>(field: F) -> Self
  where
    F: for<'a> Fn(&'a E) -> &'a str + Send + Sync + 'static,
  {
    Self::by(move |a, b| collate(field(a), field(b)))
  }

  /// Reverse text order using [`collate`].
  pub fn text_desc<F>(field: F) -> Self
  where
    F: for<'a> Fn(&'a E) -> &'a str + Send + Sync + 'static,
  {
    Self::by(move |a, b| collate(field(b), field(a)))
  }

  /// Pinned records first. Chain a secondary key with [`Self::then_by`].
  pub fn pinned_first<F>(pinned: F) -> Self
  where
    F: Fn(&E) -> bool + Send + Sync + 'static,
  {
    Self::by(move |a, b| pinned(b).cmp(&pinned(a)))
  }

  pub fn compare(&self, a: &E, b: &E) -> Ordering {
    self
      .keys
      .iter()
      .map(|key| key(a, b))
      .find(|ord| ord.is_ne())
      .unwrap_or_else(|| a.id().cmp(b.id()))
  }
}

// ─── Collation ───────────────────────────────────────────────────────────────

/// Compare two strings the way a reader expects a list to be ordered:
/// letter case and the common Latin diacritics are ignored first, and only
/// break ties afterwards.
pub fn collate(a: &str, b: &str) -> Ordering {
  let folded = a.chars().flat_map(fold).cmp(b.chars().flat_map(fold));
  folded.then_with(|| a.cmp(b))
}

/// Fold one character to its base lowercase form.
fn fold(c: char) -> impl Iterator<Item = char> {
  let base = match c {
    'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'a',
    'ç' | 'Ç' => 'c',
    'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => 'e',
    'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => 'i',
    'ñ' | 'Ñ' => 'n',
    'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'o',
    'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => 'u',
    'ÿ' | 'Ÿ' => 'y',
    'œ' | 'Œ' => return Folded::Pair('o', 'e'),
    'æ' | 'Æ' => return Folded::Pair('a', 'e'),
    other => return Folded::Lower(other.to_lowercase()),
  };
  Folded::One(Some(base))
}

enum Folded {
  One(Option<char>),
  Pair(char, char),
  Lower(std::char::ToLowercase),
}

impl Iterator for Folded {
  type Item = char;

  fn next(&mut self) -> Option<char> {
    match self {
      Self::One(c) => c.take(),
      Self::Pair(first, second) => {
        let out = *first;
        *self = Self::One(Some(*second));
        Some(out)
      }
      Self::Lower(lower) => lower.next(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn collate_ignores_case_first() {
    assert_eq!(collate("alice", "Bob"), Ordering::Less);
    assert_eq!(collate("Zoé", "arnaud"), Ordering::Greater);
  }

  #[test]
  fn collate_places_accented_letters_with_their_base() {
    assert_eq!(collate("Élodie", "Fabien"), Ordering::Less);
    assert_eq!(collate("école", "ecole"), Ordering::Greater);
    assert_eq!(collate("cœur", "coeur"), Ordering::Greater);
    assert_eq!(collate("cœur", "coez"), Ordering::Less);
  }

  #[test]
  fn collate_is_total_on_case_variants() {
    assert_ne!(collate("abc", "ABC"), Ordering::Equal);
    assert_eq!(collate("abc", "abc"), Ordering::Equal);
  }
}
