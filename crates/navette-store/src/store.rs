//! [`RecordStore`]: the mutation gateway over a [`Persistence`] backend.

use std::{collections::HashSet, future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{debug, info, warn};

use navette_core::{
  Entity, FilterSpec, RecordId,
  persistence::Persistence,
  query::{Counts, counts_by_category, derive_view},
};

use crate::{Error, Result, StoreConfig};

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// The published state of a store. Readers only ever see settled snapshots:
/// a pending mutation changes nothing here except the `pending` flag.
#[derive(Debug, Clone)]
pub struct Snapshot<E: Entity> {
  /// Settled records, in the order the backend holds them. New records are
  /// placed according to [`Entity::PLACEMENT`] on both sides.
  pub records:  Arc<Vec<E>>,
  /// `records` filtered by `filter` and ordered by `sort`.
  pub view:     Arc<Vec<E>>,
  /// Category counts over all of `records`.
  pub counts:   Arc<Counts>,
  pub filter:   E::Filter,
  pub sort:     E::Sort,
  /// A mutation has been issued and has not yet settled.
  pub pending:  bool,
  /// Message of the last failed operation, until cleared.
  pub error:    Option<String>,
  /// Number of times the view has been recomputed.
  pub revision: u64,
}

impl<E: Entity> Snapshot<E> {
  fn empty() -> Self {
    Self {
      records:  Arc::new(Vec::new()),
      view:     Arc::new(Vec::new()),
      counts:   Arc::new(counts_by_category(&[], &E::dimensions())),
      filter:   E::Filter::default(),
      sort:     E::Sort::default(),
      pending:  false,
      error:    None,
      revision: 0,
    }
  }

  fn rederive(&mut self) {
    self.view = Arc::new(derive_view(&self.records, &self.filter, self.sort));
    self.counts = Arc::new(counts_by_category(&self.records, &E::dimensions()));
    self.revision += 1;
  }

  pub fn get(&self, id: &RecordId) -> Option<&E> {
    self.records.iter().find(|record| record.id() == id)
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// The single owner of one entity kind's records.
///
/// Reads are synchronous and observe the last settled [`Snapshot`].
/// Mutations are asynchronous: each one waits its turn in a FIFO queue, makes
/// exactly one backend round trip, and then either settles (records replaced,
/// view recomputed once, error cleared) or fails (state untouched, error
/// message recorded). Callers receive the outcome as well.
pub struct RecordStore<E: Entity, P> {
  backend: P,
  state:   watch::Sender<Snapshot<E>>,
  queue:   Mutex<()>,
  timeout: Option<Duration>,
}

impl<E: Entity, P: Persistence<E>> RecordStore<E, P> {
  /// Create an empty store over `backend`. Call [`Self::fetch`] to load it.
  pub fn new(backend: P) -> Self {
    Self {
      backend,
      state: watch::Sender::new(Snapshot::empty()),
      queue: Mutex::new(()),
      timeout: None,
    }
  }

  pub fn with_config(backend: P, config: &StoreConfig) -> Self {
    Self { timeout: config.timeout(), ..Self::new(backend) }
  }

  pub fn backend(&self) -> &P { &self.backend }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub fn snapshot(&self) -> Snapshot<E> { self.state.borrow().clone() }

  /// Receive every published snapshot from now on.
  pub fn subscribe(&self) -> watch::Receiver<Snapshot<E>> { self.state.subscribe() }

  pub fn records(&self) -> Arc<Vec<E>> { self.state.borrow().records.clone() }

  pub fn view(&self) -> Arc<Vec<E>> { self.state.borrow().view.clone() }

  pub fn counts(&self) -> Arc<Counts> { self.state.borrow().counts.clone() }

  pub fn get_by_id(&self, id: &RecordId) -> Option<E> {
    self.state.borrow().get(id).cloned()
  }

  pub fn filter(&self) -> E::Filter { self.state.borrow().filter.clone() }

  pub fn sort(&self) -> E::Sort { self.state.borrow().sort }

  pub fn error(&self) -> Option<String> { self.state.borrow().error.clone() }

  pub fn is_pending(&self) -> bool { self.state.borrow().pending }

  pub fn revision(&self) -> u64 { self.state.borrow().revision }

  // ── Filters ───────────────────────────────────────────────────────────────

  /// Update some criteria in place and recompute the view.
  pub fn set_filters(&self, update: impl FnOnce(&mut E::Filter)) {
    self.state.send_modify(|s| {
      update(&mut s.filter);
      s.rederive();
    });
  }

  pub fn replace_filters(&self, filter: E::Filter) { self.set_filters(|f| *f = filter); }

  pub fn clear_filters(&self) { self.replace_filters(E::Filter::default()); }

  /// Recompute the view from the current records and criteria.
  pub fn apply_filters(&self) { self.state.send_modify(Snapshot::rederive); }

  /// Set the free-text query; a blank query removes the criterion.
  pub fn search(&self, query: impl Into<String>) {
    let query = query.into();
    let query = (!query.trim().is_empty()).then_some(query);
    self.set_filters(|f| f.set_search(query));
  }

  pub fn set_sort(&self, sort: E::Sort) {
    self.state.send_modify(|s| {
      s.sort = sort;
      s.rederive();
    });
  }

  pub fn clear_error(&self) {
    self.state.send_if_modified(|s| s.error.take().is_some());
  }

  // ── Mutations ─────────────────────────────────────────────────────────────

  /// Reload every record from the backend. Returns the number loaded.
  pub async fn fetch(&self) -> Result<usize> {
    let _turn = self.turn().await;

    let result: Result<Vec<E>> = async {
      let records = self.round_trip(self.backend.fetch()).await?;
      ensure_unique(&records)?;
      Ok(records)
    }
    .await;

    let loaded = self.settle("fetch", result, |records, fetched| {
      *records = fetched;
      records.len()
    })?;
    info!(entity = E::KIND, loaded, "records fetched");
    Ok(loaded)
  }

  /// Validate `draft`, assign it a fresh identifier, persist it and insert it
  /// according to the entity's placement.
  pub async fn add(&self, draft: E::Draft) -> Result<E> {
    let _turn = self.turn().await;

    let result: Result<E> = async {
      let record = E::create(RecordId::generate(), draft, Utc::now())?;
      debug!(entity = E::KIND, id = %record.id(), "adding record");
      self.round_trip(self.backend.insert(record)).await
    }
    .await;

    self.settle("add", result, |records, stored| {
      E::PLACEMENT.place(records, stored.clone());
      stored
    })
  }

  /// Merge `patch` into the record with identifier `id`.
  pub async fn update(&self, id: &RecordId, patch: E::Patch) -> Result<E> {
    self.update_with(id, |_| patch).await
  }

  /// Like [`Self::update`], but the patch is built from the current record
  /// once this mutation's turn has come, so it sees every earlier mutation.
  pub async fn update_with(
    &self,
    id: &RecordId,
    patch: impl FnOnce(&E) -> E::Patch,
  ) -> Result<E> {
    let _turn = self.turn().await;
    self.update_in_turn(id, patch).await
  }

  /// The body of an update. The caller must hold a [`Turn`].
  pub(crate) async fn update_in_turn(
    &self,
    id: &RecordId,
    patch: impl FnOnce(&E) -> E::Patch,
  ) -> Result<E> {
    let result: Result<E> = async {
      let mut record = self.get_by_id(id).ok_or_else(|| not_found::<E>(id))?;
      let patch = patch(&record);
      record.apply(patch, Utc::now())?;
      debug!(entity = E::KIND, %id, "updating record");
      self.round_trip(self.backend.replace(record)).await
    }
    .await;

    self.settle("update", result, |records, stored| {
      if let Some(slot) = records.iter_mut().find(|r| r.id() == stored.id()) {
        *slot = stored.clone();
      }
      stored
    })
  }

  /// Remove the record with identifier `id`. Deleting an identifier that is
  /// not present succeeds and leaves the records unchanged.
  pub async fn delete(&self, id: &RecordId) -> Result<()> {
    let _turn = self.turn().await;

    let result = self.round_trip(self.backend.remove(id)).await;

    self.settle("delete", result, |records, existed| {
      if !existed {
        debug!(entity = E::KIND, %id, "delete of absent record");
      }
      records.retain(|r| r.id() != id);
    })
  }

  // ── Internals ─────────────────────────────────────────────────────────────

  /// Wait for this mutation's place in the queue.
  pub(crate) async fn turn(&self) -> Turn<'_, E> {
    Turn { _queue: self.queue.lock().await, state: &self.state }
  }

  /// Mark the store pending and perform one backend call.
  async fn round_trip<T, F>(&self, call: F) -> Result<T>
  where
    F: Future<Output = Result<T, P::Error>>,
  {
    self.state.send_modify(|s| s.pending = true);
    let outcome = match self.timeout {
      Some(limit) => tokio::time::timeout(limit, call)
        .await
        .map_err(|_| Error::Timeout(limit))?,
      None => call.await,
    };
    outcome.map_err(Error::backend)
  }

  /// Publish the outcome of a mutation: on success apply it to the records
  /// and recompute the view once; on failure record the error and leave
  /// everything else untouched.
  fn settle<T, R>(
    &self,
    op: &'static str,
    result: Result<T>,
    apply: impl FnOnce(&mut Vec<E>, T) -> R,
  ) -> Result<R> {
    match result {
      Ok(value) => {
        // Only mutations replace `records`, and they hold the queue, so this
        // copy cannot go stale before it is published.
        let mut records = Vec::clone(&self.state.borrow().records);
        let output = apply(&mut records, value);
        let records = Arc::new(records);

        self.state.send_modify(|s| {
          s.records = records;
          s.rederive();
          s.pending = false;
          s.error = None;
          debug!(entity = E::KIND, op, revision = s.revision, "mutation settled");
        });
        Ok(output)
      }
      Err(error) => {
        warn!(entity = E::KIND, op, %error, "mutation failed");
        let message = error.to_string();
        self.state.send_modify(|s| {
          s.pending = false;
          s.error = Some(message);
        });
        Err(error)
      }
    }
  }
}

/// The exclusive right to mutate a store, held for one whole operation.
///
/// Dropping a turn, including when the operation's future is dropped before
/// it completes, clears any `pending` flag the operation left set.
pub(crate) struct Turn<'a, E: Entity> {
  _queue: MutexGuard<'a, ()>,
  state:  &'a watch::Sender<Snapshot<E>>,
}

impl<E: Entity> Drop for Turn<'_, E> {
  fn drop(&mut self) {
    self.state.send_if_modified(|s| std::mem::take(&mut s.pending));
  }
}

fn not_found<E: Entity>(id: &RecordId) -> Error {
  navette_core::Error::NotFound { entity: E::KIND, id: id.clone() }.into()
}

fn ensure_unique<E: Entity>(records: &[E]) -> Result<()> {
  let mut seen = HashSet::with_capacity(records.len());
  for record in records {
    if !seen.insert(record.id()) {
      return Err(
        navette_core::Error::DuplicateId { entity: E::KIND, id: record.id().clone() }.into(),
      );
    }
  }
  Ok(())
}
