//! Notification-specific actions, expressed as ordinary updates so they share
//! the gateway's queueing and all-or-nothing guarantees.

use navette_core::{
  RecordId,
  entity::{Notification, notification::NotificationPatch},
  persistence::Persistence,
};

use crate::{RecordStore, Result};

impl<P: Persistence<Notification>> RecordStore<Notification, P> {
  pub async fn mark_read(&self, id: &RecordId) -> Result<Notification> {
    self.update(id, NotificationPatch::read(true)).await
  }

  /// Mark every unread notification as read, one update at a time. Returns
  /// the number changed. The whole batch takes a single turn in the queue, so
  /// the unread set cannot shift underneath it. Stops at the first failure;
  /// notifications already marked stay marked.
  pub async fn mark_all_read(&self) -> Result<usize> {
    let _turn = self.turn().await;
    let unread: Vec<RecordId> = self
      .records()
      .iter()
      .filter(|n| !n.read)
      .map(|n| n.id.clone())
      .collect();

    for id in &unread {
      self.update_in_turn(id, |_| NotificationPatch::read(true)).await?;
    }
    Ok(unread.len())
  }

  /// Flip the pinned flag, as it stands when this call's turn comes.
  pub async fn toggle_pin(&self, id: &RecordId) -> Result<Notification> {
    self
      .update_with(id, |n| NotificationPatch::pinned(!n.pinned))
      .await
  }
}
