//! Fan-out of store changes to live subscriptions.
//!
//! Every listener owns a `watch` channel holding the latest snapshot.
//! Publishing re-reads the snapshot from the store while the listener
//! lock is held, so two concurrent writers can never leave an older
//! snapshot in a channel after a newer one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use color_eyre::Result;
use eyre::eyre;
use log::{debug, error, warn};
use tokio::sync::watch;
use super::{CollectionQuery, DocPath, Document};

/// Reads used to build snapshots. Implemented by the store that
/// owns the hub.
pub trait SnapshotSource {
  fn load_doc(&self, path: &DocPath) -> Result<Option<Document>>;
  fn load_query(&self, query: &CollectionQuery) -> Result<Vec<Document>>;
}

type ListenerId = u64;

enum Listener {
  Doc {
    path: DocPath,
    tx: watch::Sender<Option<Document>>
  },
  Query {
    query: CollectionQuery,
    tx: watch::Sender<Vec<Document>>
  }
}

pub struct ChangeHub {
  listeners: Mutex<HashMap<ListenerId, Listener>>,
  next_id: AtomicU64
}

impl ChangeHub {

  pub fn new() -> Arc<Self> {
    Arc::new(Self {
      listeners: Mutex::new(HashMap::new()),
      next_id: AtomicU64::new(1)
    })
  }

  // The initial snapshot is loaded with the lock held so that
  // a write landing in between can't be missed.
  pub fn subscribe_doc(
    self: &Arc<Self>,
    path: &DocPath,
    source: &dyn SnapshotSource
  ) -> Result<Subscription<Option<Document>>> {
    let mut listeners = self.lock()?;
    let initial = source.load_doc(path)?;
    let (tx, rx) = watch::channel(initial);
    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    listeners.insert(id, Listener::Doc { path: path.clone(), tx });
    debug!("Subscription {} opened on document {}", id, path);
    Ok(Subscription::new(id, rx, Arc::downgrade(self)))
  }

  pub fn subscribe_query(
    self: &Arc<Self>,
    query: &CollectionQuery,
    source: &dyn SnapshotSource
  ) -> Result<Subscription<Vec<Document>>> {
    let mut listeners = self.lock()?;
    let initial = source.load_query(query)?;
    let (tx, rx) = watch::channel(initial);
    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    listeners.insert(id, Listener::Query { query: query.clone(), tx });
    debug!("Subscription {} opened on collection {}", id, query.collection);
    Ok(Subscription::new(id, rx, Arc::downgrade(self)))
  }

  /// Pushes fresh snapshots to every listener affected by a write
  /// to `changed`. Listeners whose receiver is gone are dropped.
  /// A snapshot that can't be loaded is skipped, the subscriber
  /// just keeps its previous value.
  pub fn publish(&self, changed: &DocPath, source: &dyn SnapshotSource) {
    let mut listeners = match self.listeners.lock() {
      Ok(listeners) => listeners,
      Err(e) => {
        error!("Could not lock subscription listeners, SHOULD NEVER HAPPEN - {}", e);
        return;
      }
    };
    listeners.retain(|id, listener| match listener {
      Listener::Doc { path, tx } => {
        if tx.is_closed() {
          return false;
        }
        if path == changed {
          match source.load_doc(path) {
            Ok(doc) => { tx.send_replace(doc); },
            Err(e) => warn!("Subscription {} could not load {} - {}", id, path, e)
          }
        }
        true
      },
      Listener::Query { query, tx } => {
        if tx.is_closed() {
          return false;
        }
        if query.collection == changed.collection {
          match source.load_query(query) {
            Ok(docs) => { tx.send_replace(docs); },
            Err(e) => warn!("Subscription {} could not query {} - {}",
              id, query.collection, e)
          }
        }
        true
      }
    });
  }

  pub fn listener_count(&self) -> usize {
    self.listeners.lock().map(|l| l.len()).unwrap_or(0)
  }

  fn remove(&self, id: ListenerId) {
    match self.listeners.lock() {
      Ok(mut listeners) => {
        if listeners.remove(&id).is_some() {
          debug!("Subscription {} closed", id);
        }
      },
      Err(e) => error!("Could not remove subscription {} - {}", id, e)
    }
  }

  fn lock(&self) -> Result<MutexGuard<'_, HashMap<ListenerId, Listener>>> {
    self.listeners.lock()
      .map_err(|e| eyre!("Subscription listeners lock is poisoned - {}", e))
  }

}

/// Live view on a store snapshot. Dropping it unsubscribes.
pub struct Subscription<T> {
  id: ListenerId,
  rx: Option<watch::Receiver<T>>,
  hub: Weak<ChangeHub>
}

impl<T> Subscription<T> {

  fn new(id: ListenerId, rx: watch::Receiver<T>, hub: Weak<ChangeHub>) -> Self {
    Self {
      id,
      rx: Some(rx),
      hub
    }
  }

  pub fn is_active(&self) -> bool {
    self.rx.is_some()
  }

  /// Safe to call any number of times. Once it returns the
  /// listener is gone from the hub and nothing gets pushed here
  /// anymore.
  pub fn unsubscribe(&mut self) {
    if self.rx.take().is_some() {
      if let Some(hub) = self.hub.upgrade() {
        hub.remove(self.id);
      }
    }
  }

}

impl<T: Clone> Subscription<T> {

  /// Latest pushed snapshot, None once unsubscribed.
  pub fn latest(&self) -> Option<T> {
    self.rx.as_ref().map(|rx| rx.borrow().clone())
  }

  /// Waits for the next push. Returns false when the
  /// subscription is closed on either side.
  pub async fn changed(&mut self) -> bool {
    match self.rx.as_mut() {
      Some(rx) => rx.changed().await.is_ok(),
      None => false
    }
  }

}

impl<T> Drop for Subscription<T> {
  fn drop(&mut self) {
    self.unsubscribe();
  }
}
