use std::sync::Arc;
use color_eyre::Result;
use log::debug;
// Need the crate prefix here because of the other crate
// named "config" we use as a dependency.
use crate::config::InteractionSettings;
use crate::flags::{FlagStore, LocalFlags};
use crate::store::{DocumentStore, StorePaths};
use crate::writer::WriteQueue;
mod article;
mod comments;
mod contact;
pub mod dtos;
pub mod error;
pub mod helpers;
mod likes;
mod stats;
mod views;

pub use article::ArticleView;
pub use comments::{CommentForm, CommentStream, SubmitState};
pub use contact::{ContactForm, ContactSnapshot, ContactStatus, ContactSubmission};
pub use error::Error;
pub use likes::{LikeOutcome, LikeToggle};
pub use stats::StatsFeed;
pub use views::{record_view, ViewOutcome};

/// One browser tab, more or less. Holds the store, the write
/// queue and the flags every component of that tab shares.
/// Cloning is cheap and clones share the same write queue.
#[derive(Clone)]
pub struct ClientContext {
  store: Arc<dyn DocumentStore>,
  writer: Arc<WriteQueue>,
  flags: LocalFlags,
  paths: StorePaths,
  settings: Arc<InteractionSettings>
}

impl ClientContext {

  /// Starts the writer thread of the context. The durable flag
  /// store outlives sessions, the session one should not.
  pub fn open(
    store: Arc<dyn DocumentStore>,
    durable: Arc<dyn FlagStore>,
    session: Arc<dyn FlagStore>,
    settings: InteractionSettings
  ) -> Result<ClientContext> {
    debug!("Opening client context for app {}", settings.app_id);
    let writer = WriteQueue::open(store.clone(), settings.message_queue_size)?;
    Ok(ClientContext {
      store,
      writer: Arc::new(writer),
      flags: LocalFlags::new(durable, session),
      paths: StorePaths::new(&settings.app_id),
      settings: Arc::new(settings)
    })
  }

  pub fn store(&self) -> &dyn DocumentStore {
    self.store.as_ref()
  }

  pub fn writer(&self) -> &WriteQueue {
    &self.writer
  }

  pub fn flags(&self) -> &LocalFlags {
    &self.flags
  }

  pub fn paths(&self) -> &StorePaths {
    &self.paths
  }

  pub fn settings(&self) -> &InteractionSettings {
    &self.settings
  }

  /// Resolves once everything queued so far has settled.
  pub async fn flush(&self) -> std::result::Result<(), Error> {
    self.writer.flush().await
  }

}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::flags::MemoryFlagStore;
  use crate::testing::{RecordingStore, TEST_APP_ID};

  pub fn context(store: Arc<RecordingStore>) -> ClientContext {
    context_with_flags(store, Arc::new(MemoryFlagStore::new()), Arc::new(MemoryFlagStore::new()))
  }

  pub fn context_with_session(
    store: Arc<RecordingStore>,
    session: Arc<dyn FlagStore>
  ) -> ClientContext {
    context_with_flags(store, Arc::new(MemoryFlagStore::new()), session)
  }

  pub fn context_with_flags(
    store: Arc<RecordingStore>,
    durable: Arc<dyn FlagStore>,
    session: Arc<dyn FlagStore>
  ) -> ClientContext {
    ClientContext::open(store, durable, session, test_settings()).unwrap()
  }

  pub fn context_with_settings(
    store: Arc<RecordingStore>,
    settings: InteractionSettings
  ) -> ClientContext {
    ClientContext::open(
      store,
      Arc::new(MemoryFlagStore::new()),
      Arc::new(MemoryFlagStore::new()),
      settings
    ).unwrap()
  }

  pub fn test_settings() -> InteractionSettings {
    InteractionSettings {
      app_id: String::from(TEST_APP_ID),
      ..InteractionSettings::default()
    }
  }

  #[tokio::test]
  async fn contexts_share_the_store_not_the_session() {
    let store = Arc::new(RecordingStore::new());
    let durable: Arc<dyn FlagStore> = Arc::new(MemoryFlagStore::new());
    let first = context_with_flags(store.clone(), durable.clone(), Arc::new(MemoryFlagStore::new()));
    let second = context_with_flags(store.clone(), durable, Arc::new(MemoryFlagStore::new()));
    first.flags().mark_viewed("a").unwrap();
    first.flags().mark_liked("a").unwrap();
    assert!(!second.flags().is_viewed("a").unwrap());
    assert!(second.flags().is_liked("a").unwrap());
    assert_eq!("artifacts/test-app/public/data/stats/a", second.paths().stats_doc("a").to_string());
    first.flush().await.unwrap();
  }
}
