use std::sync::{Mutex, PoisonError};
use log::{debug, warn};
use crate::store::{Document, Subscription};
use super::dtos::ArticleStats;
use super::ClientContext;

/// Last known likes and views of an article, kept in sync by
/// a subscription on its stats document.
pub struct StatsFeed {
  article_id: String,
  feed: Option<Subscription<Option<Document>>>,
  // The document can be missing (never viewed) or vanish, in
  // which case the last values we saw stay on screen.
  last_known: Mutex<ArticleStats>
}

impl StatsFeed {

  pub fn open(ctx: &ClientContext, article_id: &str) -> Self {
    let feed = match ctx.store().subscribe_doc(&ctx.paths().stats_doc(article_id)) {
      Ok(feed) => Some(feed),
      Err(e) => {
        warn!("Could not subscribe to stats of {} - {}", article_id, e);
        None
      }
    };
    Self {
      article_id: article_id.to_string(),
      feed,
      last_known: Mutex::new(ArticleStats::default())
    }
  }

  pub fn current(&self) -> ArticleStats {
    let mut last_known = self.last_known.lock()
      .unwrap_or_else(PoisonError::into_inner);
    if let Some(Some(doc)) = self.feed.as_ref().and_then(Subscription::latest) {
      *last_known = ArticleStats::from(&doc);
    }
    last_known.clone()
  }

  pub fn is_live(&self) -> bool {
    self.feed.as_ref().map(Subscription::is_active).unwrap_or(false)
  }

  pub async fn changed(&mut self) -> bool {
    match self.feed.as_mut() {
      Some(feed) => feed.changed().await,
      None => false
    }
  }

  /// Freezes the counters at their current values.
  pub fn close(&mut self) {
    // Pull the last snapshot in before letting go of it.
    self.current();
    if let Some(mut feed) = self.feed.take() {
      feed.unsubscribe();
      debug!("Stats feed of {} closed", self.article_id);
    }
  }

}

impl Drop for StatsFeed {
  fn drop(&mut self) {
    self.close();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use crate::app::tests::context;
  use crate::store::{DocumentStore, FieldValue, MergeFields};
  use crate::testing::{RecordingStore, TEST_APP_ID};
  use crate::store::StorePaths;

  fn likes(count: i64) -> MergeFields {
    let mut fields = MergeFields::new();
    fields.insert(String::from("likes"), FieldValue::Increment(count));
    fields
  }

  #[tokio::test]
  async fn missing_document_reads_as_zero() {
    let store = Arc::new(RecordingStore::new());
    let ctx = context(store.clone());
    let feed = StatsFeed::open(&ctx, "nobody-reads-this");
    assert_eq!(ArticleStats::default(), feed.current());
    assert!(feed.is_live());
  }

  #[tokio::test]
  async fn follows_pushes_until_closed() {
    let store = Arc::new(RecordingStore::new());
    let ctx = context(store.clone());
    let path = StorePaths::new(TEST_APP_ID).stats_doc("a");
    let mut feed = StatsFeed::open(&ctx, "a");
    store.upsert_merge(&path, &likes(2)).unwrap();
    assert!(feed.changed().await);
    assert_eq!(2, feed.current().likes);
    feed.close();
    store.upsert_merge(&path, &likes(5)).unwrap();
    assert_eq!(2, feed.current().likes);
    assert!(!feed.changed().await);
    assert_eq!(0, store.listener_count());
  }
}
