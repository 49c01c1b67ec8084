// Test double for the remote store: a real in-memory SQLite
// store that remembers every write it was asked to do and can
// be told to fail them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use color_eyre::Result;
use eyre::eyre;
use crate::db::{open_memory_pool, SqliteStore};
use crate::store::{
  CollectionPath,
  CollectionQuery,
  DocPath,
  Document,
  DocumentStore,
  MergeFields,
  StorePaths,
  Subscription
};

pub const TEST_APP_ID: &'static str = "test-app";

pub struct RecordingStore {
  inner: SqliteStore,
  failing: AtomicBool,
  subscriptions_failing: AtomicBool,
  merges: Mutex<Vec<(DocPath, MergeFields)>>,
  appends: Mutex<Vec<(CollectionPath, MergeFields)>>
}

impl RecordingStore {
  pub fn new() -> Self {
    Self {
      inner: SqliteStore::open(open_memory_pool().unwrap()).unwrap(),
      failing: AtomicBool::new(false),
      subscriptions_failing: AtomicBool::new(false),
      merges: Mutex::new(Vec::new()),
      appends: Mutex::new(Vec::new())
    }
  }

  pub fn fail_writes(&self, failing: bool) {
    self.failing.store(failing, Ordering::SeqCst);
  }

  pub fn fail_subscriptions(&self, failing: bool) {
    self.subscriptions_failing.store(failing, Ordering::SeqCst);
  }

  /// Every merge attempted, failed ones included.
  pub fn merges(&self) -> Vec<(DocPath, MergeFields)> {
    self.merges.lock().unwrap().clone()
  }

  pub fn appends(&self) -> Vec<(CollectionPath, MergeFields)> {
    self.appends.lock().unwrap().clone()
  }

  pub fn listener_count(&self) -> usize {
    self.inner.hub().listener_count()
  }

  pub fn stats_document(&self, article_id: &str) -> Document {
    let path = StorePaths::new(TEST_APP_ID).stats_doc(article_id);
    self.inner.get(&path).unwrap().unwrap()
  }

  pub fn comment_documents(&self, article_id: &str) -> Vec<Document> {
    let query = CollectionQuery::new(StorePaths::new(TEST_APP_ID).comments(article_id));
    self.inner.query(&query).unwrap()
  }
}

impl DocumentStore for RecordingStore {
  fn upsert_merge(&self, path: &DocPath, fields: &MergeFields) -> Result<()> {
    self.merges.lock().unwrap().push((path.clone(), fields.clone()));
    if self.failing.load(Ordering::SeqCst) {
      return Err(eyre!("Simulated network failure"));
    }
    self.inner.upsert_merge(path, fields)
  }

  fn append(&self, collection: &CollectionPath, fields: &MergeFields) -> Result<String> {
    self.appends.lock().unwrap().push((collection.clone(), fields.clone()));
    if self.failing.load(Ordering::SeqCst) {
      return Err(eyre!("Simulated network failure"));
    }
    self.inner.append(collection, fields)
  }

  fn get(&self, path: &DocPath) -> Result<Option<Document>> {
    self.inner.get(path)
  }

  fn query(&self, query: &CollectionQuery) -> Result<Vec<Document>> {
    self.inner.query(query)
  }

  fn subscribe_doc(&self, path: &DocPath) -> Result<Subscription<Option<Document>>> {
    if self.subscriptions_failing.load(Ordering::SeqCst) {
      return Err(eyre!("Simulated listener failure on {}", path));
    }
    self.inner.subscribe_doc(path)
  }

  fn subscribe_query(&self, query: &CollectionQuery) -> Result<Subscription<Vec<Document>>> {
    if self.subscriptions_failing.load(Ordering::SeqCst) {
      return Err(eyre!("Simulated listener failure on {}", query.collection));
    }
    self.inner.subscribe_query(query)
  }
}
