/*
 * Everything the interaction components know about the
 * remote document store. The SQLite backed implementation
 * lives in the db module, components only ever see the
 * DocumentStore trait.
 */

use std::collections::BTreeMap;
use color_eyre::Result;
use serde_json::{Map, Value};
mod hub;
mod paths;
mod query;
pub use hub::{ChangeHub, SnapshotSource, Subscription};
pub use paths::{CollectionPath, DocPath, StorePaths};
pub use query::{CollectionQuery, Order, OrderBy};

/// A single field of a partial document sent to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
  /// Added atomically to the stored number, which counts as
  /// zero when absent.
  Increment(i64),
  /// Replaced by the store's own clock when the write lands.
  ServerTimestamp,
  Set(Value)
}

/// Partial document. BTreeMap keeps the field order stable
/// in logs and in the stored JSON.
pub type MergeFields = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
  pub id: String,
  pub data: Map<String, Value>
}

impl Document {
  pub fn i64_field(&self, name: &str) -> Option<i64> {
    self.data.get(name).and_then(Value::as_i64)
  }

  pub fn str_field(&self, name: &str) -> Option<&str> {
    self.data.get(name).and_then(Value::as_str)
  }
}

/// Contract of the remote store. Reads are only used to
/// produce subscription snapshots, the interaction components
/// never read a counter to write it back.
pub trait DocumentStore: Send + Sync {
  /// Creates the document when absent, merges the fields otherwise.
  fn upsert_merge(&self, path: &DocPath, fields: &MergeFields) -> Result<()>;

  /// Creates a new document with a store assigned id and returns that id.
  fn append(&self, collection: &CollectionPath, fields: &MergeFields) -> Result<String>;

  fn get(&self, path: &DocPath) -> Result<Option<Document>>;

  fn query(&self, query: &CollectionQuery) -> Result<Vec<Document>>;

  /// Pushes the current document immediately, then again after
  /// every write to it.
  fn subscribe_doc(&self, path: &DocPath) -> Result<Subscription<Option<Document>>>;

  /// Same as subscribe_doc but for the result of a query, pushed
  /// after every write to the queried collection.
  fn subscribe_query(&self, query: &CollectionQuery) -> Result<Subscription<Vec<Document>>>;
}
