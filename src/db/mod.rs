use std::sync::Arc;
use rusqlite::{params, OptionalExtension, Params, Row, TransactionBehavior};
use r2d2_sqlite::SqliteConnectionManager;
use serde_json::{Map, Value};
use eyre::WrapErr;
use color_eyre::Result;
use log::debug;
use crate::store::{
  ChangeHub,
  CollectionPath,
  CollectionQuery,
  DocPath,
  Document,
  DocumentStore,
  MergeFields,
  SnapshotSource,
  Subscription
};
mod helpers;
mod mappers;
mod queries;
use helpers::{apply_merge, ServerClock};
use mappers::{map_document, parse_data};
use queries::{json_path, select_query_builder, sql_limit, DOCUMENT_FIELDS};

// Type alias to make function signatures much clearer:
pub type Pool = r2d2::Pool<SqliteConnectionManager>;

const DOCUMENTS_SCHEMA: &'static str = "
  CREATE TABLE IF NOT EXISTS documents (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    doc_id TEXT NOT NULL,
    data TEXT NOT NULL,
    UNIQUE (collection, doc_id)
  );";

pub fn open_file_pool(path: &str) -> Result<Pool> {
  let manager = SqliteConnectionManager::file(path);
  Pool::new(manager)
    .with_context(|| format!("Opening SQLite database at {}", path))
}

// Every in-memory connection is its own database, so the
// pool must never hold more than one.
pub fn open_memory_pool() -> Result<Pool> {
  Pool::builder()
    .max_size(1)
    .build(SqliteConnectionManager::memory())
    .context("Opening in-memory SQLite database")
}

fn select_many<T, P, F>(
  pool: &Pool,
  query: &str,
  params: P,
  mapper: F
) -> Result<Vec<T>>
  where
    P: Params,
    F: FnMut(&Row<'_>) -> Result<T, rusqlite::Error>,
{
  let conn = pool.get()?;
  let mut stmt = conn.prepare(query)?;
  let rows = stmt.query_map(params, mapper)
    .and_then(Iterator::collect)
    .context("Generic select_many query");
  rows
}

/**
 * Document store on top of a single SQLite table. Merges run
 * in immediate transactions so concurrent increments from other
 * connections (or other processes on the same file) serialize.
 * Push subscriptions only see writes made through this instance.
 */
pub struct SqliteStore {
  pool: Pool,
  hub: Arc<ChangeHub>,
  clock: ServerClock
}

impl SqliteStore {

  pub fn open(pool: Pool) -> Result<SqliteStore> {
    pool.get()?
      .execute_batch(DOCUMENTS_SCHEMA)
      .context("Creating the documents table")?;
    Ok(SqliteStore {
      pool,
      hub: ChangeHub::new(),
      clock: ServerClock::new()
    })
  }

  pub fn hub(&self) -> &Arc<ChangeHub> {
    &self.hub
  }

  // The connection has to be released before publishing,
  // snapshot loading needs one too.
  fn write_merge(&self, path: &DocPath, fields: &MergeFields) -> Result<()> {
    let mut conn = self.pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let existing: Option<String> = tx.query_row(
      "SELECT data FROM documents WHERE collection = ?1 AND doc_id = ?2",
      params![path.collection.as_str(), path.id],
      |row| row.get(0)
    ).optional()?;
    let mut data = match existing {
      Some(raw) => parse_data(&raw)
        .with_context(|| format!("Stored document {} is not a JSON object", path))?,
      None => Map::new()
    };
    apply_merge(&mut data, fields, self.clock.now_millis());
    tx.execute(
      "INSERT INTO documents (collection, doc_id, data) VALUES (?1, ?2, ?3)
      ON CONFLICT (collection, doc_id) DO UPDATE SET data = excluded.data",
      params![path.collection.as_str(), path.id, Value::Object(data).to_string()]
    )?;
    tx.commit().context("Committing merge")
  }

  fn write_append(&self, collection: &CollectionPath, fields: &MergeFields) -> Result<DocPath> {
    let mut conn = self.pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    // Ids only have to be unique and opaque, deriving them from
    // the sequence inside the transaction does both.
    let next_seq: i64 = tx.query_row(
      "SELECT COALESCE(MAX(seq), 0) + 1 FROM documents",
      [],
      |row| row.get(0)
    )?;
    let path = collection.doc(&format!("{:016x}", next_seq));
    let mut data = Map::new();
    apply_merge(&mut data, fields, self.clock.now_millis());
    tx.execute(
      "INSERT INTO documents (collection, doc_id, data) VALUES (?1, ?2, ?3)",
      params![collection.as_str(), path.id, Value::Object(data).to_string()]
    )?;
    tx.commit().context("Committing append")?;
    Ok(path)
  }

}

impl SnapshotSource for SqliteStore {
  fn load_doc(&self, path: &DocPath) -> Result<Option<Document>> {
    self.get(path)
  }

  fn load_query(&self, query: &CollectionQuery) -> Result<Vec<Document>> {
    self.query(query)
  }
}

impl DocumentStore for SqliteStore {

  fn upsert_merge(&self, path: &DocPath, fields: &MergeFields) -> Result<()> {
    self.write_merge(path, fields)
      .with_context(|| format!("Merging into {}", path))?;
    debug!("Merged {:?} into {}", fields, path);
    self.hub.publish(path, self);
    Ok(())
  }

  fn append(&self, collection: &CollectionPath, fields: &MergeFields) -> Result<String> {
    let path = self.write_append(collection, fields)
      .with_context(|| format!("Appending to {}", collection))?;
    debug!("Appended {}", path);
    self.hub.publish(&path, self);
    Ok(path.id)
  }

  fn get(&self, path: &DocPath) -> Result<Option<Document>> {
    let conn = self.pool.get()?;
    let doc = conn.query_row(
      &format!(
        "SELECT {} FROM documents WHERE collection = ?1 AND doc_id = ?2",
        DOCUMENT_FIELDS
      ),
      params![path.collection.as_str(), path.id],
      map_document
    ).optional()
      .with_context(|| format!("Reading document {}", path));
    doc
  }

  fn query(&self, query: &CollectionQuery) -> Result<Vec<Document>> {
    let sql = select_query_builder(query);
    let limit = sql_limit(query.limit);
    match &query.order {
      Some(order) => select_many(
        &self.pool,
        &sql,
        params![query.collection.as_str(), json_path(&order.field), limit],
        map_document
      ),
      None => select_many(
        &self.pool,
        &sql,
        params![query.collection.as_str(), limit],
        map_document
      )
    }
  }

  fn subscribe_doc(&self, path: &DocPath) -> Result<Subscription<Option<Document>>> {
    self.hub.subscribe_doc(path, self)
  }

  fn subscribe_query(&self, query: &CollectionQuery) -> Result<Subscription<Vec<Document>>> {
    self.hub.subscribe_query(query, self)
  }

}

#[cfg(test)]
mod tests {
  use super::*;
  use std::thread;
  use crate::store::{FieldValue, Order, OrderBy, StorePaths};
  use serde_json::json;

  fn store() -> SqliteStore {
    SqliteStore::open(open_memory_pool().unwrap()).unwrap()
  }

  fn increment(field: &str, by: i64) -> MergeFields {
    let mut fields = MergeFields::new();
    fields.insert(field.to_string(), FieldValue::Increment(by));
    fields
  }

  fn comment(text: &str) -> MergeFields {
    let mut fields = MergeFields::new();
    fields.insert(String::from("name"), FieldValue::Set(json!("Anonymous")));
    fields.insert(String::from("text"), FieldValue::Set(json!(text)));
    fields.insert(String::from("timestamp"), FieldValue::ServerTimestamp);
    fields
  }

  #[test]
  fn upsert_creates_then_merges() {
    let store = store();
    let path = StorePaths::new("app").stats_doc("intro-to-rust");
    assert!(store.get(&path).unwrap().is_none());
    store.upsert_merge(&path, &increment("views", 1)).unwrap();
    store.upsert_merge(&path, &increment("likes", 1)).unwrap();
    store.upsert_merge(&path, &increment("views", 1)).unwrap();
    let doc = store.get(&path).unwrap().unwrap();
    assert_eq!(Some(2), doc.i64_field("views"));
    assert_eq!(Some(1), doc.i64_field("likes"));
  }

  #[test]
  fn concurrent_increments_are_not_lost() {
    let dir = std::env::temp_dir().join(format!(
      "lairsbug-store-{}-{}.db", std::process::id(), crate::utils::time_utils::current_timestamp_millis()
    ));
    let db_path = dir.to_string_lossy().to_string();
    let store = Arc::new(SqliteStore::open(open_file_pool(&db_path).unwrap()).unwrap());
    let path = StorePaths::new("app").stats_doc("a");
    let handles: Vec<_> = (0..4).map(|_| {
      let store = store.clone();
      let path = path.clone();
      thread::spawn(move || {
        for _ in 0..25 {
          store.upsert_merge(&path, &increment("likes", 1)).unwrap();
        }
      })
    }).collect();
    for h in handles {
      h.join().unwrap();
    }
    assert_eq!(Some(100), store.get(&path).unwrap().unwrap().i64_field("likes"));
    drop(store);
    let _ = std::fs::remove_file(&db_path);
  }

  #[test]
  fn append_assigns_ids_and_timestamps() {
    let store = store();
    let coll = StorePaths::new("app").comments("a");
    let first = store.append(&coll, &comment("one")).unwrap();
    let second = store.append(&coll, &comment("two")).unwrap();
    assert_ne!(first, second);
    let a = store.get(&coll.doc(&first)).unwrap().unwrap();
    let b = store.get(&coll.doc(&second)).unwrap().unwrap();
    assert!(b.i64_field("timestamp").unwrap() > a.i64_field("timestamp").unwrap());
  }

  #[test]
  fn query_orders_newest_first_and_limits() {
    let store = store();
    let coll = StorePaths::new("app").comments("a");
    for i in 0..25 {
      store.append(&coll, &comment(&format!("comment {}", i))).unwrap();
    }
    // Other collections stay out of the result:
    store.append(&StorePaths::new("app").comments("b"), &comment("elsewhere")).unwrap();
    let query = CollectionQuery::new(coll)
      .order(OrderBy::new(Order::Desc, "timestamp"))
      .limit(20);
    let docs = store.query(&query).unwrap();
    assert_eq!(20, docs.len());
    assert_eq!(Some("comment 24"), docs[0].str_field("text"));
    assert_eq!(Some("comment 5"), docs[19].str_field("text"));
  }

  #[test]
  fn writes_are_pushed_to_subscribers() {
    let store = store();
    let path = StorePaths::new("app").stats_doc("a");
    let sub = store.subscribe_doc(&path).unwrap();
    assert_eq!(Some(None), sub.latest());
    store.upsert_merge(&path, &increment("views", 1)).unwrap();
    let doc = sub.latest().unwrap().unwrap();
    assert_eq!(Some(1), doc.i64_field("views"));
  }

  #[test]
  fn appends_are_pushed_to_query_subscribers() {
    let store = store();
    let coll = StorePaths::new("app").comments("a");
    let query = CollectionQuery::new(coll.clone())
      .order(OrderBy::new(Order::Desc, "timestamp"))
      .limit(2);
    let sub = store.subscribe_query(&query).unwrap();
    store.append(&coll, &comment("one")).unwrap();
    store.append(&coll, &comment("two")).unwrap();
    store.append(&coll, &comment("three")).unwrap();
    let docs = sub.latest().unwrap();
    let texts: Vec<&str> = docs.iter().filter_map(|d| d.str_field("text")).collect();
    assert_eq!(vec!["three", "two"], texts);
  }
}
