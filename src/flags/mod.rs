/*
 * Local "have I already done this" flags. These are the only
 * pieces of state the client is authoritative for: liked flags
 * survive restarts, viewed flags only live as long as the
 * browsing session.
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use rusqlite::{params, OptionalExtension};
use eyre::{WrapErr, eyre};
use color_eyre::Result;
use crate::db::Pool;

const FLAG_SET: &'static str = "true";

/// Tiny key/value capability so durable and session scoped
/// storage can be swapped without touching the components.
pub trait FlagStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>>;
  fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Session scoped storage, gone when the value is dropped.
#[derive(Default)]
pub struct MemoryFlagStore {
  values: Mutex<HashMap<String, String>>
}

impl MemoryFlagStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn clear(&self) -> Result<()> {
    self.values.lock()
      .map_err(|e| eyre!("Flag store lock is poisoned - {}", e))?
      .clear();
    Ok(())
  }
}

impl FlagStore for MemoryFlagStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let values = self.values.lock()
      .map_err(|e| eyre!("Flag store lock is poisoned - {}", e))?;
    Ok(values.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    self.values.lock()
      .map_err(|e| eyre!("Flag store lock is poisoned - {}", e))?
      .insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// Durable storage in its own SQLite table.
pub struct SqliteFlagStore {
  pool: Pool
}

impl SqliteFlagStore {
  pub fn open(pool: Pool) -> Result<SqliteFlagStore> {
    pool.get()?
      .execute_batch(
        "CREATE TABLE IF NOT EXISTS flags (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );"
      )
      .context("Creating the flags table")?;
    Ok(SqliteFlagStore { pool })
  }
}

impl FlagStore for SqliteFlagStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self.pool.get()?;
    let value = conn.query_row(
      "SELECT value FROM flags WHERE key = ?1",
      params![key],
      |row| row.get(0)
    ).optional()
      .with_context(|| format!("Reading flag {}", key));
    value
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let conn = self.pool.get()?;
    conn.execute(
      "INSERT INTO flags (key, value) VALUES (?1, ?2)
      ON CONFLICT (key) DO UPDATE SET value = excluded.value",
      params![key, value]
    ).with_context(|| format!("Writing flag {}", key))?;
    Ok(())
  }
}

pub fn liked_key(article_id: &str) -> String {
  format!("liked_{}", article_id)
}

pub fn viewed_key(article_id: &str) -> String {
  format!("viewed_{}", article_id)
}

/// Both flag scopes together, with the key naming in one place.
/// Flags are only ever set, never cleared.
#[derive(Clone)]
pub struct LocalFlags {
  durable: Arc<dyn FlagStore>,
  session: Arc<dyn FlagStore>
}

impl LocalFlags {

  pub fn new(durable: Arc<dyn FlagStore>, session: Arc<dyn FlagStore>) -> Self {
    Self {
      durable,
      session
    }
  }

  pub fn is_liked(&self, article_id: &str) -> Result<bool> {
    is_set(self.durable.as_ref(), &liked_key(article_id))
  }

  pub fn mark_liked(&self, article_id: &str) -> Result<()> {
    self.durable.set(&liked_key(article_id), FLAG_SET)
  }

  pub fn is_viewed(&self, article_id: &str) -> Result<bool> {
    is_set(self.session.as_ref(), &viewed_key(article_id))
  }

  pub fn mark_viewed(&self, article_id: &str) -> Result<()> {
    self.session.set(&viewed_key(article_id), FLAG_SET)
  }

}

fn is_set(store: &dyn FlagStore, key: &str) -> Result<bool> {
  Ok(store.get(key)?.as_deref() == Some(FLAG_SET))
}
