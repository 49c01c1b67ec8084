use std::sync::Mutex;
use serde_json::{Map, Value};
use crate::store::{FieldValue, MergeFields};
use crate::utils::time_utils::current_timestamp_millis;

/**
 * Applies a partial document on top of the stored one.
 * Increments on a missing or non numeric field start from 0.
 */
pub fn apply_merge(data: &mut Map<String, Value>, fields: &MergeFields, now: i64) {
  for (name, value) in fields {
    let merged = match value {
      FieldValue::Increment(delta) => {
        let current = data.get(name).and_then(Value::as_i64).unwrap_or(0);
        Value::from(current.saturating_add(*delta))
      },
      FieldValue::ServerTimestamp => Value::from(now),
      FieldValue::Set(v) => v.clone()
    };
    data.insert(name.clone(), merged);
  }
}

// Server timestamps have to reflect write order, two writes
// in the same millisecond still get different values.
pub struct ServerClock {
  last: Mutex<i64>
}

impl ServerClock {
  pub fn new() -> Self {
    Self {
      last: Mutex::new(0)
    }
  }

  pub fn now_millis(&self) -> i64 {
    let now = current_timestamp_millis();
    match self.last.lock() {
      Ok(mut last) => {
        let next = if now > *last { now } else { *last + 1 };
        *last = next;
        next
      },
      // Poisoned clock, just use the wall clock.
      Err(_) => now
    }
  }
}
