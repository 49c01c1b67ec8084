// Query building for the documents table. Field names
// never get formatted into the SQL, they're passed as
// JSON path parameters.

use crate::store::{CollectionQuery, Order};

pub const DOCUMENT_FIELDS: &'static str = "doc_id, data";

// Builds the SQL for a CollectionQuery. Parameters are, in order:
// the collection, the JSON path of the order field (when ordering),
// and the limit (-1 means no limit in SQLite).
pub fn select_query_builder(query: &CollectionQuery) -> String {
  let mut sql = format!(
    "SELECT {} FROM documents WHERE collection = ?1 ",
    DOCUMENT_FIELDS
  );
  match &query.order {
    Some(order) => {
      let direction = match order.order {
        Order::Asc => "ASC",
        Order::Desc => "DESC"
      };
      // seq is the insertion order, breaks ties between
      // equal (or missing) field values.
      sql.push_str(&format!(
        "ORDER BY json_extract(data, ?2) {0}, seq {0} LIMIT ?3",
        direction
      ));
    },
    None => sql.push_str("ORDER BY seq ASC LIMIT ?2")
  }
  sql
}

pub fn json_path(field: &str) -> String {
  format!("$.\"{}\"", field.replace('"', ""))
}

pub fn sql_limit(limit: Option<usize>) -> i64 {
  limit.map(|l| l as i64).unwrap_or(-1)
}
