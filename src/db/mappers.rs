use crate::store::Document;
use rusqlite::{Row, Error};
use rusqlite::types::Type;
use serde_json::{Map, Value};

// Expects the DOCUMENT_FIELDS column order.
pub fn map_document(row: &Row) -> Result<Document, Error> {
  let id: String = row.get(0)?;
  let raw: String = row.get(1)?;
  Ok(Document {
    id,
    data: parse_data(&raw)
      .map_err(|e| Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?
  })
}

pub fn parse_data(raw: &str) -> Result<Map<String, Value>, serde_json::Error> {
  serde_json::from_str(raw)
}
