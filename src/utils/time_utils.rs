use chrono::{DateTime, Utc};

// Server timestamps are milliseconds since the epoch.
// chrono formatting reference:
// https://docs.rs/chrono/latest/chrono/format/strftime/index.html
const DATE_FORMAT_STANDARD: &'static str = "%d/%m/%Y %k:%M:%S";
const DATE_FORMAT_USCOMPACT: &'static str = "%Y-%m-%d";

pub enum DateFormat {
  Standard,
  USCompact,
}

// Everything is rendered in UTC. The terminal we print to doesn't
// really have a notion of the reader's timezone anyway.
pub fn timestamp_millis_to_date_string(
  timestamp_millis: i64,
  format: DateFormat
) -> Option<String> {
  let d = DateTime::<Utc>::from_timestamp_millis(timestamp_millis)?;
  let format_str = match format {
    DateFormat::Standard => DATE_FORMAT_STANDARD,
    DateFormat::USCompact => DATE_FORMAT_USCOMPACT,
  };
  Some(d.format(format_str).to_string())
}

pub fn current_timestamp_millis() -> i64 {
  Utc::now().timestamp_millis()
}
