use derive_more::Display;
use log::error;

// Errors the interaction components hand back to whoever
// drives the UI. None of them is ever fatal, they all end up
// as some transient state or a log line.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum Error {
  #[display(fmt = "Validation failed: {}", _0)]
  Validation(String),
  #[display(fmt = "A submission is already in flight")]
  Busy,
  #[display(fmt = "Store error: {}", _0)]
  Store(String),
  #[display(fmt = "Write queue is full")]
  QueueFull,
  #[display(fmt = "Write queue is closed")]
  Disconnected,
  #[display(fmt = "No async runtime to run timers on")]
  NoRuntime
}

impl std::error::Error for Error {}

// The full report (with its context chain) only goes to the logs.
pub fn map_store_error(e: eyre::Report) -> Error {
  error!("Store error - {:?}", e);
  Error::Store(e.to_string())
}
