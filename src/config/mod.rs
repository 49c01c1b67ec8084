// Adding the context method to errors:
use eyre::WrapErr;
use color_eyre::Result;
use serde::Deserialize;
use std::convert::From;

#[derive(Debug, Deserialize)]
pub struct Config {
  pub db_path: String,
  pub flags_db_path: String,
  pub app_id: String,
  pub site_root: String,
  // Size of the recent comments window:
  pub comment_window: usize,
  // Both in seconds:
  pub contact_success_cooldown: u32,
  pub contact_error_cooldown: u32,
  // Buffer size for the write queue sync_channel:
  pub message_queue_size: usize
}

// What the interaction components actually need. The
// database paths are only used when opening the stores
// so they don't get carried around.
#[derive(Debug, Clone)]
pub struct InteractionSettings {
  pub app_id: String,
  pub site_root: String,
  pub comment_window: usize,
  pub contact_success_cooldown: u32,
  pub contact_error_cooldown: u32,
  pub message_queue_size: usize
}

impl From<Config> for InteractionSettings {
  fn from(config: Config) -> Self {
    Self {
      app_id: config.app_id,
      site_root: config.site_root,
      comment_window: config.comment_window,
      contact_success_cooldown: config.contact_success_cooldown,
      contact_error_cooldown: config.contact_error_cooldown,
      message_queue_size: config.message_queue_size
    }
  }
}

impl Default for InteractionSettings {
  fn default() -> Self {
    Self {
      app_id: String::from(DEFAULT_APP_ID),
      site_root: String::from(DEFAULT_SITE_ROOT),
      comment_window: 20,
      contact_success_cooldown: 30,
      contact_error_cooldown: 3,
      message_queue_size: 30
    }
  }
}

const DEFAULT_APP_ID: &'static str = "default-app-id";
// Should never have a trailing slash.
const DEFAULT_SITE_ROOT: &'static str = "https://lairsbug-blogs.netlify.app";

impl Config {

  pub fn from_env() -> Result<Config> {
    // RUST_LOG is handled by env_logger in main.rs.
    // Keys are lowercase when compared to what's
    // in the .env file.
    config::Config::builder()
      .set_default("db_path", "./interactions.db")?
      .set_default("flags_db_path", "./flags.db")?
      .set_default("app_id", DEFAULT_APP_ID)?
      .set_default("site_root", DEFAULT_SITE_ROOT)?
      .set_default("comment_window", 20)?
      .set_default("contact_success_cooldown", 30)?
      .set_default("contact_error_cooldown", 3)?
      .set_default("message_queue_size", 30)?
      .add_source(config::Environment::default())
      .build()
      .context("Building configuration from env")?
      .try_deserialize()
      .context("Loading configuration from env")
  }

}
