pub mod app;
pub mod config;
pub mod db;
pub mod flags;
pub mod render;
pub mod store;
pub mod utils;
pub mod writer;
#[cfg(test)]
mod testing;
