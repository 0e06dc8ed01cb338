pub mod app;
pub mod captures;
pub mod config;
pub mod db;
pub mod errors;
mod extract;
pub mod media;
pub mod notes;
pub mod retention;
pub mod state;
pub mod storage;
pub mod telemetry;

pub use config::config;
pub use errors::{Error, Result};
