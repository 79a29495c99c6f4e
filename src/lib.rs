pub mod config;
pub mod console;
pub mod deltas;
pub mod error;
pub mod github;
pub mod http;
pub mod logging;
pub mod report;
pub mod retry;
pub mod sheets;
pub mod trends;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
