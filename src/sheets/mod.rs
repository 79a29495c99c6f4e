//! Trend tracking in a Google Sheets spreadsheet.
pub mod auth;
pub mod client;
pub mod publisher;

pub use client::SheetsClient;
pub use publisher::{column_letter, TrendsPublisher};
