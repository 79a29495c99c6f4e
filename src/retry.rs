use crate::error::{Error, Result};
use humantime::format_duration;
use log::{info, warn};
use std::{thread, time::Duration};

/// Fixed delay retry around a single remote call.
///
/// Only failures matched by the policy's allow-list are retried; everything else,
/// including [`Error::RateLimitExhausted`], is handed back to the caller untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: usize,
    pub delay: Duration,
    pub transient_statuses: &'static [u16],
    pub retry_connection_failures: bool,
    pub waiting_for: &'static str,
}

impl RetryPolicy {
    /// Hosting API: 403 (secondary rate limits), 502, 503 and dropped connections,
    /// retried 3 times after 30 seconds.
    pub fn github() -> Self {
        RetryPolicy {
            max_attempts: 4,
            delay: Duration::from_secs(30),
            transient_statuses: &[403, 502, 503],
            retry_connection_failures: true,
            waiting_for: "Temporarily unable to open URL",
        }
    }

    /// Spreadsheet API: 403 and 429 are quota errors; the quota window needs ~100s.
    pub fn google() -> Self {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_secs(110),
            transient_statuses: &[403, 429],
            retry_connection_failures: false,
            waiting_for: "Waiting for Google API request quota reset",
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn is_transient(&self, err: &Error) -> bool {
        match err {
            Error::Http { status, .. } => self.transient_statuses.contains(status),
            Error::Connection { .. } => self.retry_connection_failures,
            _ => false,
        }
    }

    pub fn run<T, F>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation() {
                Ok(value) => return Ok(value),
                Err(err) if self.is_transient(&err) => {
                    if attempt >= self.max_attempts {
                        return Err(Error::RetryExhausted {
                            attempts: attempt,
                            last: Box::new(err),
                        });
                    }
                    warn!("{} ({}), retrying", self.waiting_for, err);
                    info!(
                        "Attempt {}/{} failed, next attempt in {}",
                        attempt,
                        self.max_attempts,
                        format_duration(self.delay)
                    );
                    thread::sleep(self.delay);
                }
                Err(err) => return Err(err),
            }
        }
    }
}
