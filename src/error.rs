use std::{fmt, io};
use thiserror::Error;

/// Low level reasons a connection can fail before any HTTP status is received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionFailure {
    Reset,
    Refused,
    RemoteDisconnected,
}

impl fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionFailure::Reset => write!(f, "connection reset by peer"),
            ConnectionFailure::Refused => write!(f, "connection refused"),
            ConnectionFailure::RemoteDisconnected => {
                write!(f, "remote end closed connection without response")
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error {status} while requesting {url}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },
    #[error("{kind} while requesting {url}")]
    Connection {
        kind: ConnectionFailure,
        url: String,
    },
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("API request quota has been reached")]
    RateLimitExhausted,
    #[error("Maximum number of retries exceeded after {attempts} attempts: {last}")]
    RetryExhausted { attempts: usize, last: Box<Error> },
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Could not parse {context}")]
    Parse {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Sketches reports carry different commit hashes ({expected} and {found})")]
    InconsistentArtifact { expected: String, found: String },
    #[error("Invalid service account credentials")]
    Credentials(#[from] jsonwebtoken::errors::Error),
    #[error("Could not extract the artifact archive")]
    Archive(#[from] zip::result::ZipError),
    #[error("An IO error occurred")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn parse<C: Into<String>>(context: C, source: serde_json::Error) -> Self {
        Error::Parse {
            context: context.into(),
            source,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Failures that only concern the pull request being processed; the run carries on
    /// with the next one.
    pub fn is_pull_request_scoped(&self) -> bool {
        matches!(
            self,
            Error::Parse { .. } | Error::InconsistentArtifact { .. } | Error::Archive(_) | Error::Io(_)
        )
    }
}
