//! Error handling for WHOIS lookups, configuration and the ledger.
//!
//! Two families live here. [`SieveError`] is the ordinary library error
//! returned by fallible APIs (bad input, config, file I/O). [`ClientError`]
//! together with [`ErrorKind`] is the lookup failure taxonomy: it never
//! escapes as an `Err` from the orchestrator, it becomes an
//! `Classification::Error` instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Category of a failed or inconclusive lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No complete response before the deadline
    Timeout,
    /// Connect refused, host unreachable, connection reset
    ConnectionFailure,
    /// Response framing was unusable (empty, oversized)
    ProtocolParseFailure,
    /// The server answered with a throttling notice instead of a record
    RateLimited,
    /// No server mapping for the suffix, or anything unclassified
    Unknown,
}

impl ErrorKind {
    /// Short label used in logs and terminal output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::ConnectionFailure => "connection failure",
            Self::ProtocolParseFailure => "protocol parse failure",
            Self::RateLimited => "rate limited",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by the query client for a single lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl ClientError {
    pub fn new<D: Into<String>>(kind: ErrorKind, detail: D) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// The suffix has no entry in the server table.
    pub fn no_server(suffix: &str) -> Self {
        Self::new(
            ErrorKind::Unknown,
            format!("no server mapping for '{}'", suffix),
        )
    }

    pub fn timeout(server: &str, after: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("{} did not answer within {:?}", server, after),
        )
    }

    pub fn connection<M: Into<String>>(message: M) -> Self {
        Self::new(ErrorKind::ConnectionFailure, message)
    }

    pub fn protocol<M: Into<String>>(message: M) -> Self {
        Self::new(ErrorKind::ProtocolParseFailure, message)
    }

    /// Map a socket error onto the lookup taxonomy.
    pub fn from_io(server: &str, err: &std::io::Error) -> Self {
        use std::io::ErrorKind as Io;
        match err.kind() {
            Io::TimedOut | Io::WouldBlock => Self::new(
                ErrorKind::Timeout,
                format!("{}: {}", server, err),
            ),
            Io::InvalidData => Self::protocol(format!("{}: {}", server, err)),
            Io::ConnectionRefused
            | Io::ConnectionReset
            | Io::ConnectionAborted
            | Io::NotConnected
            | Io::AddrNotAvailable
            | Io::BrokenPipe
            | Io::UnexpectedEof => Self::connection(format!("{}: {}", server, err)),
            // Name resolution failures and "network unreachable" surface as
            // uncategorized errors on most platforms.
            _ => Self::connection(format!("{}: {}", server, err)),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl std::error::Error for ClientError {}

/// Main error type for library operations.
#[derive(Debug, Clone)]
pub enum SieveError {
    /// Invalid domain prefix or suffix
    InvalidDomain { domain: String, reason: String },

    /// Configuration errors (invalid settings, unparsable file)
    ConfigError { message: String },

    /// File I/O errors when reading word lists or config files
    FileError { path: String, message: String },

    /// The ledger could not be written; the previous file is untouched
    LedgerError { path: String, message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl SieveError {
    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new ledger save error.
    pub fn ledger<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::LedgerError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True when the failure happened while persisting the ledger.
    ///
    /// Lookups already classified stay valid; the caller may retry the save.
    pub fn is_save_failure(&self) -> bool {
        matches!(self, Self::LedgerError { .. })
    }
}

impl fmt::Display for SieveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomain { domain, reason } => {
                write!(f, "Invalid domain '{}': {}", domain, reason)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::LedgerError { path, message } => {
                write!(f, "Failed to save ledger '{}': {}", path, message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for SieveError {}

impl From<serde_json::Error> for SieveError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON serialization failed: {}", err),
        }
    }
}

impl From<std::io::Error> for SieveError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}
