//! Core data types for WHOIS availability checking.
//!
//! This module defines the values passed between the query client, the
//! field extractor, the classifier, the orchestrator and the ledger.

use crate::error::{ErrorKind, SieveError};
use crate::utils::{validate_prefix, validate_suffix};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A candidate domain: a prefix joined to a suffix (`"abcd"` + `".io"`).
///
/// Both parts are trimmed and lowercased on construction, so two names that
/// differ only in case are the same ledger key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainName {
    full: String,
    split: usize,
}

impl DomainName {
    /// Build a domain from a prefix and a suffix starting with `.`.
    pub fn new(prefix: &str, suffix: &str) -> Result<Self, SieveError> {
        let prefix = prefix.trim().to_lowercase();
        let suffix = suffix.trim().to_lowercase();
        validate_prefix(&prefix)?;
        validate_suffix(&suffix)?;

        Ok(Self {
            split: prefix.len(),
            full: format!("{}{}", prefix, suffix),
        })
    }

    /// Parse a full domain name, splitting at the first dot.
    pub fn parse(full: &str) -> Result<Self, SieveError> {
        let trimmed = full.trim();
        match trimmed.find('.') {
            Some(dot) => Self::new(&trimmed[..dot], &trimmed[dot..]),
            None => Err(SieveError::invalid_domain(
                trimmed,
                "domain name has no suffix",
            )),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.full[..self.split]
    }

    /// The suffix including its leading dot (e.g. `.io`).
    pub fn suffix(&self) -> &str {
        &self.full[self.split..]
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl TryFrom<String> for DomainName {
    type Error = SieveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DomainName> for String {
    fn from(domain: DomainName) -> Self {
        domain.full
    }
}

/// Normalized, partially populated fields extracted from one WHOIS response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WhoisEvidence {
    /// Status values in the order they appeared (URLs stripped)
    pub status_tokens: Vec<String>,

    /// Sponsoring registrar, if any line named one
    pub registrar: Option<String>,

    /// First parsable creation/registration date
    pub creation_date: Option<DateTime<Utc>>,

    /// First parsable expiry date
    pub expiration_date: Option<DateTime<Utc>>,

    /// The complete response as received
    pub raw_text: String,
}

impl WhoisEvidence {
    /// True when at least one structured record field was recognized.
    pub fn has_record_fields(&self) -> bool {
        !self.status_tokens.is_empty()
            || self.registrar.is_some()
            || self.creation_date.is_some()
            || self.expiration_date.is_some()
    }
}

/// Availability verdict for one lookup. Exactly one variant holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Classification {
    Available,
    Registered,
    Error { kind: ErrorKind, detail: String },
}

impl Classification {
    pub fn error<D: Into<String>>(kind: ErrorKind, detail: D) -> Self {
        Self::Error {
            kind,
            detail: detail.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The error kind, when the lookup did not produce a verdict.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "Available"),
            Self::Registered => write!(f, "Registered"),
            Self::Error { kind, detail } => write!(f, "Error ({}): {}", kind, detail),
        }
    }
}

/// One completed lookup as streamed by the orchestrator.
///
/// `index` is the candidate's position in the submitted batch, so consumers
/// can restore input order; `completed`/`total` are the progress counters at
/// the moment this event was emitted.
#[derive(Debug, Clone, Serialize)]
pub struct LookupEvent {
    pub index: usize,
    pub domain: DomainName,
    #[serde(flatten)]
    pub result: Classification,
    #[serde(skip)]
    pub completed: usize,
    #[serde(skip)]
    pub total: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Token-bucket parameters applied per WHOIS host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimit {
    /// Sustained requests per second
    pub per_second: f64,
    /// Requests allowed back-to-back before pacing starts
    pub burst: u32,
}

impl RateLimit {
    pub fn per_second(per_second: f64) -> Self {
        Self {
            per_second,
            burst: 1,
        }
    }

    pub fn with_burst(mut self, burst: u32) -> Self {
        self.burst = burst.max(1);
        self
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            per_second: 2.0,
            burst: 2,
        }
    }
}

/// Configuration options for a lookup run.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckConfig {
    /// Maximum number of lookups in flight
    /// Default: 10, Range: 1-100
    pub concurrency: usize,

    /// Deadline for each lookup (connect + query + read)
    /// Default: 10 seconds
    pub timeout: Duration,

    /// Per-host pacing; `None` disables the limiter
    /// Default: 2 requests/second, burst 2
    pub rate_limit: Option<RateLimit>,

    /// Responses larger than this are rejected as malformed
    /// Default: 1 MiB
    pub max_response_bytes: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            timeout: Duration::from_secs(10),
            rate_limit: Some(RateLimit::default()),
            max_response_bytes: 1024 * 1024,
        }
    }
}

impl CheckConfig {
    /// Set concurrency, clamped to 1-100 to prevent resource exhaustion.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, 100);
        self
    }

    /// Set the per-lookup deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set or disable per-host rate limiting.
    pub fn with_rate_limit(mut self, rate_limit: Option<RateLimit>) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_max_response_bytes(mut self, max: usize) -> Self {
        self.max_response_bytes = max;
        self
    }
}
