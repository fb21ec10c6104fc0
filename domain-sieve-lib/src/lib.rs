//! # Domain Sieve Library
//!
//! Bulk domain availability screening over plain WHOIS (port 43).
//!
//! Candidate names are built from a word list and a suffix, looked up
//! concurrently under a per-host rate limit, classified as available,
//! registered or failed, and the available ones are accumulated in a JSON
//! ledger that only ever grows.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_sieve_lib::{build_candidates, DomainChecker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let checker = DomainChecker::new();
//!     let batch = build_candidates(&["abcd", "wxyz"], ".io");
//!
//!     for event in checker.check_all(batch.domains).await {
//!         println!("{}: {}", event.domain, event.result);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! - **Query client**: one TCP exchange per lookup, with a deadline
//! - **Extractor**: best-effort status/registrar/date fields from free text
//! - **Classifier**: ordered rules turning evidence into a verdict
//! - **Orchestrator**: bounded concurrency, per-host token buckets, cancellation
//! - **Ledger**: idempotent merge, atomic save

// Re-export main public API types and functions
// This makes them available as domain_sieve_lib::TypeName
pub use checker::{CancelHandle, DomainChecker};
pub use classify::{classify, Rule, RULES};
pub use concurrent::HostRateLimiter;
pub use config::{
    expand_home, load_env_config, parse_timeout_string, ConfigManager, DefaultsConfig, EnvConfig,
    FileConfig,
};
pub use error::{ClientError, ErrorKind, SieveError};
pub use extract::{extract, parse_date};
pub use ledger::{ledger_file_name, record_batch, Ledger, LedgerEntry, LedgerUpdate};
pub use protocols::{
    price_to_number, PriceCatalog, PriceOrder, WhoisClient, WhoisServer, WhoisServerTable,
    DEFAULT_MAX_RESPONSE_BYTES, WHOIS_PORT,
};
pub use types::{CheckConfig, Classification, DomainName, LookupEvent, RateLimit, WhoisEvidence};
pub use utils::{
    build_candidates, load_word_list, normalize_suffix, parse_word_list, validate_suffix,
    CandidateBatch,
};

// Internal modules - these are not part of the public API
mod checker;
mod classify;
mod concurrent;
mod config;
mod error;
mod extract;
mod ledger;
mod protocols;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, SieveError>;

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
