//! Protocol implementations for domain lookups.
//!
//! This module contains the port-43 WHOIS client and the suffix registry
//! (server mappings and price catalogue) it is configured with.

/// WHOIS protocol implementation
pub mod whois;

/// Suffix -> server mappings and the price catalogue
pub mod registry;

// Re-export commonly used functions and types
pub use registry::{
    price_to_number, PriceCatalog, PriceOrder, WhoisServer, WhoisServerTable, WHOIS_PORT,
};
pub use whois::{WhoisClient, DEFAULT_MAX_RESPONSE_BYTES};
