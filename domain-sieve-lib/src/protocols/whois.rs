//! WHOIS protocol client (RFC 3912).
//!
//! A WHOIS exchange is one TCP connection to port 43: send the query line,
//! then read until the server closes the connection. The response is
//! free-form text; turning it into fields is the extractor's job.

use crate::error::ClientError;
use crate::protocols::registry::{WhoisServer, WhoisServerTable};
use crate::types::DomainName;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default upper bound on a response body.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// WHOIS client that resolves servers through an injected table.
///
/// Cloning is cheap; the server table is shared.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    servers: Arc<WhoisServerTable>,
    max_response_bytes: usize,
}

impl WhoisClient {
    /// Create a client for the given server table.
    pub fn new(servers: WhoisServerTable) -> Self {
        Self {
            servers: Arc::new(servers),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    /// Reject responses larger than `max` bytes.
    pub fn with_max_response_bytes(mut self, max: usize) -> Self {
        self.max_response_bytes = max;
        self
    }

    pub fn servers(&self) -> &WhoisServerTable {
        &self.servers
    }

    /// Resolve the server responsible for a domain.
    pub fn server_for(&self, domain: &DomainName) -> Result<&WhoisServer, ClientError> {
        self.servers
            .server_for(domain)
            .ok_or_else(|| ClientError::no_server(domain.suffix()))
    }

    /// Fetch the raw WHOIS response for a domain.
    ///
    /// `timeout` bounds the whole exchange (connect, send and read). A
    /// suffix without a server mapping fails immediately without touching
    /// the network.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] whose kind is:
    /// - `Timeout` if the server did not finish answering in time
    /// - `ConnectionFailure` if the connection could not be made or broke
    /// - `ProtocolParseFailure` if the response was empty or too large
    /// - `Unknown` if no server is mapped for the suffix
    pub async fn lookup(
        &self,
        domain: &DomainName,
        timeout: Duration,
    ) -> Result<String, ClientError> {
        let server = self.server_for(domain)?;
        let started = Instant::now();

        let result = tokio::time::timeout(timeout, self.exchange(server, domain)).await;

        match result {
            Ok(Ok(text)) => {
                tracing::debug!(
                    domain = %domain,
                    server = %server,
                    bytes = text.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "whois response received"
                );
                Ok(text)
            }
            Ok(Err(e)) => {
                tracing::debug!(domain = %domain, server = %server, error = %e, "whois lookup failed");
                Err(e)
            }
            Err(_) => {
                tracing::debug!(domain = %domain, server = %server, "whois lookup timed out");
                Err(ClientError::timeout(&server.to_string(), timeout))
            }
        }
    }

    async fn exchange(
        &self,
        server: &WhoisServer,
        domain: &DomainName,
    ) -> Result<String, ClientError> {
        let address = server.to_string();

        let mut stream = TcpStream::connect((server.host.as_str(), server.port))
            .await
            .map_err(|e| ClientError::from_io(&address, &e))?;

        stream
            .write_all(format!("{}\r\n", domain).as_bytes())
            .await
            .map_err(|e| ClientError::from_io(&address, &e))?;

        // Read one byte past the limit so an oversized body is detectable.
        let mut body = Vec::new();
        let limit = self.max_response_bytes as u64 + 1;
        (&mut stream)
            .take(limit)
            .read_to_end(&mut body)
            .await
            .map_err(|e| ClientError::from_io(&address, &e))?;

        if body.len() > self.max_response_bytes {
            return Err(ClientError::protocol(format!(
                "{} sent more than {} bytes",
                address, self.max_response_bytes
            )));
        }

        let text = String::from_utf8_lossy(&body).into_owned();
        if text.trim().is_empty() {
            return Err(ClientError::protocol(format!(
                "{} closed the connection without a response",
                address
            )));
        }

        Ok(text)
    }
}
