//! Main domain checker implementation.
//!
//! This module provides the `DomainChecker` struct that runs lookup batches:
//! it bounds concurrency, paces requests per WHOIS host, classifies each
//! response and streams the verdicts back as they complete.

use crate::classify::classify;
use crate::concurrent::HostRateLimiter;
use crate::extract::extract;
use crate::protocols::{WhoisClient, WhoisServerTable};
use crate::types::{CheckConfig, Classification, DomainName, LookupEvent};
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Stops a running batch from dispatching further lookups.
///
/// Lookups already in flight finish (or time out) and their events are
/// still delivered. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Coordinates WHOIS lookups for a batch of candidates.
///
/// # Example
///
/// ```rust,no_run
/// use domain_sieve_lib::{DomainChecker, DomainName};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let checker = DomainChecker::new();
///     let domain = DomainName::new("example", ".com")?;
///     let result = checker.check_domain(&domain).await;
///     println!("{}: {}", domain, result);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct DomainChecker {
    config: CheckConfig,
    client: Arc<WhoisClient>,
    limiter: Arc<HostRateLimiter>,
    cancel: CancelHandle,
}

impl DomainChecker {
    /// Create a checker with default settings and the built-in server table.
    ///
    /// Default settings:
    /// - Concurrency: 10
    /// - Timeout: 10 seconds
    /// - Rate limit: 2 requests/second per host, burst 2
    pub fn new() -> Self {
        Self::with_config(CheckConfig::default(), WhoisServerTable::builtin())
    }

    /// Create a checker with custom configuration and server table.
    ///
    /// ```rust
    /// use domain_sieve_lib::{CheckConfig, DomainChecker, WhoisServerTable};
    /// use std::time::Duration;
    ///
    /// let config = CheckConfig::default()
    ///     .with_concurrency(20)
    ///     .with_timeout(Duration::from_secs(5));
    ///
    /// let checker = DomainChecker::with_config(config, WhoisServerTable::builtin());
    /// ```
    pub fn with_config(config: CheckConfig, servers: WhoisServerTable) -> Self {
        let client = WhoisClient::new(servers).with_max_response_bytes(config.max_response_bytes);
        let limiter = HostRateLimiter::new(config.rate_limit);

        Self {
            config,
            client: Arc::new(client),
            limiter: Arc::new(limiter),
            cancel: CancelHandle::new(),
        }
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    pub fn servers(&self) -> &WhoisServerTable {
        self.client.servers()
    }

    /// Handle that stops dispatch for every batch run by this checker.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Look up and classify a single domain.
    ///
    /// Never fails: transport problems come back as
    /// [`Classification::Error`].
    pub async fn check_domain(&self, domain: &DomainName) -> Classification {
        if let Ok(server) = self.client.server_for(domain) {
            self.limiter.acquire(&server.host).await;
        }
        self.lookup_and_classify(domain).await
    }

    /// Batch variant of `check_domain`: returns `None` without connecting
    /// when the run was cancelled while waiting for a rate-limit token.
    async fn dispatch(&self, domain: &DomainName) -> Option<Classification> {
        if let Ok(server) = self.client.server_for(domain) {
            self.limiter.acquire(&server.host).await;
        }
        if self.cancel.is_cancelled() {
            tracing::debug!(domain = %domain, "cancelled before dispatch");
            return None;
        }
        Some(self.lookup_and_classify(domain).await)
    }

    async fn lookup_and_classify(&self, domain: &DomainName) -> Classification {
        let outcome = self
            .client
            .lookup(domain, self.config.timeout)
            .await
            .map(|raw| extract(&raw));

        classify(outcome)
    }

    /// Run a batch and stream events in completion order.
    ///
    /// At most `concurrency` lookups are in flight. Each event carries the
    /// candidate's input index and the progress counters at emission time.
    /// After cancellation no new lookup starts: candidates still queued or
    /// waiting on the rate limiter are dropped without an event, and the
    /// stream ends once the lookups already connected are delivered.
    pub fn run(&self, domains: Vec<DomainName>) -> Pin<Box<dyn Stream<Item = LookupEvent> + Send>> {
        let total = domains.len();
        let concurrency = self.config.concurrency.max(1);
        let cancel = self.cancel.clone();
        let checker = self.clone();

        tracing::debug!(total, concurrency, "starting batch");

        let mut completed = 0usize;
        let stream = stream::iter(domains.into_iter().enumerate())
            .take_while(move |_| {
                let keep_going = !cancel.is_cancelled();
                async move { keep_going }
            })
            .map(move |(index, domain)| {
                let checker = checker.clone();
                async move {
                    let started = Instant::now();
                    let result = checker.dispatch(&domain).await?;
                    Some((index, domain, result, started.elapsed()))
                }
            })
            .buffer_unordered(concurrency)
            .filter_map(future::ready)
            .map(move |(index, domain, result, elapsed)| {
                completed += 1;
                LookupEvent {
                    index,
                    domain,
                    result,
                    completed,
                    total,
                    elapsed,
                }
            });

        Box::pin(stream)
    }

    /// Run a batch and collect the events back into input order.
    pub async fn check_all(&self, domains: Vec<DomainName>) -> Vec<LookupEvent> {
        let mut events: Vec<LookupEvent> = self.run(domains).collect().await;
        events.sort_by_key(|event| event.index);
        events
    }
}

impl Default for DomainChecker {
    fn default() -> Self {
        Self::new()
    }
}
