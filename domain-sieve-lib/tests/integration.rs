// domain-sieve-lib/tests/integration.rs

//! Integration tests for domain-sieve-lib against an in-process WHOIS server

use chrono::Utc;
use domain_sieve_lib::{
    build_candidates, ledger_file_name, record_batch, CheckConfig, Classification, DomainChecker,
    ErrorKind, Ledger, LookupEvent, WhoisServer, WhoisServerTable,
};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

#[derive(Clone)]
enum Reply {
    Text(&'static str),
    /// Answer after a delay
    Slow(&'static str, Duration),
    /// Never answer
    Hang,
}

const NO_MATCH: &str = "No match for domain \"AB.IO\".\r\n\
>>> Last update of WHOIS database: 2025-03-01T12:00:00Z <<<\r\n";

const REGISTERED: &str = "Domain Name: CD.IO\r\n\
Registrar: Example Registrar, Inc.\r\n\
Creation Date: 2015-06-01T00:00:00Z\r\n\
Registry Expiry Date: 2030-01-01T00:00:00Z\r\n\
Domain Status: clientTransferProhibited https://icann.org/epp#clientTransferProhibited\r\n";

const THROTTLED: &str = "Too many requests from your IP, try again later.\r\n";

struct FakeWhois {
    port: u16,
    /// Connections accepted so far
    connections: Arc<AtomicUsize>,
}

/// Start a fake WHOIS server answering per query; unknown queries get NO_MATCH.
async fn spawn_fake_whois(replies: HashMap<&'static str, Reply>) -> FakeWhois {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let replies = Arc::new(replies);
    let connections = Arc::new(AtomicUsize::new(0));
    let accepted = Arc::clone(&connections);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            accepted.fetch_add(1, Ordering::SeqCst);
            let replies = Arc::clone(&replies);
            tokio::spawn(async move {
                let (read_half, mut write_half) = socket.into_split();
                let mut query = String::new();
                if BufReader::new(read_half).read_line(&mut query).await.is_err() {
                    return;
                }

                match replies.get(query.trim()).cloned().unwrap_or(Reply::Text(NO_MATCH)) {
                    Reply::Text(text) => {
                        let _ = write_half.write_all(text.as_bytes()).await;
                    }
                    Reply::Slow(text, delay) => {
                        tokio::time::sleep(delay).await;
                        let _ = write_half.write_all(text.as_bytes()).await;
                    }
                    Reply::Hang => {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                }
            });
        }
    });

    FakeWhois { port, connections }
}

fn checker_for(port: u16, config: CheckConfig) -> DomainChecker {
    let servers =
        WhoisServerTable::empty().with_server(".io", WhoisServer::new("127.0.0.1", port));
    DomainChecker::with_config(config, servers)
}

fn fast_config() -> CheckConfig {
    CheckConfig::default()
        .with_concurrency(4)
        .with_timeout(Duration::from_secs(5))
        .with_rate_limit(None)
}

fn pairs(
    events: &[LookupEvent],
) -> impl Iterator<Item = (&domain_sieve_lib::DomainName, &Classification)> {
    events.iter().map(|event| (&event.domain, &event.result))
}

#[tokio::test]
async fn test_word_list_scenario_fills_ledger_once() {
    let port = spawn_fake_whois(HashMap::from([
        ("ab.io", Reply::Text(NO_MATCH)),
        ("cd.io", Reply::Text(REGISTERED)),
    ]))
    .await
    .port;
    let checker = checker_for(port, fast_config());
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(ledger_file_name("test", ".io"));

    let batch = build_candidates(&["ab", "cd"], ".io");
    let events = checker.check_all(batch.domains.clone()).await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].domain.as_str(), "ab.io");
    assert_eq!(events[0].result, Classification::Available);
    assert_eq!(events[1].domain.as_str(), "cd.io");
    assert_eq!(events[1].result, Classification::Registered);

    let update = tokio_test::assert_ok!(record_batch(&path, pairs(&events), "1", Utc::now()));
    assert_eq!(update.added, 1);
    assert_eq!(update.total, 1);

    let ledger = Ledger::load(&path);
    let recorded: Vec<&str> = ledger.entries().map(|e| e.domain.as_str()).collect();
    assert_eq!(recorded, vec!["ab.io"]);

    // Second run over the same words adds nothing.
    let events = checker.check_all(batch.domains).await;
    let update = tokio_test::assert_ok!(record_batch(&path, pairs(&events), "1", Utc::now()));
    assert_eq!(update.added, 0);
    assert_eq!(update.total, 1);
}

#[tokio::test]
async fn test_timeout_is_error_and_never_recorded() {
    let port = spawn_fake_whois(HashMap::from([("ef.io", Reply::Hang)])).await.port;
    let config = fast_config().with_timeout(Duration::from_millis(300));
    let checker = checker_for(port, config);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.json");

    let batch = build_candidates(&["ef", "gh"], ".io");
    let events = checker.check_all(batch.domains).await;

    assert_eq!(events[0].result.error_kind(), Some(ErrorKind::Timeout));
    assert_eq!(events[1].result, Classification::Available);

    let update = record_batch(&path, pairs(&events), "1", Utc::now()).unwrap();
    assert_eq!(update.added, 1);
    assert!(!Ledger::load(&path).contains("ef.io"));
}

#[tokio::test]
async fn test_throttle_notice_is_rate_limited() {
    let port = spawn_fake_whois(HashMap::from([("ij.io", Reply::Text(THROTTLED))]))
        .await
        .port;
    let checker = checker_for(port, fast_config());

    let domain = domain_sieve_lib::DomainName::new("ij", ".io").unwrap();
    let result = checker.check_domain(&domain).await;
    assert_eq!(result.error_kind(), Some(ErrorKind::RateLimited));
}

#[tokio::test]
async fn test_unmapped_suffix_never_connects() {
    let port = spawn_fake_whois(HashMap::new()).await.port;
    let checker = checker_for(port, fast_config());

    let batch = build_candidates(&["ab"], ".zzz");
    let events = checker.check_all(batch.domains).await;
    assert_eq!(events[0].result.error_kind(), Some(ErrorKind::Unknown));
}

#[tokio::test]
async fn test_events_arrive_in_completion_order() {
    let port = spawn_fake_whois(HashMap::from([
        ("slow.io", Reply::Slow(REGISTERED, Duration::from_millis(400))),
        ("fast.io", Reply::Text(NO_MATCH)),
    ]))
    .await
    .port;
    let checker = checker_for(port, fast_config());

    let batch = build_candidates(&["slow", "fast"], ".io");
    let events: Vec<LookupEvent> = checker.run(batch.domains).collect().await;

    assert_eq!(events[0].domain.as_str(), "fast.io");
    assert_eq!(events[0].index, 1);
    assert_eq!(events[0].completed, 1);
    assert_eq!(events[1].domain.as_str(), "slow.io");
    assert_eq!(events[1].index, 0);
    assert_eq!(events[1].completed, 2);
    assert!(events.iter().all(|e| e.total == 2));
}

#[tokio::test]
async fn test_cancel_stops_dispatch() {
    let slow = Reply::Slow(NO_MATCH, Duration::from_millis(100));
    let port = spawn_fake_whois(HashMap::from([
        ("aa.io", slow.clone()),
        ("bb.io", slow.clone()),
        ("cc.io", slow.clone()),
        ("dd.io", slow),
    ]))
    .await
    .port;
    let checker = checker_for(port, fast_config().with_concurrency(1));
    let cancel = checker.cancel_handle();

    let batch = build_candidates(&["aa", "bb", "cc", "dd"], ".io");
    let mut stream = checker.run(batch.domains);

    let first = stream.next().await.unwrap();
    assert_eq!(first.result, Classification::Available);
    cancel.cancel();

    let mut rest = Vec::new();
    while let Some(event) = stream.next().await {
        rest.push(event);
    }
    assert!(rest.len() < 3, "dispatch continued after cancel");
    assert!(rest.iter().all(|e| e.result.is_available()));
}

#[tokio::test]
async fn test_rate_limit_paces_same_host() {
    let port = spawn_fake_whois(HashMap::new()).await.port;
    let config = fast_config().with_rate_limit(Some(
        domain_sieve_lib::RateLimit::per_second(10.0).with_burst(1),
    ));
    let checker = checker_for(port, config);

    let started = std::time::Instant::now();
    let batch = build_candidates(&["p1", "p2", "p3"], ".io");
    let events = checker.check_all(batch.domains).await;

    assert_eq!(events.len(), 3);
    assert!(started.elapsed() >= Duration::from_millis(180));
}

#[tokio::test]
async fn test_cancel_drops_lookups_waiting_on_rate_limit() {
    let server = spawn_fake_whois(HashMap::new()).await;
    let rate = domain_sieve_lib::RateLimit::per_second(5.0).with_burst(1);
    let config = fast_config().with_concurrency(5).with_rate_limit(Some(rate));
    let checker = checker_for(server.port, config);
    let cancel = checker.cancel_handle();

    let words = ["c1", "c2", "c3", "c4", "c5", "c6", "c7", "c8"];
    let batch = build_candidates(&words, ".io");
    let mut stream = checker.run(batch.domains);

    let first = stream.next().await.unwrap();
    assert_eq!(first.result, Classification::Available);
    cancel.cancel();
    let connections_at_cancel = server.connections.load(Ordering::SeqCst);

    let mut after_cancel = 0;
    while stream.next().await.is_some() {
        after_cancel += 1;
    }

    assert_eq!(connections_at_cancel, 1);
    assert_eq!(server.connections.load(Ordering::SeqCst), connections_at_cancel);
    assert_eq!(after_cancel, 0);
}
