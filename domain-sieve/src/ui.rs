//! Display logic for the domain-sieve CLI.
//!
//! This module handles terminal output: colored result lines with progress
//! counters, the run header, summaries, the suffix catalogue and ledger
//! notices. Uses only the `console` crate.

use console::{pad_str, style, Alignment};
use domain_sieve_lib::{Classification, ErrorKind, LedgerUpdate, LookupEvent, PriceCatalog, PriceOrder};
use std::time::Duration;

use crate::ErrorStats;

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a run.
pub fn print_header(domain_count: usize, suffix: &str, concurrency: usize, price: Option<&str>) {
    println!(
        "{} {} {}",
        style("domain-sieve").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "- Checking {} candidate{} under {}",
            domain_count,
            if domain_count == 1 { "" } else { "s" },
            suffix
        ))
        .dim(),
    );

    let mut meta_parts = vec![format!("Concurrency: {}", concurrency)];
    if let Some(price) = price {
        meta_parts.push(format!("Price: {}", price));
    }
    println!("{}", style(meta_parts.join(" | ")).dim());
    println!();
}

// ── Single result line ───────────────────────────────────────────────────────

/// Format and print one completed lookup with a `[3/8]` progress prefix.
pub fn print_event(event: &LookupEvent, verbose: bool) {
    let padded_domain = pad_str(event.domain.as_str(), 30, Alignment::Left, Some(".."));
    let prefix = style(format!("[{}/{}]", event.completed, event.total)).dim();

    match &event.result {
        Classification::Available => {
            println!(
                "  {} {}  {}",
                prefix,
                style(&padded_domain).white(),
                style("AVAILABLE").green().bold(),
            );
        }
        Classification::Registered => {
            println!(
                "  {} {}  {}",
                prefix,
                style(&padded_domain).white(),
                style("REGISTERED").red().bold(),
            );
        }
        Classification::Error { kind, detail } => {
            println!(
                "  {} {}  {}  {}",
                prefix,
                style(&padded_domain).white(),
                style("ERROR").yellow(),
                style(brief_error(*kind)).dim(),
            );
            if verbose {
                println!("      {} {}", style("└─").dim(), style(detail).dim());
            }
        }
    }

    if verbose {
        println!(
            "      {} Checked in {}ms",
            style("└─").dim(),
            event.elapsed.as_millis(),
        );
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the final summary bar with colored counts.
pub fn print_summary(
    total: usize,
    available: usize,
    registered: usize,
    errors: usize,
    duration: Duration,
) {
    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    println!(
        "  {} domain{} in {:.1}s  {}  {}  {}  {}  {}  {}",
        style(total).bold(),
        if total == 1 { "" } else { "s" },
        duration.as_secs_f64(),
        style("|").dim(),
        style(format!("{} available", available)).green(),
        style("|").dim(),
        style(format!("{} registered", registered)).red(),
        style("|").dim(),
        style(format!("{} errors", errors)).yellow(),
    );
}

/// Note that the run was interrupted before every candidate was dispatched.
pub fn print_cancelled(checked: usize, total: usize) {
    println!(
        "  {}",
        style(format!(
            "Interrupted: {} of {} candidates checked",
            checked, total
        ))
        .yellow()
    );
}

// ── Error summary ────────────────────────────────────────────────────────────

/// Print a categorized error summary using colors.
pub fn print_error_summary(error_stats: &ErrorStats) {
    if !error_stats.has_errors() {
        return;
    }

    println!("  {}", style("Some domains could not be checked:").yellow());

    for (label, domains) in error_stats.categories() {
        if domains.is_empty() {
            continue;
        }
        println!(
            "  {} {} {}: {}",
            style("•").dim(),
            domains.len(),
            label,
            format_list(domains, 5),
        );
    }
}

// ── Ledger ───────────────────────────────────────────────────────────────────

pub fn print_ledger_update(update: &LedgerUpdate) {
    if update.added == 0 {
        println!(
            "  {} {}",
            style("Ledger unchanged:").dim(),
            style(update.path.display()).dim(),
        );
    } else {
        println!(
            "  {} {} new, {} total in {}",
            style("Ledger updated:").green(),
            style(update.added).bold(),
            update.total,
            update.path.display(),
        );
    }
}

// ── Catalogue ────────────────────────────────────────────────────────────────

/// Print the suffix price catalogue, then exit.
pub fn print_suffixes(catalog: &PriceCatalog, order: PriceOrder) {
    let heading = style("Known suffixes:").yellow().bold();
    println!();
    println!("{}", heading);
    println!();

    for (suffix, price) in catalog.entries(order) {
        println!(
            "  {}  {}",
            style(format!("{:<12}", suffix)).green().bold(),
            style(price).cyan(),
        );
    }

    println!();
    println!("Use: domain-sieve <words>... --suffix <suffix>");
}

/// Warn about words that could not form a valid domain.
pub fn print_rejected(rejected: &[(String, domain_sieve_lib::SieveError)]) {
    for (word, error) in rejected {
        eprintln!("{} skipping '{}': {}", style("warning:").yellow(), word, error);
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Short label shown next to an error result.
fn brief_error(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Timeout => "(timeout)",
        ErrorKind::ConnectionFailure => "(network error)",
        ErrorKind::ProtocolParseFailure => "(bad response)",
        ErrorKind::RateLimited => "(rate limited)",
        ErrorKind::Unknown => "(no server)",
    }
}

/// Join up to `max_show` names, then summarize the rest.
fn format_list(domains: &[String], max_show: usize) -> String {
    if domains.len() <= max_show {
        domains.join(", ")
    } else {
        let shown = &domains[..max_show];
        let remaining = domains.len() - max_show;
        format!("{}, ... and {} more", shown.join(", "), remaining)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
