//! Domain Sieve CLI Application
//!
//! A command-line interface for screening word lists for unregistered
//! domains over WHOIS. Available names are appended to a per-source,
//! per-suffix JSON ledger that survives across runs.

mod ui;

use chrono::Utc;
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, ValueEnum};
use console::style;
use domain_sieve_lib::{
    build_candidates, expand_home, ledger_file_name, load_env_config, load_word_list,
    normalize_suffix, parse_timeout_string, record_batch, validate_suffix, CancelHandle,
    CheckConfig, ConfigManager, DomainChecker, EnvConfig, ErrorKind, FileConfig, LookupEvent,
    PriceCatalog, PriceOrder, RateLimit, WhoisServerTable,
};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Catalogue ordering for --list-suffixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortOrder {
    /// Cheapest first
    Asc,
    /// Most expensive first
    Desc,
}

impl From<SortOrder> for PriceOrder {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => PriceOrder::Ascending,
            SortOrder::Desc => PriceOrder::Descending,
        }
    }
}

/// CLI arguments for domain-sieve
#[derive(Parser, Debug)]
#[command(name = "domain-sieve")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Screen word lists for unregistered domains over WHOIS")]
#[command(
    long_about = "Join each word with a suffix, look the names up over WHOIS and record the available ones.\n\nAvailable domains accumulate in a JSON ledger per source and suffix; re-running never duplicates entries."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Words to check (each becomes <word><suffix>)
    #[arg(value_name = "WORDS", help_heading = "Candidates")]
    pub words: Vec<String>,

    /// Suffix to append, e.g. .io or co.uk
    #[arg(
        short = 's',
        long = "suffix",
        value_name = "SUFFIX",
        help_heading = "Candidates"
    )]
    pub suffix: Option<String>,

    /// Word-list file (JSON array or one word per line)
    #[arg(
        short = 'f',
        long = "file",
        value_name = "FILE",
        help_heading = "Candidates"
    )]
    pub file: Option<String>,

    /// List the known suffixes with prices and exit
    #[arg(long = "list-suffixes", help_heading = "Candidates")]
    pub list_suffixes: bool,

    /// Sort order for --list-suffixes
    #[arg(
        long = "sort",
        value_enum,
        value_name = "ORDER",
        requires = "list_suffixes",
        help_heading = "Candidates"
    )]
    pub sort: Option<SortOrder>,

    /// Ledger source identifier (default: word-list file name, or "custom")
    #[arg(long = "source", value_name = "ID", help_heading = "Ledger")]
    pub source: Option<String>,

    /// Price recorded with new ledger entries (default: catalogue price)
    #[arg(long = "price", value_name = "PRICE", help_heading = "Ledger")]
    pub price: Option<String>,

    /// Directory for ledger files (default: current directory)
    #[arg(long = "ledger-dir", value_name = "DIR", help_heading = "Ledger")]
    pub ledger_dir: Option<String>,

    /// Do not read or write the ledger
    #[arg(long = "no-ledger", help_heading = "Ledger")]
    pub no_ledger: bool,

    /// Output results as a JSON array
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Max concurrent lookups (default: 10, max: 100)
    #[arg(short = 'c', long = "concurrency", help_heading = "Performance")]
    pub concurrency: Option<usize>,

    /// Per-lookup deadline, e.g. 5s, 2m (default: 10s)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// Requests per second per WHOIS server (default: 2)
    #[arg(long = "rate", value_name = "RATE", help_heading = "Performance")]
    pub rate: Option<f64>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Verbose logging and per-lookup details
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// Failed lookups grouped by kind for the end-of-run report
#[derive(Debug, Default)]
pub(crate) struct ErrorStats {
    pub(crate) timeouts: Vec<String>,
    pub(crate) network_errors: Vec<String>,
    pub(crate) bad_responses: Vec<String>,
    pub(crate) rate_limited: Vec<String>,
    pub(crate) unmapped: Vec<String>,
}

impl ErrorStats {
    fn add_error(&mut self, domain: &str, kind: ErrorKind) {
        let bucket = match kind {
            ErrorKind::Timeout => &mut self.timeouts,
            ErrorKind::ConnectionFailure => &mut self.network_errors,
            ErrorKind::ProtocolParseFailure => &mut self.bad_responses,
            ErrorKind::RateLimited => &mut self.rate_limited,
            ErrorKind::Unknown => &mut self.unmapped,
        };
        bucket.push(domain.to_string());
    }

    pub(crate) fn has_errors(&self) -> bool {
        self.categories().iter().any(|(_, domains)| !domains.is_empty())
    }

    pub(crate) fn categories(&self) -> [(&'static str, &[String]); 5] {
        [
            ("timeouts", self.timeouts.as_slice()),
            ("network errors", self.network_errors.as_slice()),
            ("bad responses", self.bad_responses.as_slice()),
            ("rate limited", self.rate_limited.as_slice()),
            ("without a WHOIS server", self.unmapped.as_slice()),
        ]
    }
}

/// Everything a run needs after config files, environment and flags are merged.
#[derive(Debug)]
struct Settings {
    check: CheckConfig,
    ledger_dir: PathBuf,
    servers: WhoisServerTable,
    prices: PriceCatalog,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(args.verbose);

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run_sieve(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Install the stderr log subscriber; `RUST_LOG` overrides the level.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("domain_sieve=debug,domain_sieve_lib=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    // --list-suffixes is self-contained, skip other validation
    if args.list_suffixes {
        return Ok(());
    }

    let Some(suffix) = &args.suffix else {
        return Err("You must specify a suffix with --suffix (e.g. --suffix .io)".to_string());
    };
    validate_suffix(&normalize_suffix(suffix)).map_err(|e| e.to_string())?;

    if args.words.is_empty() && args.file.is_none() {
        return Err("You must specify words or a word-list file with --file".to_string());
    }

    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > 100 {
            return Err("Concurrency must be between 1 and 100".to_string());
        }
    }

    if let Some(timeout) = &args.timeout {
        if parse_timeout_string(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use format like '5s', '30s', '2m'",
                timeout
            ));
        }
    }

    if let Some(rate) = args.rate {
        if !rate.is_finite() || rate <= 0.0 {
            return Err("Rate must be a positive number of requests per second".to_string());
        }
    }

    if let Some(source) = &args.source {
        if !is_valid_source(source) {
            return Err(format!(
                "Invalid source '{}': use letters, digits, '-' or '_'",
                source
            ));
        }
    }

    Ok(())
}

fn is_valid_source(source: &str) -> bool {
    !source.is_empty()
        && source
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

/// Main sieve logic
async fn run_sieve(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let file_config = load_file_config(&args)?;

    if args.list_suffixes {
        let order = args.sort.map(PriceOrder::from).unwrap_or(PriceOrder::Unsorted);
        ui::print_suffixes(&file_config.price_catalog()?, order);
        return Ok(());
    }

    let env_config = load_env_config();
    let settings = build_settings(&args, &file_config, &env_config)?;

    let suffix = normalize_suffix(args.suffix.as_deref().unwrap_or_default());
    let words = collect_words(&args)?;
    let batch = build_candidates(words.as_slice(), &suffix);
    ui::print_rejected(&batch.rejected);

    if batch.domains.is_empty() {
        return Err("No valid candidate domains to check".into());
    }

    let price = args
        .price
        .clone()
        .or_else(|| settings.prices.price_for(&suffix).map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string());

    if settings.servers.server_for(&batch.domains[0]).is_none() {
        tracing::warn!(suffix = %suffix, "no WHOIS server mapped for suffix; every lookup will fail");
    }

    let total = batch.domains.len();
    let concurrency = settings.check.concurrency;
    let checker = DomainChecker::with_config(settings.check, settings.servers);
    install_ctrl_c(checker.cancel_handle());

    if !args.json {
        ui::print_header(total, &suffix, concurrency, Some(&price));
    }

    let start_time = Instant::now();
    let mut stream = checker.run(batch.domains);
    let mut events: Vec<LookupEvent> = Vec::with_capacity(total);

    while let Some(event) = stream.next().await {
        if !args.json {
            ui::print_event(&event, args.verbose);
        }
        events.push(event);
    }

    let duration = start_time.elapsed();
    events.sort_by_key(|event| event.index);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&events)?);
    } else {
        print_report(&events, total, duration, checker.cancel_handle().is_cancelled());
    }

    if !args.no_ledger {
        let source = ledger_source(&args);
        let path = settings.ledger_dir.join(ledger_file_name(&source, &suffix));
        let pairs = events.iter().map(|event| (&event.domain, &event.result));
        let update = record_batch(&path, pairs, &price, Utc::now())?;

        if !args.json {
            ui::print_ledger_update(&update);
        }
    }

    Ok(())
}

fn print_report(events: &[LookupEvent], total: usize, duration: std::time::Duration, cancelled: bool) {
    let mut available = 0;
    let mut registered = 0;
    let mut error_stats = ErrorStats::default();

    for event in events {
        match event.result.error_kind() {
            Some(kind) => error_stats.add_error(event.domain.as_str(), kind),
            None if event.result.is_available() => available += 1,
            None => registered += 1,
        }
    }
    let errors = events.len() - available - registered;

    println!();
    ui::print_summary(events.len(), available, registered, errors, duration);
    if cancelled && events.len() < total {
        ui::print_cancelled(events.len(), total);
    }
    if error_stats.has_errors() {
        println!();
        ui::print_error_summary(&error_stats);
    }
}

/// Stop dispatching new lookups on Ctrl-C.
fn install_ctrl_c(cancel: CancelHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "\n{}",
                style("Interrupted, waiting for lookups in flight...").yellow()
            );
            cancel.cancel();
        }
    });
}

/// Load config: --config, then DS_CONFIG, then automatic discovery.
fn load_file_config(args: &Args) -> Result<FileConfig, Box<dyn std::error::Error>> {
    let config_manager = ConfigManager::new();

    if let Some(explicit_config_path) = &args.config {
        tracing::debug!(path = %explicit_config_path, "using config file from --config");
        let file_config = config_manager
            .load_file(explicit_config_path)
            .map_err(|e| format!("Failed to load config file '{}': {}", explicit_config_path, e))?;
        return Ok(file_config);
    }

    if let Some(env_config_path) = load_env_config().config {
        tracing::debug!(path = %env_config_path, "using config file from DS_CONFIG");
        let file_config = config_manager
            .load_file(&env_config_path)
            .map_err(|e| format!("Failed to load config file '{}': {}", env_config_path, e))?;
        return Ok(file_config);
    }

    Ok(config_manager.discover_and_load()?)
}

/// Merge built-in defaults, config file, environment and CLI flags.
///
/// Precedence order (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables (DS_*)
/// 3. Config file(s)
/// 4. Built-in defaults
fn build_settings(
    args: &Args,
    file_config: &FileConfig,
    env_config: &EnvConfig,
) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut check = CheckConfig::default();
    let mut rate = RateLimit::default();
    let mut ledger_dir = PathBuf::from(".");

    // Step 1: config file
    if let Some(defaults) = &file_config.defaults {
        if let Some(concurrency) = defaults.concurrency {
            check = check.with_concurrency(concurrency);
        }
        if let Some(timeout) = defaults.timeout.as_deref().and_then(parse_timeout_string) {
            check = check.with_timeout(timeout);
        }
        if let Some(per_second) = defaults.rate_limit {
            rate.per_second = per_second;
        }
        if let Some(burst) = defaults.burst {
            rate = rate.with_burst(burst);
        }
        if let Some(dir) = &defaults.ledger_dir {
            ledger_dir = expand_home(dir);
        }
    }

    // Step 2: environment variables
    if let Some(concurrency) = env_config.concurrency {
        check = check.with_concurrency(concurrency);
    }
    if let Some(timeout) = env_config.timeout.as_deref().and_then(parse_timeout_string) {
        check = check.with_timeout(timeout);
    }
    if let Some(per_second) = env_config.rate_limit {
        rate.per_second = per_second;
    }
    if let Some(dir) = &env_config.ledger_dir {
        ledger_dir = expand_home(dir);
    }

    // Step 3: CLI arguments (highest precedence)
    if let Some(concurrency) = args.concurrency {
        check = check.with_concurrency(concurrency);
    }
    if let Some(timeout) = args.timeout.as_deref().and_then(parse_timeout_string) {
        check = check.with_timeout(timeout);
    }
    if let Some(per_second) = args.rate {
        rate.per_second = per_second;
    }
    if let Some(dir) = &args.ledger_dir {
        ledger_dir = expand_home(dir);
    }

    Ok(Settings {
        check: check.with_rate_limit(Some(rate)),
        ledger_dir,
        servers: file_config.server_table()?,
        prices: file_config.price_catalog()?,
    })
}

/// Words from the command line followed by those from --file.
fn collect_words(args: &Args) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut words = args.words.clone();
    if let Some(file) = &args.file {
        words.extend(load_word_list(file)?);
    }
    Ok(words)
}

/// Ledger source id: --source, else the word-list file stem, else "custom".
fn ledger_source(args: &Args) -> String {
    if let Some(source) = &args.source {
        return source.clone();
    }

    args.file
        .as_deref()
        .and_then(|file| Path::new(file).file_stem())
        .map(|stem| {
            stem.to_string_lossy()
                .chars()
                .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
                .collect::<String>()
        })
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "custom".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_sieve_lib::DefaultsConfig;
    use std::time::Duration;

    fn create_test_args() -> Args {
        Args {
            words: vec!["abcd".to_string()],
            suffix: Some(".io".to_string()),
            file: None,
            list_suffixes: false,
            sort: None,
            source: None,
            price: None,
            ledger_dir: None,
            no_ledger: false,
            json: false,
            concurrency: None,
            timeout: None,
            rate: None,
            config: None,
            verbose: false,
        }
    }

    #[test]
    fn test_validate_args_ok() {
        assert!(validate_args(&create_test_args()).is_ok());
    }

    #[test]
    fn test_validate_args_requires_suffix() {
        let mut args = create_test_args();
        args.suffix = None;
        assert!(validate_args(&args).is_err());

        args.list_suffixes = true;
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_rejects_bad_values() {
        let mut args = create_test_args();
        args.suffix = Some(".i o".to_string());
        assert!(validate_args(&args).is_err());

        let mut args = create_test_args();
        args.words.clear();
        assert!(validate_args(&args).is_err());

        let mut args = create_test_args();
        args.concurrency = Some(0);
        assert!(validate_args(&args).is_err());

        let mut args = create_test_args();
        args.timeout = Some("soon".to_string());
        assert!(validate_args(&args).is_err());

        let mut args = create_test_args();
        args.rate = Some(0.0);
        assert!(validate_args(&args).is_err());

        let mut args = create_test_args();
        args.source = Some("../etc".to_string());
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_build_settings_precedence() {
        let file_config = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(5),
                timeout: Some("20s".to_string()),
                rate_limit: Some(1.0),
                burst: Some(3),
                ledger_dir: Some("from-file".to_string()),
            }),
            ..Default::default()
        };
        let env_config = EnvConfig {
            concurrency: Some(8),
            ledger_dir: Some("from-env".to_string()),
            ..Default::default()
        };
        let mut args = create_test_args();
        args.concurrency = Some(12);

        let settings = build_settings(&args, &file_config, &env_config).unwrap();

        assert_eq!(settings.check.concurrency, 12);
        assert_eq!(settings.check.timeout, Duration::from_secs(20));
        assert_eq!(
            settings.check.rate_limit,
            Some(RateLimit::per_second(1.0).with_burst(3))
        );
        assert_eq!(settings.ledger_dir, PathBuf::from("from-env"));
    }

    #[test]
    fn test_build_settings_defaults() {
        let settings =
            build_settings(&create_test_args(), &FileConfig::default(), &EnvConfig::default())
                .unwrap();
        assert_eq!(settings.check, CheckConfig::default());
        assert_eq!(settings.ledger_dir, PathBuf::from("."));
        assert!(settings.servers.contains(".io"));
    }

    #[test]
    fn test_ledger_source() {
        let mut args = create_test_args();
        assert_eq!(ledger_source(&args), "custom");

        args.file = Some("lists/4 letter.json".to_string());
        assert_eq!(ledger_source(&args), "4_letter");

        args.source = Some("curated".to_string());
        assert_eq!(ledger_source(&args), "curated");
    }

    #[test]
    fn test_error_stats_aggregation() {
        let mut stats = ErrorStats::default();
        assert!(!stats.has_errors());

        stats.add_error("a.io", ErrorKind::Timeout);
        stats.add_error("b.io", ErrorKind::RateLimited);
        stats.add_error("c.io", ErrorKind::Timeout);

        assert!(stats.has_errors());
        assert_eq!(stats.timeouts, vec!["a.io", "c.io"]);
        assert_eq!(stats.rate_limited, vec!["b.io"]);
        assert!(stats.unmapped.is_empty());
    }
}
