//! Persistent record of domains found available.
//!
//! The ledger is a pretty-printed JSON array of
//! `{ "domain", "checked_at", "price" }` objects, one file per
//! source/suffix pair. It only ever grows: a domain already recorded keeps
//! its original entry.

use crate::error::SieveError;
use crate::types::{Classification, DomainName};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// One recorded available domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub domain: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub checked_at: DateTime<Utc>,
    #[serde(default)]
    pub price: String,
}

/// Accept RFC 3339 timestamps as well as offset-less ones, read as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{}': {}", raw, e)))
}

/// Result of folding one batch into a ledger file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerUpdate {
    pub path: PathBuf,
    /// Entries added by this batch
    pub added: usize,
    /// Entries in the ledger afterwards
    pub total: usize,
}

/// In-memory ledger keyed by full domain name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    entries: BTreeMap<String, LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a ledger file.
    ///
    /// A missing file is an empty ledger. So is an unreadable or malformed
    /// one: a warning is logged and the next save replaces it.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read ledger, starting empty");
                return Self::new();
            }
        };

        match serde_json::from_str::<Vec<LedgerEntry>>(&content) {
            Ok(list) => {
                let mut ledger = Self::new();
                for entry in list {
                    ledger.entries.entry(entry.domain.clone()).or_insert(entry);
                }
                ledger
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "malformed ledger, starting empty");
                Self::new()
            }
        }
    }

    /// Add newly available domains.
    ///
    /// Domains already present are skipped, never overwritten, so merging
    /// the same batch twice adds nothing the second time. Returns the number
    /// of entries added.
    pub fn merge<'a, I>(&mut self, domains: I, price: &str, now: DateTime<Utc>) -> usize
    where
        I: IntoIterator<Item = &'a DomainName>,
    {
        let mut added = 0;
        for domain in domains {
            if self.entries.contains_key(domain.as_str()) {
                continue;
            }
            self.entries.insert(
                domain.to_string(),
                LedgerEntry {
                    domain: domain.to_string(),
                    checked_at: now,
                    price: price.to_string(),
                },
            );
            added += 1;
        }
        added
    }

    /// Write the ledger as a JSON array sorted by domain.
    ///
    /// The data goes to a temporary file in the target directory which is
    /// then renamed over `path`, so a failed save leaves the previous file
    /// intact.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SieveError> {
        let path = path.as_ref();
        let fail = |message: String| SieveError::ledger(path.to_string_lossy(), message);

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| fail(format!("cannot create directory: {}", e)))?;

        let mut temp = NamedTempFile::new_in(dir)
            .map_err(|e| fail(format!("cannot create temporary file: {}", e)))?;

        let entries: Vec<&LedgerEntry> = self.entries.values().collect();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut temp, formatter);
        entries
            .serialize(&mut serializer)
            .map_err(|e| fail(format!("cannot serialize: {}", e)))?;
        temp.write_all(b"\n")
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| fail(format!("cannot write: {}", e)))?;

        // Keep the mode of the file being replaced; the temp file is created 0600.
        match fs::metadata(path) {
            Ok(existing) if existing.is_file() => {
                fs::set_permissions(temp.path(), existing.permissions())
                    .map_err(|e| fail(format!("cannot copy permissions: {}", e)))?;
            }
            _ => {}
        }

        temp.persist(path)
            .map_err(|e| fail(format!("cannot replace file: {}", e.error)))?;

        tracing::info!(path = %path.display(), entries = entries.len(), "ledger saved");
        Ok(())
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.entries.contains_key(domain)
    }

    pub fn get(&self, domain: &str) -> Option<&LedgerEntry> {
        self.entries.get(domain)
    }

    /// Entries in domain order.
    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// File name for a source/suffix pair.
///
/// `ledger_file_name("wordlist", ".co.uk")` is
/// `available_domains_wordlist_co_uk.json`.
pub fn ledger_file_name(source: &str, suffix: &str) -> String {
    let suffix = suffix.trim_start_matches('.').replace('.', "_");
    format!("available_domains_{}_{}.json", source, suffix)
}

/// Fold one batch of results into the ledger at `path`.
///
/// Only `Available` results are recorded; errors and registered domains are
/// ignored. The file is rewritten only when something was added.
pub fn record_batch<'a, P, I>(
    path: P,
    results: I,
    price: &str,
    now: DateTime<Utc>,
) -> Result<LedgerUpdate, SieveError>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = (&'a DomainName, &'a Classification)>,
{
    let path = path.as_ref();
    let mut ledger = Ledger::load(path);

    let available = results
        .into_iter()
        .filter(|(_, result)| result.is_available())
        .map(|(domain, _)| domain);
    let added = ledger.merge(available, price, now);

    if added > 0 {
        ledger.save(path)?;
    }

    Ok(LedgerUpdate {
        path: path.to_path_buf(),
        added,
        total: ledger.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn domain(name: &str) -> DomainName {
        DomainName::parse(name).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_ledger_file_name() {
        assert_eq!(
            ledger_file_name("wordlist", ".io"),
            "available_domains_wordlist_io.json"
        );
        assert_eq!(
            ledger_file_name("4letter", ".co.uk"),
            "available_domains_4letter_co_uk.json"
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let batch = vec![domain("ab.io"), domain("cd.io")];
        let mut ledger = Ledger::new();

        assert_eq!(ledger.merge(&batch, "1.000.000", now()), 2);
        let snapshot = ledger.clone();
        assert_eq!(ledger.merge(&batch, "2.000.000", now()), 0);
        assert_eq!(ledger, snapshot);
        assert_eq!(ledger.get("ab.io").unwrap().price, "1.000.000");
    }

    #[test]
    fn test_save_load_round_trip_sorted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");

        let mut ledger = Ledger::new();
        ledger.merge(&[domain("zz.io"), domain("aa.io")], "10", now());
        ledger.save(&path).unwrap();

        let loaded = Ledger::load(&path);
        assert_eq!(loaded, ledger);

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let names: Vec<&str> = raw
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["domain"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["aa.io", "zz.io"]);
    }

    #[test]
    fn test_load_missing_and_corrupt_files_are_empty() {
        let dir = TempDir::new().unwrap();
        assert!(Ledger::load(dir.path().join("absent.json")).is_empty());

        let corrupt = dir.path().join("corrupt.json");
        fs::write(&corrupt, "{ not json").unwrap();
        assert!(Ledger::load(&corrupt).is_empty());
    }

    #[test]
    fn test_load_accepts_offsetless_timestamps() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.json");
        fs::write(
            &path,
            r#"[
    {
        "domain": "ab.io",
        "checked_at": "2024-05-01T09:30:00.123456",
        "price": "3.530.000"
    }
]"#,
        )
        .unwrap();

        let ledger = Ledger::load(&path);
        let entry = ledger.get("ab.io").unwrap();
        assert_eq!(
            entry.checked_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
                + chrono::Duration::microseconds(123456)
        );
        assert_eq!(entry.price, "3.530.000");
    }

    #[test]
    fn test_record_batch_skips_errors_and_registered() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(ledger_file_name("test", ".io"));

        let results = vec![
            (domain("ab.io"), Classification::Available),
            (domain("cd.io"), Classification::Registered),
            (domain("ef.io"), Classification::error(ErrorKind::Timeout, "slow")),
        ];
        let pairs = || results.iter().map(|(d, r)| (d, r));

        let update = record_batch(&path, pairs(), "1", now()).unwrap();
        assert_eq!(update.added, 1);
        assert_eq!(update.total, 1);

        let ledger = Ledger::load(&path);
        assert!(ledger.contains("ab.io"));
        assert!(!ledger.contains("ef.io"));

        let again = record_batch(&path, pairs(), "1", now()).unwrap();
        assert_eq!(again.added, 0);
        assert_eq!(again.total, 1);
    }

    #[test]
    fn test_record_batch_without_hits_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("none.json");
        let results = [(domain("cd.io"), Classification::Registered)];

        let update = record_batch(&path, results.iter().map(|(d, r)| (d, r)), "1", now()).unwrap();
        assert_eq!(update.added, 0);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_save_keeps_existing_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, "[]").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        let mut ledger = Ledger::load(&path);
        ledger.merge(&[domain("ab.io")], "1", now());
        ledger.save(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
        assert!(Ledger::load(&path).contains("ab.io"));
    }

    #[test]
    fn test_failed_save_keeps_previous_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, "[]").unwrap();

        // A directory at the target path cannot be replaced by a file.
        let blocked = dir.path().join("blocked.json");
        fs::create_dir(&blocked).unwrap();

        let mut ledger = Ledger::new();
        ledger.merge(&[domain("ab.io")], "1", now());
        let err = ledger.save(&blocked).unwrap_err();
        assert!(err.is_save_failure());
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
        assert!(blocked.is_dir());
    }
}
