//! Utility functions for candidate validation and word-list loading.
//!
//! This module contains helpers for checking domain prefixes and suffixes,
//! turning a word list into candidate domains, and reading word-list files.

use crate::error::SieveError;
use crate::types::DomainName;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Validate a domain prefix (the part before the suffix).
///
/// Prefixes may contain ASCII letters, digits and hyphens, and cannot start
/// or end with a hyphen. Internationalized names must be given in their
/// punycode (`xn--`) form.
pub fn validate_prefix(prefix: &str) -> Result<(), SieveError> {
    if prefix.is_empty() {
        return Err(SieveError::invalid_domain(prefix, "prefix cannot be empty"));
    }

    if !is_valid_label(prefix) {
        return Err(SieveError::invalid_domain(
            prefix,
            "prefix may only contain ASCII letters, digits and inner hyphens",
        ));
    }

    if prefix.len() > 63 {
        return Err(SieveError::invalid_domain(
            prefix,
            "prefix is longer than 63 characters",
        ));
    }

    Ok(())
}

/// Validate a suffix such as `.io` or `.co.uk`.
pub fn validate_suffix(suffix: &str) -> Result<(), SieveError> {
    let Some(labels) = suffix.strip_prefix('.') else {
        return Err(SieveError::invalid_domain(
            suffix,
            "suffix must start with '.'",
        ));
    };

    let labels_ok = labels
        .split('.')
        .all(|label| is_valid_label(label) && label.len() <= 63);
    if labels.is_empty() || !labels_ok {
        return Err(SieveError::invalid_domain(
            suffix,
            "suffix must be one or more dot-separated labels",
        ));
    }

    Ok(())
}

/// Normalize user input like `io`, `.IO` or ` .io ` into `.io`.
pub fn normalize_suffix(suffix: &str) -> String {
    let trimmed = suffix.trim().to_lowercase();
    if trimmed.starts_with('.') {
        trimmed
    } else {
        format!(".{}", trimmed)
    }
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Candidates built from a word list, plus the words that were rejected.
#[derive(Debug, Default)]
pub struct CandidateBatch {
    pub domains: Vec<DomainName>,
    pub rejected: Vec<(String, SieveError)>,
}

/// Join each word with `suffix`, dropping duplicates and invalid words.
///
/// Input order is preserved (first occurrence wins) so progress indices map
/// back onto the caller's list.
pub fn build_candidates<S: AsRef<str>>(words: &[S], suffix: &str) -> CandidateBatch {
    let mut batch = CandidateBatch::default();
    let mut seen = HashSet::new();

    for word in words {
        let word = word.as_ref().trim();
        if word.is_empty() {
            continue;
        }

        match DomainName::new(word, suffix) {
            Ok(domain) => {
                if seen.insert(domain.clone()) {
                    batch.domains.push(domain);
                }
            }
            Err(e) => batch.rejected.push((word.to_string(), e)),
        }
    }

    batch
}

/// Parse a word list.
///
/// Accepts either a JSON array of strings, or plain text with one word per
/// line where blank lines and `#` comments are ignored.
pub fn parse_word_list(content: &str) -> Vec<String> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        if let Ok(words) = serde_json::from_str::<Vec<String>>(trimmed) {
            return words;
        }
    }

    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read and parse a word-list file.
pub fn load_word_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>, SieveError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        SieveError::file_error(path.to_string_lossy(), format!("Failed to read word list: {}", e))
    })?;

    let words = parse_word_list(&content);
    if words.is_empty() {
        return Err(SieveError::file_error(
            path.to_string_lossy(),
            "No words found in the file",
        ));
    }

    Ok(words)
}
