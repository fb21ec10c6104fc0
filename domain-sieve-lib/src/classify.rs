//! Availability classification.
//!
//! A verdict is produced by walking an ordered list of named rules over the
//! extracted evidence; the first rule that fires decides. Rules are pure
//! functions of their input, so each one can be tested in isolation.
//!
//! The heuristics lean towards `Available` when a record looks empty. A
//! registry that redacts registrar and dates for privacy will therefore be
//! reported as available; callers treat `Available` as "worth a closer
//! look", not as a guarantee.

use crate::error::{ClientError, ErrorKind};
use crate::types::{Classification, WhoisEvidence};

/// Phrases servers use when refusing a query for volume reasons.
const RATE_LIMIT_PATTERNS: &[&str] = &[
    "rate limit exceeded",
    "too many requests",
    "try again later",
    "quota exceeded",
    "limit exceeded",
    "throttled",
    "rate-limited",
    "query rate",
];

/// Phrases servers use to say the name has no record.
const NOT_FOUND_PATTERNS: &[&str] = &["no match", "not found", "no data found", "no entries found"];

/// One step of the decision list.
pub struct Rule {
    pub name: &'static str,
    verdict: fn(&WhoisEvidence) -> Option<Classification>,
}

impl Rule {
    /// Apply the rule; `None` means "no opinion, try the next one".
    pub fn apply(&self, evidence: &WhoisEvidence) -> Option<Classification> {
        (self.verdict)(evidence)
    }
}

/// Rules for evidence from a completed exchange, in priority order.
///
/// A failed exchange never reaches these: it is reported as an error before
/// any rule runs.
pub const RULES: &[Rule] = &[
    Rule {
        name: "throttle-notice",
        verdict: throttle_notice,
    },
    Rule {
        name: "status-available",
        verdict: status_available,
    },
    Rule {
        name: "not-found-phrase",
        verdict: not_found_phrase,
    },
    Rule {
        name: "no-registrar-or-creation",
        verdict: no_registrar_or_creation,
    },
    Rule {
        name: "no-expiration",
        verdict: no_expiration,
    },
    Rule {
        name: "registered",
        verdict: registered,
    },
];

fn throttle_notice(evidence: &WhoisEvidence) -> Option<Classification> {
    if evidence.has_record_fields() {
        return None;
    }
    let text = evidence.raw_text.to_lowercase();
    RATE_LIMIT_PATTERNS
        .iter()
        .find(|pattern| text.contains(*pattern))
        .map(|pattern| {
            Classification::error(
                ErrorKind::RateLimited,
                format!("server refused the query ({})", pattern),
            )
        })
}

fn status_available(evidence: &WhoisEvidence) -> Option<Classification> {
    evidence
        .status_tokens
        .iter()
        .any(|token| token.to_lowercase().contains("available"))
        .then_some(Classification::Available)
}

fn not_found_phrase(evidence: &WhoisEvidence) -> Option<Classification> {
    let text = evidence.raw_text.to_lowercase();
    NOT_FOUND_PATTERNS
        .iter()
        .any(|pattern| text.contains(pattern))
        .then_some(Classification::Available)
}

fn no_registrar_or_creation(evidence: &WhoisEvidence) -> Option<Classification> {
    (evidence.registrar.is_none() && evidence.creation_date.is_none())
        .then_some(Classification::Available)
}

fn no_expiration(evidence: &WhoisEvidence) -> Option<Classification> {
    evidence
        .expiration_date
        .is_none()
        .then_some(Classification::Available)
}

fn registered(_: &WhoisEvidence) -> Option<Classification> {
    Some(Classification::Registered)
}

/// Classify the outcome of one lookup.
pub fn classify(outcome: Result<WhoisEvidence, ClientError>) -> Classification {
    let evidence = match outcome {
        Ok(evidence) => evidence,
        Err(e) => {
            tracing::debug!(rule = "client-error", kind = %e.kind, "classified");
            return Classification::error(e.kind, e.detail);
        }
    };

    for rule in RULES {
        if let Some(verdict) = rule.apply(&evidence) {
            tracing::debug!(rule = rule.name, verdict = %verdict, "classified");
            return verdict;
        }
    }

    // The last rule always fires.
    Classification::Registered
}
