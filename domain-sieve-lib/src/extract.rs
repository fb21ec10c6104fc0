//! Best-effort field extraction from raw WHOIS responses.
//!
//! WHOIS has no schema. Every registry picks its own key names, date format
//! and layout, so this parser is permissive: it recognizes a family of keys
//! per field, keeps the first usable value, and silently leaves a field
//! unset when nothing matches. It never fails.

use crate::types::WhoisEvidence;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

lazy_static::lazy_static! {
    /// `key: value` with a key that starts with a letter. The key is matched
    /// lazily so values may contain colons (times, URLs).
    static ref KEY_VALUE: Regex =
        Regex::new(r"^\s*([A-Za-z][A-Za-z0-9 ./_()-]*?)\s*:\s*(.*?)\s*$").unwrap();
}

/// Date-time layouts tried after RFC 3339, in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d-%b-%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%Y.%m.%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

/// Date-only layouts, tried last.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d-%b-%Y",
    "%d.%m.%Y",
    "%Y.%m.%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Status,
    Registrar,
    Created,
    Expires,
}

/// Map a normalized key onto the field it feeds, if any.
fn field_for_key(key: &str) -> Option<Field> {
    match key {
        "status" | "domain status" | "state" | "registration status" => Some(Field::Status),
        "registrar" | "sponsoring registrar" | "registrar name" => Some(Field::Registrar),
        "creation date" | "created" | "created on" | "created date" | "registered on"
        | "registration date" | "registration time" => Some(Field::Created),
        "expiry date"
        | "registry expiry date"
        | "registrar registration expiration date"
        | "expiration date"
        | "expires on"
        | "expires"
        | "expire date"
        | "paid-till"
        | "expiration time" => Some(Field::Expires),
        _ => None,
    }
}

fn normalize_key(key: &str) -> String {
    key.replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn is_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with('%') || trimmed.starts_with('#') || trimmed.starts_with(">>>")
}

/// Parse a raw response into an evidence record.
///
/// Multiple status lines accumulate in order; for registrar and dates the
/// first usable value wins. A recognized key with an empty value takes its
/// value from the next indented line (the block layout used by Nominet and
/// a few ccTLD registries).
pub fn extract(raw_text: &str) -> WhoisEvidence {
    let mut evidence = WhoisEvidence {
        raw_text: raw_text.to_string(),
        ..Default::default()
    };

    let mut pending: Option<Field> = None;

    for line in raw_text.lines() {
        if line.trim().is_empty() || is_comment(line) {
            continue;
        }

        if let Some(field) = pending.take() {
            let indented = line.starts_with(char::is_whitespace);
            if indented && !KEY_VALUE.is_match(line) {
                apply(&mut evidence, field, line.trim());
                continue;
            }
        }

        let Some(caps) = KEY_VALUE.captures(line) else {
            continue;
        };
        let Some(field) = field_for_key(&normalize_key(&caps[1])) else {
            continue;
        };

        let value = caps[2].trim();
        if value.is_empty() {
            pending = Some(field);
        } else {
            apply(&mut evidence, field, value);
        }
    }

    evidence
}

fn apply(evidence: &mut WhoisEvidence, field: Field, value: &str) {
    match field {
        Field::Status => {
            let token = strip_urls(value);
            if !token.is_empty() {
                evidence.status_tokens.push(token);
            }
        }
        Field::Registrar => {
            if evidence.registrar.is_none() {
                evidence.registrar = Some(value.to_string());
            }
        }
        Field::Created => {
            if evidence.creation_date.is_none() {
                evidence.creation_date = parse_date(value);
            }
        }
        Field::Expires => {
            if evidence.expiration_date.is_none() {
                evidence.expiration_date = parse_date(value);
            }
        }
    }
}

/// `clientHold https://icann.org/epp#clientHold` -> `clientHold`
fn strip_urls(value: &str) -> String {
    value
        .split_whitespace()
        .take_while(|word| !word.starts_with("http") && !word.starts_with("(http"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a WHOIS date using the first layout that fits.
///
/// Returns `None` for anything unrecognized; callers treat that exactly like
/// a missing field.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = clean_date_value(value);
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = value.trim_end_matches('Z');
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(dt.and_utc());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(naive, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}

/// Drop trailing annotations: `(YYYY-MM-DD)`, `UTC`, `GMT`.
fn clean_date_value(value: &str) -> &str {
    let mut value = value.split('(').next().unwrap_or("").trim();
    for zone in [" UTC", " GMT", " utc", " gmt"] {
        if let Some(stripped) = value.strip_suffix(zone) {
            value = stripped.trim_end();
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    const VERISIGN_STYLE: &str = "   Domain Name: EXAMPLE.COM\r\n\
   Registry Domain ID: 2336799_DOMAIN_COM-VRSN\r\n\
   Registrar WHOIS Server: whois.iana.org\r\n\
   Updated Date: 2024-08-14T07:01:34Z\r\n\
   Creation Date: 1995-08-14T04:00:00Z\r\n\
   Registry Expiry Date: 2025-08-13T04:00:00Z\r\n\
   Registrar: RESERVED-Internet Assigned Numbers Authority\r\n\
   Domain Status: clientDeleteProhibited https://icann.org/epp#clientDeleteProhibited\r\n\
   Domain Status: clientTransferProhibited https://icann.org/epp#clientTransferProhibited\r\n\
>>> Last update of whois database: 2024-10-01T00:00:00Z <<<\r\n";

    const NOMINET_STYLE: &str = "\n    Domain name:\n        example.co.uk\n\n    Registrar:\n        Example Registrar Ltd [Tag = EXAMPLE]\n        URL: https://www.example.net\n\n    Relevant dates:\n        Registered on: 26-Aug-2009\n        Expiry date:  26-Aug-2030\n";

    #[test]
    fn test_extract_icann_record() {
        let evidence = extract(VERISIGN_STYLE);

        assert_eq!(
            evidence.registrar.as_deref(),
            Some("RESERVED-Internet Assigned Numbers Authority")
        );
        assert_eq!(
            evidence.status_tokens,
            vec!["clientDeleteProhibited", "clientTransferProhibited"]
        );
        assert_eq!(
            evidence.creation_date,
            Some(Utc.with_ymd_and_hms(1995, 8, 14, 4, 0, 0).unwrap())
        );
        assert_eq!(
            evidence.expiration_date,
            Some(Utc.with_ymd_and_hms(2025, 8, 13, 4, 0, 0).unwrap())
        );
        assert_eq!(evidence.raw_text, VERISIGN_STYLE);
    }

    #[test]
    fn test_extract_block_layout() {
        let evidence = extract(NOMINET_STYLE);

        assert_eq!(
            evidence.registrar.as_deref(),
            Some("Example Registrar Ltd [Tag = EXAMPLE]")
        );
        assert_eq!(evidence.creation_date.unwrap().year(), 2009);
        assert_eq!(evidence.expiration_date.unwrap().year(), 2030);
    }

    #[test]
    fn test_extract_is_case_insensitive_and_keeps_first_registrar() {
        let raw = "registrar: First Registrar\nREGISTRAR: Second Registrar\nexpiry date: 2030-01-01\n";
        let evidence = extract(raw);

        assert_eq!(evidence.registrar.as_deref(), Some("First Registrar"));
        assert_eq!(
            evidence.expiration_date,
            Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_extract_unparsable_date_left_unset() {
        let evidence = extract("Creation Date: sometime last spring\nRegistrar: X\n");
        assert!(evidence.creation_date.is_none());
        assert_eq!(evidence.registrar.as_deref(), Some("X"));
    }

    #[test]
    fn test_extract_prose_response_has_no_fields() {
        let raw = "No match for \"AB.IO\".\r\n>>> Last update of WHOIS database: 2024-01-01T00:00:00Z <<<\r\n";
        let evidence = extract(raw);

        assert!(!evidence.has_record_fields());
        assert_eq!(evidence.raw_text, raw);
    }

    #[test]
    fn test_extract_skips_comment_lines() {
        let raw = "% status: available\n# registrar: nobody\nstatus: active\n";
        let evidence = extract(raw);
        assert_eq!(evidence.status_tokens, vec!["active"]);
        assert!(evidence.registrar.is_none());
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = Utc.with_ymd_and_hms(2030, 1, 15, 0, 0, 0).unwrap();
        for value in [
            "2030-01-15",
            "2030-01-15T00:00:00Z",
            "2030-01-15T00:00:00.000Z",
            "2030-01-15 00:00:00 UTC",
            "15-Jan-2030",
            "15-jan-2030",
            "15.01.2030",
            "2030.01.15",
            "2030/01/15",
            "15/01/2030",
            "2030-01-15 (YYYY-MM-DD)",
        ] {
            assert_eq!(parse_date(value), Some(expected), "failed on {}", value);
        }

        assert_eq!(
            parse_date("2030-01-15T03:00:00+03:00"),
            Some(expected)
        );
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }
}
