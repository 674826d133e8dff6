/*!
 * Field normalization for raw treatment plan rows
 *
 * Derives the per-record scalar fields the classifier depends on: the plan
 * provider code, the parsed completion dates, and the hygiene flag. Every
 * function here recovers locally - a malformed value becomes a sentinel
 * state, never an error.
 */

use chrono::NaiveDate;

use crate::constants::{HYGIENE_PROVIDER_CODES, NO_CODES_COMPLETED_SENTINEL};
use crate::data_types::{CompletionDate, Flag};

/// Date formats the practice export has been observed to emit
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y",
    "%d-%m-%Y",
];

/// Extract the plan provider: the first entry of the semicolon-delimited
/// provider list. An empty list yields the empty string, which downstream
/// stages treat as "unclassified".
pub fn plan_provider(treatment_providers: &str) -> String {
    treatment_providers
        .split(';')
        .next()
        .unwrap_or("")
        .to_string()
}

/// Parse a completion date column value.
///
/// The literal sentinel "No Codes Completed" maps to `NoCodes`; anything
/// else is tried against the known export formats and falls back to
/// `Invalid` on failure. The two non-date states stay distinct.
pub fn parse_completion_date(raw: &str) -> CompletionDate {
    let raw = raw.trim();
    if raw == NO_CODES_COMPLETED_SENTINEL {
        return CompletionDate::NoCodes;
    }
    match parse_flexible_date(raw) {
        Some(date) => CompletionDate::Date(date),
        None => CompletionDate::Invalid,
    }
}

/// Try each known export date format in turn
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
    }
    None
}

/// Whether the plan's provider is one of the practice's hygienists
pub fn hygiene_flag(plan_provider: &str) -> Flag {
    if plan_provider.is_empty() {
        Flag::Unclassified
    } else if HYGIENE_PROVIDER_CODES.contains(&plan_provider) {
        Flag::Yes
    } else {
        Flag::No
    }
}
