//! Date bucketing of error log records.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::ErrorLogRecord;

static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid"));

/// Records sharing one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DateGroup {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub errors: Vec<ErrorLogRecord>,
    pub count: usize,
}

/// The timestamp a record is known by: `timestamp`, then current metadata
/// `occurred_at`, then `created_at`. Empty strings are skipped.
pub fn effective_timestamp(record: &ErrorLogRecord) -> &str {
    record
        .timestamp
        .as_deref()
        .filter(|t| !t.is_empty())
        .or_else(|| {
            record
                .metadata
                .as_ref()
                .and_then(|m| m.occurred_at.as_deref())
                .filter(|t| !t.is_empty())
        })
        .unwrap_or(&record.created_at)
}

/// Reduce a timestamp string to its date part, if it has a well-formed one.
///
/// Splits at the first `T`, else at the first space, else keeps the first
/// ten characters.
pub fn normalize_date(timestamp: &str) -> Option<&str> {
    let candidate = if let Some((date, _)) = timestamp.split_once('T') {
        date
    } else if let Some((date, _)) = timestamp.split_once(' ') {
        date
    } else {
        match timestamp.char_indices().nth(10) {
            Some((idx, _)) => &timestamp[..idx],
            None => timestamp,
        }
    };

    DATE.is_match(candidate).then_some(candidate)
}

fn record_date(record: &ErrorLogRecord) -> String {
    normalize_date(effective_timestamp(record))
        .or_else(|| normalize_date(&record.created_at))
        .unwrap_or(&record.created_at)
        .to_string()
}

/// Bucket records by date, newest date first. Within a bucket records are
/// ordered newest first by their effective timestamp; ties keep input order.
pub fn group_by_date(records: Vec<ErrorLogRecord>) -> Vec<DateGroup> {
    let mut buckets: BTreeMap<String, Vec<ErrorLogRecord>> = BTreeMap::new();
    for record in records {
        buckets.entry(record_date(&record)).or_default().push(record);
    }

    buckets
        .into_iter()
        .rev()
        .map(|(date, mut errors)| {
            errors.sort_by(|a, b| effective_timestamp(b).cmp(effective_timestamp(a)));
            DateGroup {
                date,
                count: errors.len(),
                errors,
            }
        })
        .collect()
}
