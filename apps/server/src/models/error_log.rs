//! Error log domain models and DTOs.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use utoipa::ToSchema;

use crate::entity::{error_log, error_log_metadata};
use crate::error::{AppError, AppResult};
use crate::services::field_resolver::FieldResolver;
use crate::services::grouping::DateGroup;

/// Default number of records returned by history queries.
pub const DEFAULT_HISTORY_LIMIT: u64 = 100;
/// Upper bound for the history `limit` parameter.
pub const MAX_HISTORY_LIMIT: u64 = 1000;

/// Render a stored timestamp the way every response does (RFC 3339, millis, `Z`).
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current metadata of an error log.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ErrorLogMetadataRecord {
    pub id: i32,
    pub error_log_id: i32,
    pub error_type: Option<String>,
    pub error_category: Option<String>,
    pub impact_level: Option<String>,
    /// Event time asserted by the producer, stored verbatim.
    pub occurred_at: Option<String>,
    pub system_type: Option<String>,
    pub severity: Option<String>,
    pub resource_type: Option<String>,
    pub service_name: Option<String>,
    pub file_path: Option<String>,
    pub line_number: Option<i32>,
    /// `{root_cause, solutions, prevention, analysis}`.
    #[schema(value_type = Option<Object>)]
    pub analysis_data: Option<JsonValue>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<error_log_metadata::Model> for ErrorLogMetadataRecord {
    fn from(m: error_log_metadata::Model) -> Self {
        Self {
            id: m.id,
            error_log_id: m.error_log_id,
            error_type: m.error_type,
            error_category: m.error_category,
            impact_level: m.impact_level,
            occurred_at: m.occurred_at,
            system_type: m.system_type,
            severity: m.severity,
            resource_type: m.resource_type,
            service_name: m.service_name,
            file_path: m.file_path,
            line_number: m.line_number,
            analysis_data: m.analysis_data,
            created_at: format_timestamp(&m.created_at),
            updated_at: format_timestamp(&m.updated_at),
        }
    }
}

/// A stored error log joined with its current metadata.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ErrorLogRecord {
    pub id: i32,
    pub log_content: String,
    pub log_type: Option<String>,
    /// Original submission payload plus derived fields; always carries `original_log`.
    #[schema(value_type = Option<Object>)]
    pub parsed_data: Option<JsonValue>,
    pub system_type: Option<String>,
    pub severity: Option<String>,
    pub resource_type: Option<String>,
    pub service_name: Option<String>,
    pub file_path: Option<String>,
    pub line_number: Option<i32>,
    pub error_type: Option<String>,
    pub error_category: Option<String>,
    pub timestamp: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub metadata: Option<ErrorLogMetadataRecord>,
}

impl ErrorLogRecord {
    pub fn from_models(
        log: error_log::Model,
        metadata: Option<error_log_metadata::Model>,
    ) -> Self {
        Self {
            id: log.id,
            log_content: log.log_content,
            log_type: log.log_type,
            parsed_data: log.parsed_data,
            system_type: log.system_type,
            severity: log.severity,
            resource_type: log.resource_type,
            service_name: log.service_name,
            file_path: log.file_path,
            line_number: log.line_number,
            error_type: log.error_type,
            error_category: log.error_category,
            timestamp: log.timestamp,
            created_at: format_timestamp(&log.created_at),
            updated_at: format_timestamp(&log.updated_at),
            metadata: metadata.map(Into::into),
        }
    }
}

/// Analysis fields kept on the metadata row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisData {
    #[schema(value_type = Option<Object>)]
    pub root_cause: Option<JsonValue>,
    #[schema(value_type = Vec<Object>)]
    pub solutions: Vec<JsonValue>,
    #[schema(value_type = Vec<Object>)]
    pub prevention: Vec<JsonValue>,
    #[schema(value_type = Option<Object>)]
    pub analysis: Option<JsonValue>,
}

/// A save submission with every canonical field resolved.
///
/// Explicit top-level fields take precedence over the nested payload
/// (`parsed_data`, else `metadata`).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSubmission {
    pub log_content: String,
    pub original_log: String,
    pub log_type: Option<String>,
    pub system_type: Option<String>,
    pub severity: Option<String>,
    pub resource_type: Option<String>,
    pub service_name: Option<String>,
    pub file_path: Option<String>,
    pub line_number: Option<i32>,
    pub error_type: Option<String>,
    pub error_category: Option<String>,
    pub timestamp: Option<String>,
    pub impact_level: Option<String>,
    pub parsed_data: JsonValue,
    pub analysis_data: AnalysisData,
}

impl ResolvedSubmission {
    pub fn from_submission(submission: &JsonValue) -> AppResult<Self> {
        let top = submission.as_object().ok_or_else(|| {
            AppError::InvalidInput("Submission must be a JSON object".to_string())
        })?;

        let nested = ["parsed_data", "metadata"]
            .iter()
            .find_map(|key| top.get(*key).filter(|v| v.is_object()));

        let empty = JsonValue::Object(Map::new());
        let resolver = FieldResolver::new(vec![submission, nested.unwrap_or(&empty)]);

        let resolved_content = resolver.string(&["log_content"]);
        let original_log = resolver
            .string(&["original_log"])
            .or_else(|| resolved_content.clone())
            .ok_or_else(|| {
                AppError::InvalidInput("log_content or original_log is required".to_string())
            })?;
        let log_content = resolved_content.unwrap_or_else(|| original_log.clone());

        let analysis_data = AnalysisData {
            root_cause: resolver.value(&["root_cause"]),
            solutions: resolver.list(&["solutions"]),
            prevention: resolver.list(&["prevention"]),
            analysis: resolver.value(&["analysis"]),
        };

        let mut payload = match nested {
            Some(JsonValue::Object(map)) => map.clone(),
            _ => {
                let mut map = top.clone();
                map.remove("parsed_data");
                map.remove("metadata");
                map
            }
        };
        payload.insert(
            "original_log".to_string(),
            JsonValue::String(original_log.clone()),
        );
        payload.insert(
            "solutions".to_string(),
            JsonValue::Array(analysis_data.solutions.clone()),
        );
        payload.insert(
            "prevention".to_string(),
            JsonValue::Array(analysis_data.prevention.clone()),
        );
        payload.insert(
            "root_cause".to_string(),
            analysis_data.root_cause.clone().unwrap_or(JsonValue::Null),
        );

        Ok(Self {
            log_content,
            original_log,
            log_type: resolver.string(&["log_type"]),
            system_type: resolver.string(&["system_type"]),
            severity: resolver.string(&["severity"]),
            resource_type: resolver.string(&["resource_type", "resource.type"]),
            service_name: resolver.string(&["service_name", "service.name"]),
            file_path: resolver.string(&["file_path", "location.file"]),
            line_number: resolver
                .integer(&["line_number", "location.line"])
                .and_then(|n| i32::try_from(n).ok()),
            error_type: resolver.string(&["error_type", "error.type"]),
            error_category: resolver.string(&["error_category", "error.category"]),
            timestamp: resolver.string(&["timestamp"]),
            impact_level: resolver.string(&["impact_level"]),
            parsed_data: JsonValue::Object(payload),
            analysis_data,
        })
    }
}

/// Filters applied by history queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilters {
    pub system_type: Option<String>,
    pub severity: Option<String>,
    pub error_type: Option<String>,
    /// Inclusive lower bound on `timestamp`.
    pub start_date: Option<String>,
    /// Inclusive upper bound on `timestamp`; a bare date covers the whole day.
    pub end_date: Option<String>,
}

/// Query parameters for the history endpoint.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct HistoryQuery {
    /// Maximum records to return (default: 100, max: 1000).
    #[serde(default)]
    pub limit: Option<u64>,
    /// `date` groups records by day; any other value returns them flat.
    #[serde(default, rename = "groupBy")]
    pub group_by: Option<String>,
    /// `false` or `0` returns records flat when `groupBy` is absent.
    #[serde(default)]
    pub group_by_date: Option<String>,
    #[serde(default)]
    pub system_type: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

impl HistoryQuery {
    pub fn limit(&self) -> u64 {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }

    /// Whether the response should be grouped by date.
    pub fn group_by_date(&self) -> bool {
        match self.group_by.as_deref() {
            Some(group_by) => group_by == "date",
            None => !matches!(self.group_by_date.as_deref(), Some("false") | Some("0")),
        }
    }

    pub fn filters(&self) -> LogFilters {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        LogFilters {
            system_type: non_empty(&self.system_type),
            severity: non_empty(&self.severity),
            error_type: non_empty(&self.error_type),
            start_date: non_empty(&self.start_date),
            end_date: non_empty(&self.end_date),
        }
    }
}

/// History result, flat or grouped by date.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum HistoryResult {
    Flat(Vec<ErrorLogRecord>),
    Grouped(Vec<DateGroup>),
}

impl HistoryResult {
    /// Number of top-level entries (records or date groups).
    pub fn len(&self) -> usize {
        match self {
            Self::Flat(records) => records.len(),
            Self::Grouped(groups) => groups.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self, Self::Grouped(_))
    }
}
