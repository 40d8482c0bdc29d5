//! Domain models for the error log analysis server.

pub mod error_log;

pub use error_log::{
    AnalysisData, ErrorLogMetadataRecord, ErrorLogRecord, HistoryQuery, HistoryResult,
    LogFilters, ResolvedSubmission,
};
