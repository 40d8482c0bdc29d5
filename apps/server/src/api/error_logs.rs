//! Error log API endpoints.

use actix_web::{HttpRequest, HttpResponse, delete, get, post, web};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::api::payload::{BodyLimit, read_json};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::error_log::format_timestamp;
use crate::models::{ErrorLogRecord, HistoryQuery, HistoryResult};
use crate::services::analyzer::{AnalyzeRequest, Analyzer};
use crate::services::extraction::{self, ExtractionSource};

/// Analysis response. `result` and `data` carry the same object.
#[derive(Serialize, ToSchema)]
pub struct AnalyzeResponse {
    pub success: bool,
    #[schema(value_type = Object)]
    pub result: JsonValue,
    #[schema(value_type = Object)]
    pub data: JsonValue,
    pub metadata: AnalysisMetadata,
}

/// Details about how an analysis ran.
#[derive(Serialize, ToSchema)]
pub struct AnalysisMetadata {
    /// Wall-clock analyzer run time in seconds, two decimals (e.g. `"1.23"`).
    pub analysis_duration: String,
    pub timestamp: String,
    pub source: ExtractionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_count: Option<usize>,
    /// Set when the process failed but a result was still recovered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation_failure: Option<String>,
}

/// Save response.
#[derive(Serialize, ToSchema)]
pub struct SaveResponse {
    pub success: bool,
    pub message: String,
    pub data: ErrorLogRecord,
}

/// History response. `result` and `data` carry the same list.
#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    pub success: bool,
    pub result: HistoryResult,
    pub data: HistoryResult,
    pub metadata: HistoryMetadata,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryMetadata {
    /// Number of top-level entries (records, or date groups when grouped).
    pub total: usize,
    pub grouped: bool,
    pub timestamp: String,
}

/// Single record response.
#[derive(Serialize, ToSchema)]
pub struct ErrorLogResponse {
    pub success: bool,
    pub data: ErrorLogRecord,
}

/// Purge response.
#[derive(Serialize, ToSchema)]
pub struct DeleteAllResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "deletedCount")]
    pub deleted_count: u64,
}

/// Configure error log routes.
/// Note: Literal paths must be registered before `/error-log/{id}`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(analyze_error_log)
        .service(save_error_log)
        .service(get_history)
        .service(delete_all_error_logs)
        .service(get_error_log);
}

/// Run the analyzer over a log and return its structured result.
///
/// POST /error-log/analyze
#[utoipa::path(
    post,
    path = "/api/error-log/analyze",
    tag = "Error Logs",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Analysis result", body = AnalyzeResponse),
        (status = 400, description = "No log content or file path", body = crate::error::ErrorResponse),
        (status = 413, description = "Request body too large", body = crate::error::ErrorResponse),
        (status = 500, description = "No JSON result in analyzer output"),
        (status = 503, description = "Too many analyses in progress", body = crate::error::ErrorResponse)
    )
)]
#[post("/error-log/analyze")]
pub async fn analyze_error_log(
    req: HttpRequest,
    payload: web::Payload,
    analyzer: web::Data<Analyzer>,
    limit: web::Data<BodyLimit>,
) -> AppResult<HttpResponse> {
    let request: AnalyzeRequest = read_json(&req, payload, limit.0).await?;
    let output = analyzer.run(&request).await?;

    // Output can be large; scan it off the worker thread.
    let (output, extracted) = tokio::task::spawn_blocking(move || {
        let extracted = extraction::extract(&output);
        (output, extracted)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Extraction task failed: {}", e)))?;
    let extraction =
        extracted.map_err(|diagnostics| AppError::ExtractionFailed(Box::new(diagnostics)))?;

    if let Some(ref failure) = output.failure {
        warn!("Recovered a result despite analyzer failure: {}", failure);
    }
    info!(
        source = ?extraction.source,
        error_count = ?extraction.error_count,
        duration_ms = output.duration.as_millis() as u64,
        "Analysis complete"
    );

    Ok(HttpResponse::Ok().json(AnalyzeResponse {
        success: true,
        data: extraction.result.clone(),
        result: extraction.result,
        metadata: AnalysisMetadata {
            analysis_duration: format!("{:.2}", output.duration.as_secs_f64()),
            timestamp: format_timestamp(&Utc::now()),
            source: extraction.source,
            error_count: extraction.error_count,
            invocation_failure: output.failure.as_ref().map(ToString::to_string),
        },
    }))
}

/// Store an analyzed error log.
///
/// POST /error-log/save
#[utoipa::path(
    post,
    path = "/api/error-log/save",
    tag = "Error Logs",
    request_body(content = Object, description = "Free-form submission; needs log_content or original_log"),
    responses(
        (status = 200, description = "Stored record", body = SaveResponse),
        (status = 400, description = "Invalid submission", body = crate::error::ErrorResponse),
        (status = 413, description = "Request body too large", body = crate::error::ErrorResponse),
        (status = 500, description = "Database error", body = crate::error::ErrorResponse)
    )
)]
#[post("/error-log/save")]
pub async fn save_error_log(
    req: HttpRequest,
    payload: web::Payload,
    pool: web::Data<DbPool>,
    limit: web::Data<BodyLimit>,
) -> AppResult<HttpResponse> {
    let submission: JsonValue = read_json(&req, payload, limit.0).await?;
    let record = pool.create_error_log(&submission).await?;

    Ok(HttpResponse::Ok().json(SaveResponse {
        success: true,
        message: "Error log saved".to_string(),
        data: record,
    }))
}

/// List stored error logs, grouped by date unless asked otherwise.
///
/// GET /error-log/history?groupBy=date&limit=100
#[utoipa::path(
    get,
    path = "/api/error-log/history",
    tag = "Error Logs",
    params(
        ("limit" = Option<u64>, Query, description = "Maximum records (default: 100, max: 1000)"),
        ("groupBy" = Option<String>, Query, description = "`date` to group by day; any other value returns a flat list"),
        ("group_by_date" = Option<String>, Query, description = "`false` or `0` returns a flat list when groupBy is absent"),
        ("system_type" = Option<String>, Query, description = "Filter by system type"),
        ("severity" = Option<String>, Query, description = "Filter by severity"),
        ("error_type" = Option<String>, Query, description = "Filter by error type"),
        ("start_date" = Option<String>, Query, description = "Inclusive lower bound on timestamp"),
        ("end_date" = Option<String>, Query, description = "Inclusive upper bound on timestamp")
    ),
    responses(
        (status = 200, description = "Error log history", body = HistoryResponse),
        (status = 500, description = "Database error", body = crate::error::ErrorResponse)
    )
)]
#[get("/error-log/history")]
pub async fn get_history(
    pool: web::Data<DbPool>,
    query: web::Query<HistoryQuery>,
) -> AppResult<HttpResponse> {
    let grouped = query.group_by_date();
    let history = pool
        .find_error_logs(query.limit(), &query.filters(), grouped)
        .await?;

    Ok(HttpResponse::Ok().json(HistoryResponse {
        success: true,
        metadata: HistoryMetadata {
            total: history.len(),
            grouped: history.is_grouped(),
            timestamp: format_timestamp(&Utc::now()),
        },
        data: history.clone(),
        result: history,
    }))
}

/// Get one error log with its current metadata.
///
/// GET /error-log/{id}
#[utoipa::path(
    get,
    path = "/api/error-log/{id}",
    tag = "Error Logs",
    params(
        ("id" = i32, Path, description = "Error log ID")
    ),
    responses(
        (status = 200, description = "Error log", body = ErrorLogResponse),
        (status = 400, description = "Invalid ID", body = crate::error::ErrorResponse),
        (status = 404, description = "Error log not found", body = crate::error::ErrorResponse)
    )
)]
#[get("/error-log/{id}")]
pub async fn get_error_log(
    pool: web::Data<DbPool>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let raw = path.into_inner();
    let id: i32 = raw
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("Invalid error log id: {}", raw)))?;

    let record = pool
        .find_error_log_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Error log {}", id)))?;

    Ok(HttpResponse::Ok().json(ErrorLogResponse {
        success: true,
        data: record,
    }))
}

/// Delete every stored error log.
///
/// DELETE /error-log/delete-all
#[utoipa::path(
    delete,
    path = "/api/error-log/delete-all",
    tag = "Error Logs",
    responses(
        (status = 200, description = "All error logs deleted", body = DeleteAllResponse),
        (status = 500, description = "Database error", body = crate::error::ErrorResponse)
    )
)]
#[delete("/error-log/delete-all")]
pub async fn delete_all_error_logs(pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let deleted = pool.delete_all_error_logs().await?;

    Ok(HttpResponse::Ok().json(DeleteAllResponse {
        success: true,
        message: format!("Deleted {} error log(s)", deleted),
        deleted_count: deleted,
    }))
}
