//! OpenAPI documentation configuration.

use actix_web::{HttpResponse, get};
use utoipa::OpenApi;

use crate::{api, error, models, services};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Error Log Analyzer Server",
        version = "0.1.0",
        description = "Analyzes error logs with an external analyzer and stores the results for filtered, date-grouped retrieval"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Error log endpoints
        api::error_logs::analyze_error_log,
        api::error_logs::save_error_log,
        api::error_logs::get_history,
        api::error_logs::get_error_log,
        api::error_logs::delete_all_error_logs,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Analysis
            services::analyzer::AnalyzeRequest,
            services::extraction::ExtractionSource,
            services::extraction::ExtractionDiagnostics,
            api::error_logs::AnalyzeResponse,
            api::error_logs::AnalysisMetadata,
            // Error logs
            models::ErrorLogRecord,
            models::ErrorLogMetadataRecord,
            models::AnalysisData,
            models::HistoryQuery,
            models::HistoryResult,
            services::grouping::DateGroup,
            api::error_logs::SaveResponse,
            api::error_logs::HistoryResponse,
            api::error_logs::HistoryMetadata,
            api::error_logs::ErrorLogResponse,
            api::error_logs::DeleteAllResponse,
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Error Logs", description = "Error log analysis, storage and history")
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI document.
#[get("/openapi.json")]
pub async fn openapi_json() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}
