//! Shared helpers for integration tests.

use std::path::{Path, PathBuf};
use std::time::Duration;

use actix_web::{App, dev::ServiceResponse, test, web};
use error_log_analyzer_lib::api::{self, BodyLimit};
use error_log_analyzer_lib::db::DbPool;
use error_log_analyzer_lib::services::{Analyzer, AnalyzerConfig};
use serde_json::Value;
use tempfile::TempDir;

/// Body limit used by test apps.
pub const TEST_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Fresh in-memory database with migrations applied.
pub async fn create_test_pool() -> DbPool {
    DbPool::in_memory()
        .await
        .expect("Failed to create in-memory database")
}

/// Analyzer config running `program` directly (no script), with temp files in `temp_dir`.
pub fn analyzer_config(program: &Path, temp_dir: &Path) -> AnalyzerConfig {
    AnalyzerConfig {
        program: program.display().to_string(),
        script: None,
        timeout: Duration::from_secs(10),
        max_output_bytes: 1024 * 1024,
        result_file_arg: None,
        working_dir: std::env::current_dir().expect("cwd"),
        default_workspace: None,
        temp_dir: temp_dir.to_path_buf(),
    }
}

/// Analyzer config running a shell script through `/bin/sh`.
///
/// The script sees `$1 $2` = `--log-file <path>`, `$3 $4` = `--workspace <dir>`
/// and, with a hand-off flag configured, `$5 $6` = `<flag> <result path>`.
pub fn script_config(script: &Path, temp_dir: &Path) -> AnalyzerConfig {
    AnalyzerConfig {
        script: Some(script.to_path_buf()),
        ..analyzer_config(Path::new("/bin/sh"), temp_dir)
    }
}

/// Write a shell script standing in for the analyzer.
pub fn write_script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write script");
    path
}

/// Names of files currently in `dir`.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .expect("read temp dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect()
}

/// Create a test app with the full `/api` surface.
pub async fn create_test_app(
    pool: &DbPool,
    analyzer: Analyzer,
) -> impl actix_web::dev::Service<
    actix_http::Request,
    Response = ServiceResponse,
    Error = actix_web::Error,
> {
    test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(analyzer))
            .app_data(web::Data::new(BodyLimit(TEST_BODY_LIMIT)))
            .configure(api::configure_api),
    )
    .await
}

/// An analyzer pointed at a program that does not exist.
pub fn unused_analyzer(temp_dir: &Path) -> Analyzer {
    Analyzer::new(
        analyzer_config(Path::new("/nonexistent/error-log-analyzer"), temp_dir),
        1,
        Duration::from_secs(1),
    )
}

/// Send a request and decode the JSON response.
pub async fn call_json<S>(app: &S, req: actix_http::Request) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

/// Save a submission through the API.
pub async fn save_log<S>(app: &S, submission: Value) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::post()
        .uri("/api/error-log/save")
        .set_json(submission)
        .to_request();
    call_json(app, req).await
}
