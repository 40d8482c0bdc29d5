//! Integration tests for running the analyzer process.
//!
//! Shell scripts stand in for the analyzer.

#![cfg(unix)]

use std::path::Path;
use std::time::Duration;

use error_log_analyzer_lib::error::AppError;
use error_log_analyzer_lib::services::analyzer::{OutputStream, execute};
use error_log_analyzer_lib::services::extraction::{self, ExtractionSource};
use error_log_analyzer_lib::services::{AnalyzeRequest, Analyzer, InvocationFailure};
use serde_json::json;
use tempfile::TempDir;

use super::test_helpers::{analyzer_config, dir_entries, script_config, write_script};

fn inline(content: &str) -> AnalyzeRequest {
    AnalyzeRequest {
        log_content: Some(content.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_inline_content_reaches_analyzer_and_temp_file_is_removed() {
    let scripts = TempDir::new().unwrap();
    let temp = TempDir::new().unwrap();
    let script = write_script(
        &scripts,
        "analyzer.sh",
        r#"echo "loading models..." >&2
lines=$(wc -l < "$2" | tr -d ' ')
echo "<JSON_START>{\"lines\": $lines, \"workspace\": \"$4\"}<JSON_END>"
echo "done""#,
    );
    let analyzer = Analyzer::new(script_config(&script, temp.path()), 2, Duration::from_secs(5));

    let request = AnalyzeRequest {
        log_content: Some("INFO start\nERROR timeout\nWARN retry\n".to_string()),
        workspace_path: Some("/srv/project".to_string()),
        ..Default::default()
    };
    let output = analyzer.run(&request).await.unwrap();

    assert!(output.succeeded(), "unexpected failure: {:?}", output.failure);
    assert!(output.stderr.contains("loading models"));
    assert!(dir_entries(temp.path()).is_empty());

    let extraction = extraction::extract(&output).unwrap();
    assert_eq!(extraction.source, ExtractionSource::DelimitedBlock);
    assert_eq!(
        extraction.result,
        json!({"lines": 3, "workspace": "/srv/project"})
    );
}

#[tokio::test]
async fn test_log_file_path_used_directly() {
    let scripts = TempDir::new().unwrap();
    let temp = TempDir::new().unwrap();
    let log_file = scripts.path().join("app.log");
    std::fs::write(&log_file, r#"{"root_cause": "disk full", "errors": [1, 2]}"#).unwrap();
    let script = write_script(&scripts, "analyzer.sh", r#"echo "reading $2"; cat "$2""#);
    let analyzer = Analyzer::new(script_config(&script, temp.path()), 2, Duration::from_secs(5));

    let request = AnalyzeRequest {
        log_file_path: Some(log_file.display().to_string()),
        ..Default::default()
    };
    let output = analyzer.run(&request).await.unwrap();

    let extraction = extraction::extract(&output).unwrap();
    assert_eq!(extraction.source, ExtractionSource::TrailingObject);
    assert_eq!(extraction.result["root_cause"], "disk full");
    assert_eq!(extraction.error_count, Some(2));
}

#[tokio::test]
async fn test_nonzero_exit_keeps_output() {
    let scripts = TempDir::new().unwrap();
    let temp = TempDir::new().unwrap();
    let script = write_script(
        &scripts,
        "analyzer.sh",
        r#"echo '{"partial": true}'; echo "warning: model unavailable" >&2; exit 3"#,
    );
    let analyzer = Analyzer::new(script_config(&script, temp.path()), 2, Duration::from_secs(5));

    let output = analyzer.run(&inline("ERROR x")).await.unwrap();

    assert_eq!(output.failure, Some(InvocationFailure::ExitStatus(Some(3))));
    assert_eq!(
        extraction::extract(&output).unwrap().result,
        json!({"partial": true})
    );
}

#[tokio::test]
async fn test_timeout_returns_partial_output_and_cleans_up() {
    let scripts = TempDir::new().unwrap();
    let temp = TempDir::new().unwrap();
    let script = write_script(&scripts, "analyzer.sh", "echo 'still working'; sleep 5");
    let mut config = script_config(&script, temp.path());
    config.timeout = Duration::from_millis(500);
    let analyzer = Analyzer::new(config, 2, Duration::from_secs(5));

    let output = analyzer.run(&inline("ERROR slow")).await.unwrap();

    assert_eq!(
        output.failure,
        Some(InvocationFailure::TimedOut(Duration::from_millis(500)))
    );
    assert!(output.stdout.contains("still working"));
    assert!(output.duration < Duration::from_secs(5));
    assert!(dir_entries(temp.path()).is_empty());
}

#[tokio::test]
async fn test_output_limit_stops_collection() {
    let scripts = TempDir::new().unwrap();
    let temp = TempDir::new().unwrap();
    let script = write_script(
        &scripts,
        "analyzer.sh",
        "head -c 100000 /dev/zero | tr '\\0' 'x'",
    );
    let mut config = script_config(&script, temp.path());
    config.max_output_bytes = 1000;
    let analyzer = Analyzer::new(config, 2, Duration::from_secs(5));

    let output = analyzer.run(&inline("ERROR noisy")).await.unwrap();

    assert_eq!(
        output.failure,
        Some(InvocationFailure::OutputLimitExceeded {
            stream: OutputStream::Stdout,
            limit: 1000,
        })
    );
    assert_eq!(output.stdout.len(), 1000);
    assert!(dir_entries(temp.path()).is_empty());
}

#[tokio::test]
async fn test_missing_program_is_a_spawn_failure() {
    let temp = TempDir::new().unwrap();
    let analyzer = Analyzer::new(
        analyzer_config(Path::new("/nonexistent/error-log-analyzer"), temp.path()),
        1,
        Duration::from_secs(1),
    );

    let output = analyzer.run(&inline("ERROR x")).await.unwrap();

    assert!(matches!(output.failure, Some(InvocationFailure::Spawn(_))));
    assert!(output.stdout.is_empty());
    assert!(dir_entries(temp.path()).is_empty());

    let diagnostics = extraction::extract(&output).unwrap_err();
    assert!(!diagnostics.has_json_start);
    assert!(diagnostics.stderr_length > 0);
}

#[tokio::test]
async fn test_missing_script_rejected_before_spawn() {
    let temp = TempDir::new().unwrap();
    let config = script_config(Path::new("/nonexistent/mcp-error-log-analyzer.py"), temp.path());
    let analyzer = Analyzer::new(config, 1, Duration::from_secs(1));

    let err = analyzer.run(&inline("ERROR x")).await.unwrap_err();
    assert!(matches!(err, AppError::AnalyzerUnavailable(_)));
}

#[tokio::test]
async fn test_result_file_preferred() {
    let scripts = TempDir::new().unwrap();
    let temp = TempDir::new().unwrap();
    let script = write_script(
        &scripts,
        "analyzer.sh",
        r#"printf '{"from": "file"}' > "$6"
echo 'progress {"from": "stdout"}'"#,
    );
    let mut config = script_config(&script, temp.path());
    config.result_file_arg = Some("--result-file".to_string());
    let analyzer = Analyzer::new(config, 1, Duration::from_secs(5));

    let output = analyzer.run(&inline("ERROR x")).await.unwrap();

    assert_eq!(output.result_file.as_deref(), Some(r#"{"from": "file"}"#));
    let extraction = extraction::extract(&output).unwrap();
    assert_eq!(extraction.source, ExtractionSource::ResultFile);
    assert_eq!(extraction.result, json!({"from": "file"}));
    assert!(dir_entries(temp.path()).is_empty());
}

#[tokio::test]
async fn test_queue_timeout_rejects_excess_requests() {
    let scripts = TempDir::new().unwrap();
    let temp = TempDir::new().unwrap();
    let script = write_script(&scripts, "analyzer.sh", r#"sleep 1; echo '{"ok": true}'"#);
    let analyzer = Analyzer::new(
        script_config(&script, temp.path()),
        1,
        Duration::from_millis(100),
    );

    let request = inline("ERROR x");
    let (first, second) = tokio::join!(analyzer.run(&request), analyzer.run(&request));

    let results = [first, second];
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::ServiceUnavailable(_))))
        .count();
    let completed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(rejected, 1);
    assert_eq!(completed, 1);
}

#[tokio::test]
async fn test_execute_decodes_invalid_utf8_lossily() {
    let temp = TempDir::new().unwrap();
    let analyzer = Analyzer::new(
        analyzer_config(Path::new("/bin/sh"), temp.path()),
        1,
        Duration::from_secs(1),
    );
    let mut invocation = analyzer.build_invocation(Path::new("/dev/null"), None, None);
    invocation.args = vec!["-c".to_string(), r#"printf 'caf\351 {"a": 1}'"#.to_string()];

    let output = execute(&invocation, Duration::from_secs(5), 1024).await;

    assert!(output.succeeded());
    assert!(output.stdout.contains('\u{FFFD}'));
    assert_eq!(
        extraction::extract(&output).unwrap().result,
        json!({"a": 1})
    );
}
