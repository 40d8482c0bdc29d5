//! Integration tests for the `/api` HTTP surface.

use actix_web::{HttpMessage, http::header, test};
use error_log_analyzer_lib::models::{HistoryResult, LogFilters};
use serde_json::json;
use tempfile::TempDir;

use super::test_helpers::{
    TEST_BODY_LIMIT, call_json, create_test_app, create_test_pool, save_log, unused_analyzer,
};

#[actix_rt::test]
async fn test_health_and_ready() {
    let temp = TempDir::new().unwrap();
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, unused_analyzer(temp.path())).await;

    let (status, body) = call_json(&app, test::TestRequest::get().uri("/api/health").to_request()).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");

    let (status, body) = call_json(&app, test::TestRequest::get().uri("/api/ready").to_request()).await;
    assert_eq!(status, 200);
    assert_eq!(body["database"], "connected");
}

#[actix_rt::test]
async fn test_openapi_document_lists_routes() {
    let temp = TempDir::new().unwrap();
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, unused_analyzer(temp.path())).await;

    let (status, body) = call_json(
        &app,
        test::TestRequest::get().uri("/api/openapi.json").to_request(),
    )
    .await;
    assert_eq!(status, 200);
    assert!(body["paths"]["/api/error-log/history"].is_object());
    assert!(body["paths"]["/api/error-log/analyze"].is_object());
}

#[actix_rt::test]
async fn test_save_then_get() {
    let temp = TempDir::new().unwrap();
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, unused_analyzer(temp.path())).await;

    let (status, body) = save_log(
        &app,
        json!({
            "log_content": "ERROR NullPointerException at OrderService.java:57",
            "original_log": "INFO request\nERROR NullPointerException at OrderService.java:57",
            "timestamp": "2024-01-05T10:00:00Z",
            "parsed_data": {
                "severity": "high",
                "system_type": "backend",
                "location": {"file": "OrderService.java", "line": 57}
            }
        }),
    )
    .await;
    assert_eq!(status, 200, "save failed: {}", body);
    assert_eq!(body["success"], true);
    let id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["severity"], "high");
    assert_eq!(body["data"]["line_number"], 57);
    assert_eq!(
        body["data"]["parsed_data"]["original_log"],
        "INFO request\nERROR NullPointerException at OrderService.java:57"
    );
    assert_eq!(body["data"]["metadata"]["occurred_at"], "2024-01-05T10:00:00Z");

    let (status, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/error-log/{}", id))
            .to_request(),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["id"], id);
    assert_eq!(body["data"]["file_path"], "OrderService.java");
    assert!(body["data"]["created_at"].as_str().unwrap().ends_with('Z'));
}

#[actix_rt::test]
async fn test_get_unknown_id_is_404() {
    let temp = TempDir::new().unwrap();
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, unused_analyzer(temp.path())).await;

    let (status, body) = call_json(
        &app,
        test::TestRequest::get().uri("/api/error-log/4242").to_request(),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = call_json(
        &app,
        test::TestRequest::get().uri("/api/error-log/abc").to_request(),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[actix_rt::test]
async fn test_save_rejects_invalid_bodies() {
    let temp = TempDir::new().unwrap();
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, unused_analyzer(temp.path())).await;

    let (status, body) = save_log(&app, json!({"severity": "high"})).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_INPUT");

    let req = test::TestRequest::post()
        .uri("/api/error-log/save")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let (status, body) = call_json(&app, req).await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
}

#[actix_rt::test]
async fn test_oversized_body_rejected_without_write() {
    let temp = TempDir::new().unwrap();
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, unused_analyzer(temp.path())).await;

    let huge = "x".repeat(TEST_BODY_LIMIT + 1024 * 1024);
    let (status, body) = save_log(&app, json!({"log_content": huge})).await;
    assert_eq!(status, 413);
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");

    let stored = pool
        .find_error_logs(100, &LogFilters::default(), false)
        .await
        .unwrap();
    assert!(stored.is_empty());

    let (status, _) = call_json(
        &app,
        test::TestRequest::post()
            .uri("/api/error-log/analyze")
            .set_json(json!({"log_content": "x".repeat(TEST_BODY_LIMIT + 1)}))
            .to_request(),
    )
    .await;
    assert_eq!(status, 413);
    assert!(std::fs::read_dir(temp.path()).unwrap().next().is_none());
}

#[actix_rt::test]
async fn test_oversized_body_without_content_length_rejected_while_streaming() {
    let temp = TempDir::new().unwrap();
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, unused_analyzer(temp.path())).await;

    let body = serde_json::to_vec(&json!({"log_content": "x".repeat(TEST_BODY_LIMIT)})).unwrap();
    let mut req = test::TestRequest::post()
        .uri("/api/error-log/save")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload(body)
        .to_request();
    let _ = req.headers_mut().remove(header::CONTENT_LENGTH);
    assert!(!req.headers().contains_key(header::CONTENT_LENGTH));

    let (status, body) = call_json(&app, req).await;
    assert_eq!(status, 413);
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");

    let stored = pool
        .find_error_logs(100, &LogFilters::default(), false)
        .await
        .unwrap();
    assert!(stored.is_empty());
}

#[actix_rt::test]
async fn test_undeclared_body_within_limit_is_accepted() {
    let temp = TempDir::new().unwrap();
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, unused_analyzer(temp.path())).await;

    let body = serde_json::to_vec(&json!({"log_content": "ERROR disk full"})).unwrap();
    let mut req = test::TestRequest::post()
        .uri("/api/error-log/save")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload(body)
        .to_request();
    let _ = req.headers_mut().remove(header::CONTENT_LENGTH);

    let (status, body) = call_json(&app, req).await;
    assert_eq!(status, 200, "save failed: {}", body);
    assert_eq!(body["data"]["log_content"], "ERROR disk full");
}

#[actix_rt::test]
async fn test_history_timestamp_uses_utc_millis() {
    let temp = TempDir::new().unwrap();
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, unused_analyzer(temp.path())).await;

    let (_, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri("/api/error-log/history")
            .to_request(),
    )
    .await;
    let timestamp = body["metadata"]["timestamp"].as_str().unwrap();
    assert!(timestamp.ends_with('Z'));
    // e.g. 2026-10-19T12:00:00.123Z
    assert_eq!(timestamp.len(), 24);
}

#[actix_rt::test]
async fn test_history_grouped_by_default() {
    let temp = TempDir::new().unwrap();
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, unused_analyzer(temp.path())).await;

    for (content, timestamp) in [
        ("a", "2024-01-05T10:00:00Z"),
        ("b", "2024-01-05T12:00:00Z"),
        ("c", "2024-01-06 08:00:00"),
    ] {
        let (status, _) = save_log(&app, json!({"log_content": content, "timestamp": timestamp})).await;
        assert_eq!(status, 200);
    }

    let (status, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri("/api/error-log/history")
            .to_request(),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["metadata"]["grouped"], true);
    assert_eq!(body["metadata"]["total"], 2);
    assert_eq!(body["result"], body["data"]);

    let groups = body["data"].as_array().unwrap();
    assert_eq!(groups[0]["date"], "2024-01-06");
    assert_eq!(groups[0]["count"], 1);
    assert_eq!(groups[1]["date"], "2024-01-05");
    assert_eq!(groups[1]["count"], 2);
    assert_eq!(groups[1]["errors"][0]["log_content"], "b");
}

#[actix_rt::test]
async fn test_history_flat_and_filtered() {
    let temp = TempDir::new().unwrap();
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, unused_analyzer(temp.path())).await;

    for (content, severity) in [("a", "high"), ("b", "low"), ("c", "high")] {
        save_log(&app, json!({"log_content": content, "severity": severity})).await;
    }

    let (status, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri("/api/error-log/history?groupBy=none&severity=high")
            .to_request(),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["metadata"]["grouped"], false);
    assert_eq!(body["metadata"]["total"], 2);
    let contents: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["log_content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["c", "a"]);

    let (_, body) = call_json(
        &app,
        test::TestRequest::get()
            .uri("/api/error-log/history?group_by_date=false&limit=1")
            .to_request(),
    )
    .await;
    assert_eq!(body["metadata"]["grouped"], false);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[actix_rt::test]
async fn test_delete_all_reports_count() {
    let temp = TempDir::new().unwrap();
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, unused_analyzer(temp.path())).await;

    for i in 0..3 {
        save_log(&app, json!({"log_content": format!("error {}", i)})).await;
    }

    let delete = || {
        test::TestRequest::delete()
            .uri("/api/error-log/delete-all")
            .to_request()
    };

    let (status, body) = call_json(&app, delete()).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["deletedCount"], 3);

    let (_, body) = call_json(&app, delete()).await;
    assert_eq!(body["deletedCount"], 0);

    let history = pool
        .find_error_logs(100, &LogFilters::default(), false)
        .await
        .unwrap();
    assert!(matches!(history, HistoryResult::Flat(ref records) if records.is_empty()));
}

#[actix_rt::test]
async fn test_analyze_requires_input() {
    let temp = TempDir::new().unwrap();
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, unused_analyzer(temp.path())).await;

    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri("/api/error-log/analyze")
            .set_json(json!({"workspace_path": "/srv"}))
            .to_request(),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[actix_rt::test]
async fn test_analyze_missing_program_reports_diagnostics() {
    let temp = TempDir::new().unwrap();
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, unused_analyzer(temp.path())).await;

    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri("/api/error-log/analyze")
            .set_json(json!({"log_content": "ERROR boom"}))
            .to_request(),
    )
    .await;
    assert_eq!(status, 500);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "EXTRACTION_FAILED");
    assert_eq!(body["has_json_start"], false);
    assert_eq!(body["has_json_end"], false);
    assert!(body["stderr_length"].as_u64().unwrap() > 0);
    assert!(body["parse_errors"].is_array());
}

#[cfg(unix)]
#[actix_rt::test]
async fn test_analyze_returns_result_and_metadata() {
    use super::test_helpers::{script_config, write_script};
    use error_log_analyzer_lib::services::Analyzer;
    use std::time::Duration;

    let scripts = TempDir::new().unwrap();
    let temp = TempDir::new().unwrap();
    let script = write_script(
        &scripts,
        "analyzer.sh",
        r#"echo "[INFO] analyzing $2"
echo '<JSON_START>'
echo '{"summary": "pool exhausted", "metadata": {"all_errors": [{"line": 2}, {"line": 9}]}}'
echo '<JSON_END>'"#,
    );
    let analyzer = Analyzer::new(script_config(&script, temp.path()), 2, Duration::from_secs(5));
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, analyzer).await;

    let (status, body) = call_json(
        &app,
        test::TestRequest::post()
            .uri("/api/error-log/analyze")
            .set_json(json!({"log_content": "ERROR pool exhausted\nERROR retry failed"}))
            .to_request(),
    )
    .await;

    assert_eq!(status, 200, "analyze failed: {}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["result"]["summary"], "pool exhausted");
    assert_eq!(body["result"], body["data"]);
    assert_eq!(body["metadata"]["source"], "delimited_block");
    assert_eq!(body["metadata"]["error_count"], 2);
    let duration = body["metadata"]["analysis_duration"].as_str().unwrap();
    let (secs, fraction) = duration.split_once('.').unwrap();
    assert!(secs.parse::<u64>().is_ok());
    assert_eq!(fraction.len(), 2);
    let timestamp = body["metadata"]["timestamp"].as_str().unwrap();
    assert!(timestamp.ends_with('Z'));
    assert!(!timestamp.contains("+00:00"));
    assert!(body["metadata"].get("invocation_failure").is_none());
    assert!(std::fs::read_dir(temp.path()).unwrap().next().is_none());
}

#[actix_rt::test]
async fn test_unknown_api_route_is_404() {
    let temp = TempDir::new().unwrap();
    let pool = create_test_pool().await;
    let app = create_test_app(&pool, unused_analyzer(temp.path())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/nope/missing").to_request(),
    )
    .await;
    assert_eq!(resp.status().as_u16(), 404);
}
