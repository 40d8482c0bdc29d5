//! Error Log Analyzer Server - Main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::path::PathBuf;

use actix_cors::Cors;
use actix_files::{Files, NamedFile};
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, Result as ActixResult, http::header, web};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use error_log_analyzer_lib::api::{self, BodyLimit};
use error_log_analyzer_lib::config::Config;
use error_log_analyzer_lib::db::DbPool;
use error_log_analyzer_lib::error::ErrorResponse;
use error_log_analyzer_lib::middleware::RequestLogger;
use error_log_analyzer_lib::services::Analyzer;

/// Static frontend directory, shared as app data.
#[derive(Clone)]
struct StaticDir(PathBuf);

/// SPA fallback handler - serves index.html for client-side routing.
async fn spa_fallback(req: HttpRequest, dir: web::Data<StaticDir>) -> ActixResult<HttpResponse> {
    if req.path().starts_with("/api/") {
        return Ok(not_found(req).await);
    }
    Ok(NamedFile::open(dir.0.join("index.html"))?.into_response(&req))
}

/// JSON 404 for unknown routes.
async fn not_found(req: HttpRequest) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse {
        success: false,
        error: format!("Route {} {} not found", req.method(), req.path()),
        code: "NOT_FOUND".to_string(),
    })
}

/// Perform health check (for Docker healthcheck).
fn health_check() -> bool {
    Config::from_env().is_ok()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Check for --health-check flag (used by Docker HEALTHCHECK)
    if std::env::args().any(|arg| arg == "--health-check") {
        dotenvy::dotenv().ok();
        std::process::exit(if health_check() { 0 } else { 1 });
    }

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).map_err(std::io::Error::other)?;

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL must point at a persistent database");
            error!("  - In production, ELA_ANALYZER_SCRIPT must exist (or be set empty)");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Error Log Analyzer Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    // Initialize database
    let pool = DbPool::connect(&config.database_url)
        .await
        .map_err(std::io::Error::other)?;
    pool.run_migrations().await.map_err(std::io::Error::other)?;
    info!("Database migrations complete");

    if let Some(ref script) = config.analyzer.script
        && !config.analyzer.resolve_script(script).exists()
    {
        warn!(
            "Analyzer script {} not found; analysis requests will fail until it exists",
            script.display()
        );
    }

    // Prepare shared state
    let bind_address = config.bind_address();
    let body_limit = BodyLimit(config.max_body_size);
    let static_dir = config.static_dir.clone();
    let is_development = config.is_development();
    let analyzer = Analyzer::new(
        config.analyzer.clone(),
        config.max_concurrent_analyses,
        config.analysis_queue_timeout(),
    );

    info!(
        "Analysis limits: {} concurrent, {}s timeout, {}MB body, {}MB output per stream",
        config.max_concurrent_analyses,
        config.analyzer.timeout.as_secs(),
        config.max_body_size / 1024 / 1024,
        config.analyzer.max_output_bytes / 1024 / 1024
    );

    if static_dir.is_some() {
        info!("Static file serving enabled from {:?}", static_dir);
    }

    let worker_count = if is_development {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!(
            "Starting server at http://{} ({} workers)",
            bind_address, cpus
        );
        cpus
    };

    let server = HttpServer::new(move || {
        let cors = if is_development {
            // Permissive CORS for development
            Cors::permissive()
        } else {
            // Restrictive CORS for production (same-origin only)
            Cors::default()
                .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
                .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
                .max_age(3600)
        };

        let mut app = App::new()
            // CORS must be registered before other middleware
            .wrap(cors)
            .wrap(RequestLogger)
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(analyzer.clone()))
            .app_data(web::Data::new(body_limit))
            .configure(api::configure_api);

        if let Some(ref dir) = static_dir {
            app = app
                .app_data(web::Data::new(StaticDir(dir.clone())))
                .service(Files::new("/assets", dir.join("assets")).prefer_utf8(true))
                .default_service(web::route().to(spa_fallback));
        } else {
            app = app.default_service(web::route().to(not_found));
        }

        app
    });

    server
        .workers(worker_count)
        .bind(&bind_address)?
        .run()
        .await
}
