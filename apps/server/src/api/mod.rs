//! API endpoint modules.

pub mod error_logs;
pub mod health;
pub mod openapi;
pub mod payload;

use actix_web::web;

pub use error_logs::configure_routes as configure_error_log_routes;
pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use payload::BodyLimit;

/// Register every `/api` route on a service config.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(configure_health_routes)
            .configure(configure_error_log_routes)
            .service(openapi::openapi_json),
    );
}
