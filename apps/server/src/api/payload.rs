//! Bounded request body reading.

use actix_web::{HttpRequest, http::header, web};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{AppError, AppResult};

/// Maximum request body size in bytes, shared as app data.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimit(pub usize);

/// Read the whole body, failing with `PayloadTooLarge` as soon as it would
/// exceed `limit` bytes. A declared `Content-Length` above the limit is
/// rejected without reading.
pub async fn read_limited(
    req: &HttpRequest,
    mut payload: web::Payload,
    limit: usize,
) -> AppResult<web::BytesMut> {
    let declared = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    if let Some(length) = declared.filter(|&length| length > limit) {
        warn!(
            content_length = length,
            limit, "Rejecting request body by declared length"
        );
        return Err(AppError::PayloadTooLarge(limit));
    }

    let mut body = web::BytesMut::with_capacity(declared.unwrap_or(0).min(limit));
    while let Some(chunk) = payload.next().await {
        let data = chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
        if body.len() + data.len() > limit {
            warn!(limit, "Request body exceeded limit while streaming");
            return Err(AppError::PayloadTooLarge(limit));
        }
        body.extend_from_slice(&data);
    }

    Ok(body)
}

/// Read a bounded body and decode it as JSON.
pub async fn read_json<T: DeserializeOwned>(
    req: &HttpRequest,
    payload: web::Payload,
    limit: usize,
) -> AppResult<T> {
    let body = read_limited(req, payload, limit).await?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::InvalidInput("Request body is empty".to_string()));
    }
    Ok(serde_json::from_slice(&body)?)
}
