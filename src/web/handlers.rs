use actix_web::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::{error, info, warn};
use serde_json::json;
use uuid::Uuid;

use crate::error::ProxyError;
use crate::upstream::relay;
use crate::web::models::ChatRequest;
use crate::AppState;

// Health check endpoint
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

// Chat relay endpoint
pub async fn chat(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, ProxyError> {
    let relay_id = Uuid::new_v4();

    // Decoded by hand so a malformed body is reported as 500 rather than the extractor's 400
    let request: ChatRequest = serde_json::from_slice(&body).map_err(|e| {
        error!("[{}] Chat API error: invalid request body: {}", relay_id, e);
        ProxyError::Internal(e.to_string())
    })?;

    let credential = data
        .credentials
        .resolve(req.headers())
        .inspect_err(|e| warn!("[{}] Rejecting chat request: {}", relay_id, e))?;

    let upstream = data
        .upstream
        .open_stream(&request, &credential, relay_id)
        .await?;

    info!("[{}] Streaming upstream response to caller", relay_id);

    Ok(HttpResponse::Ok()
        .insert_header((CONTENT_TYPE, "text/event-stream"))
        .insert_header((CACHE_CONTROL, "no-cache"))
        .streaming(relay(upstream, relay_id)))
}
