use actix_web::http::header::{CacheControl, CacheDirective};
use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::api::models::{ErrorResponse, HealthStatus, ScreenshotQuery};
use crate::screenshot::{CaptureError, ScreenshotTaker};

/// HTTP handler for full-page screenshot requests
///
/// Validates the query, launches a browser for this request alone, and answers with
/// the stitched PNG.
///
/// # Arguments
/// * `query` - `url` plus optional `w`/`h` viewport overrides
/// * `taker` - Shared capture service
///
/// # Returns
/// * `200 image/png` with the stitched capture
/// * `400` with `{ "error": ... }` for missing or malformed input
/// * `500` with `{ "error": ... }` when no browser is available or the capture fails
#[instrument(skip(taker))]
pub async fn screenshot_handler(
    query: web::Query<ScreenshotQuery>,
    taker: web::Data<Arc<ScreenshotTaker>>,
) -> impl Responder {
    let request = match query.into_inner().validate() {
        Ok(request) => request,
        Err(message) => {
            warn!("Rejected screenshot request: {}", message);
            return HttpResponse::BadRequest().json(ErrorResponse::new(message));
        }
    };

    let viewport = match taker.viewport_for(request.width, request.height) {
        Ok(viewport) => viewport,
        Err(e) => {
            warn!("Rejected viewport override: {}", e);
            return HttpResponse::BadRequest().json(ErrorResponse::new(e.to_string()));
        }
    };

    info!("Received screenshot request for URL: {}", request.url);

    // Runs detached so a dropped connection cannot skip the browser cleanup
    let taker = taker.get_ref().clone();
    let url = request.url.clone();
    let capture = actix_web::rt::spawn(async move { taker.take_screenshot(&url, viewport).await });

    match capture.await {
        Ok(Ok(outcome)) => {
            debug!("Returning {} byte PNG", outcome.image.png.len());
            HttpResponse::Ok()
                .content_type("image/png")
                .insert_header(CacheControl(vec![CacheDirective::NoStore]))
                .insert_header(("Server-Timing", outcome.timings.server_timing()))
                .body(outcome.image.png)
        }
        Ok(Err(e)) => error_response(&e),
        Err(e) => {
            error!("Capture task for {} did not complete: {}", request.url, e);
            HttpResponse::InternalServerError().json(ErrorResponse::new("Capture failed"))
        }
    }
}

fn error_response(e: &CaptureError) -> HttpResponse {
    match e {
        CaptureError::InvalidRequest(message) => {
            HttpResponse::BadRequest().json(ErrorResponse::new(message.clone()))
        }
        e if e.is_environment() => {
            error!("Headless browser unavailable: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse::new("Headless browser unavailable"))
        }
        e => {
            error!("Screenshot request failed: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse::new("Capture failed"))
        }
    }
}

/// Health check endpoint for monitoring service status
///
/// Reports capture slot usage and lifetime counters.
#[instrument(skip(taker))]
pub async fn health_check(taker: web::Data<Arc<ScreenshotTaker>>) -> impl Responder {
    let status = if taker.saturated() { "degraded" } else { "healthy" };
    let active = taker.active_captures();

    debug!("Health check: status={}, active={}/{}", status, active, taker.max_concurrent());
    HttpResponse::Ok().json(HealthStatus {
        status: status.to_string(),
        active_captures: active,
        max_concurrent_captures: taker.max_concurrent(),
        total_captures: taker.total_captures(),
        failed_captures: taker.failed_captures(),
        uptime_secs: taker.uptime().as_secs(),
    })
}
