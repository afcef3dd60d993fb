pub mod config;
pub mod handlers;
pub mod models;

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::api::config::ServerConfig;
use crate::api::handlers::{health_check, screenshot_handler};
use crate::screenshot::ScreenshotTaker;

/// Registers the HTTP routes; shared by the server and the tests
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/screenshot").route(web::get().to(screenshot_handler)))
        .service(web::resource("/api/screenshot").route(web::get().to(screenshot_handler)))
        .service(web::resource("/health").route(web::get().to(health_check)));
}

/// Builds the capture service described by `config`
pub fn build_taker(config: &ServerConfig) -> Arc<ScreenshotTaker> {
    Arc::new(ScreenshotTaker::new(
        &config.webdriver_url,
        config.headless,
        config.max_concurrent_captures,
        config.capture.clone(),
    ))
}

/// Starts the API server with the specified configuration
///
/// No browser is started up front; every request launches and tears down its own.
///
/// # Arguments
/// * `config` - Validated server configuration
///
/// # Returns
/// * `Result<()>` - Success once the server has shut down, or an error
#[instrument(skip(config), fields(host = %config.host, port = config.port))]
pub async fn start_server(config: ServerConfig) -> Result<()> {
    info!("Starting screenshot API server on {}:{}", config.host, config.port);
    debug!(
        "WebDriver at {}, viewport {}x{}, up to {} concurrent captures",
        config.webdriver_url,
        config.capture.viewport.width,
        config.capture.viewport.height,
        config.max_concurrent_captures
    );

    let taker = build_taker(&config);
    let taker_data = web::Data::new(taker.clone());

    let server = HttpServer::new(move || App::new().app_data(taker_data.clone()).configure(routes))
        .bind((config.host.as_str(), config.port))
        .map_err(|e| {
            error!("Failed to bind to {}:{}: {}", config.host, config.port, e);
            e
        })
        .with_context(|| format!("Failed to bind to {}:{}", config.host, config.port))?;

    let result = server.run().await;

    info!("Server shutting down");
    taker.close();
    result.context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}
