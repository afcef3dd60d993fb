use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::screenshot::config::{CaptureConfig, MAX_VIEWPORT_EDGE};
use crate::screenshot::error::CaptureError;
use crate::screenshot::model::{CapturedImage, Viewport};
use crate::screenshot::pipeline::capture_url;
use crate::screenshot::session::BrowserSession;
use crate::utils::benchmarking::PhaseTimer;

/// A finished capture together with its phase timings
#[derive(Debug)]
pub struct CaptureOutcome {
    pub image: CapturedImage,
    pub timings: PhaseTimer,
}

/// Launches one browser per request and runs the capture pipeline in it
pub struct ScreenshotTaker {
    webdriver_url: String,
    headless: bool,
    config: Arc<CaptureConfig>,
    permits: Semaphore,
    max_concurrent: usize,
    active_captures: AtomicUsize,
    total_captures: AtomicUsize,
    failed_captures: AtomicUsize,
    started_at: Instant,
}

impl fmt::Debug for ScreenshotTaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenshotTaker")
            .field("webdriver_url", &self.webdriver_url)
            .field("active_captures", &self.active_captures.load(Ordering::Relaxed))
            .field("total_captures", &self.total_captures.load(Ordering::Relaxed))
            .finish()
    }
}

/// Decrements the active counter however the capture ends
struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl ScreenshotTaker {
    pub fn new(
        webdriver_url: &str,
        headless: bool,
        max_concurrent: usize,
        config: CaptureConfig,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        debug!(
            "Creating ScreenshotTaker for {} with up to {} concurrent captures",
            webdriver_url, max_concurrent
        );
        Self {
            webdriver_url: webdriver_url.to_string(),
            headless,
            config: Arc::new(config),
            permits: Semaphore::new(max_concurrent),
            max_concurrent,
            active_captures: AtomicUsize::new(0),
            total_captures: AtomicUsize::new(0),
            failed_captures: AtomicUsize::new(0),
            started_at: Instant::now(),
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Resolves the viewport for a request, applying per-request overrides
    pub fn viewport_for(
        &self,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<Viewport, CaptureError> {
        let viewport = Viewport {
            width: width.unwrap_or(self.config.viewport.width),
            height: height.unwrap_or(self.config.viewport.height),
        };
        for (name, value) in [("w", viewport.width), ("h", viewport.height)] {
            if value == 0 || value > MAX_VIEWPORT_EDGE {
                return Err(CaptureError::InvalidRequest(format!(
                    "{} must be between 1 and {}",
                    name, MAX_VIEWPORT_EDGE
                )));
            }
        }
        Ok(viewport)
    }

    /// Captures the full page at `url` in a browser launched for this call only.
    ///
    /// The browser session is closed on every path out, whether the capture succeeded,
    /// failed during navigation, or failed while stitching.
    #[instrument(skip(self), fields(capture_id = %Uuid::new_v4()))]
    pub async fn take_screenshot(
        &self,
        url: &str,
        viewport: Viewport,
    ) -> Result<CaptureOutcome, CaptureError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| CaptureError::BrowserUnavailable("capture service is shutting down".to_string()))?;

        self.active_captures.fetch_add(1, Ordering::AcqRel);
        let _active = ActiveGuard(&self.active_captures);
        self.total_captures.fetch_add(1, Ordering::AcqRel);

        let result = self.capture_in_new_browser(url, viewport).await;
        match &result {
            Ok(outcome) => info!(
                "Captured {} ({}x{}, {} tiles)\n{}",
                url,
                outcome.image.width,
                outcome.image.height,
                outcome.image.tiles,
                outcome.timings.generate_report()
            ),
            Err(e) => {
                self.failed_captures.fetch_add(1, Ordering::AcqRel);
                error!("Capture of {} failed: {}", url, e);
            }
        }
        result
    }

    async fn capture_in_new_browser(
        &self,
        url: &str,
        viewport: Viewport,
    ) -> Result<CaptureOutcome, CaptureError> {
        let mut timings = PhaseTimer::new();
        let mut launch_viewport = self.config.viewport.clone();
        launch_viewport.width = viewport.width;
        launch_viewport.height = viewport.height;

        let session = timings
            .time(
                "launch",
                BrowserSession::launch(&self.webdriver_url, &launch_viewport, self.headless),
            )
            .await?;
        debug!(session = %session.id(), "Running capture pipeline");

        let result = capture_url(&session, url, viewport, &self.config, &mut timings).await;
        session.close().await;

        result.map(|image| CaptureOutcome { image, timings })
    }

    pub fn active_captures(&self) -> usize {
        self.active_captures.load(Ordering::Acquire)
    }

    pub fn total_captures(&self) -> usize {
        self.total_captures.load(Ordering::Acquire)
    }

    pub fn failed_captures(&self) -> usize {
        self.failed_captures.load(Ordering::Acquire)
    }

    /// Whether every capture slot is taken
    pub fn saturated(&self) -> bool {
        self.permits.available_permits() == 0
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Stops accepting new captures; in-flight ones finish normally
    pub fn close(&self) {
        warn!("ScreenshotTaker closing, new captures will be rejected");
        self.permits.close();
    }
}
