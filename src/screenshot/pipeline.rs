//! The fixed phase sequence for one capture, independent of how the browser is reached.

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::screenshot::capture::capture_grid_and_stitch;
use crate::screenshot::config::{CaptureConfig, NavigationConfig};
use crate::screenshot::effort::best_effort;
use crate::screenshot::error::CaptureError;
use crate::screenshot::idle::wait_for_soft_idle;
use crate::screenshot::model::{CapturedImage, Viewport, ViewportMetrics};
use crate::screenshot::prewarm::prewarm_page;
use crate::screenshot::scripts::{self, PageScript};
use crate::screenshot::session::PageSession;
use crate::utils::benchmarking::PhaseTimer;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs every phase against an already open page session.
///
/// Order: viewport fit, navigate, ready wait, media normalisation, idle wait, prewarm,
/// idle wait, grid capture. Only navigation and the capture itself can fail the call.
pub async fn capture_url<P>(
    page: &P,
    url: &str,
    viewport: Viewport,
    config: &CaptureConfig,
    timer: &mut PhaseTimer,
) -> Result<CapturedImage, CaptureError>
where
    P: PageSession + ?Sized,
{
    timer
        .time("viewport", best_effort("fit viewport", fit_viewport(page, viewport)))
        .await;

    info!("Navigating to {}", url);
    timer.time("navigate", page.navigate(url)).await?;

    let ready = timer
        .time("ready", wait_for_ready_state(page, &config.navigation))
        .await;
    if !ready {
        warn!("Page did not report readyState=complete, continuing anyway");
    }

    if config.navigation.normalize_media {
        timer
            .time("normalize", normalize_media(page, &config.navigation))
            .await;
    }

    timer.time("idle", wait_for_soft_idle(page, &config.idle)).await;

    if config.prewarm.enabled {
        timer
            .time(
                "prewarm",
                best_effort("prewarm", prewarm_page(page, &config.prewarm, &config.idle)),
            )
            .await;
        timer.time("settle", wait_for_soft_idle(page, &config.idle)).await;
    }

    timer.time("capture", capture_grid_and_stitch(page, config)).await
}

/// Sizes the window so the viewport, not the outer window, matches the request
pub async fn fit_viewport<P>(page: &P, viewport: Viewport) -> Result<ViewportMetrics, CaptureError>
where
    P: PageSession + ?Sized,
{
    page.resize_window(viewport.width, viewport.height).await?;
    let metrics: ViewportMetrics = scripts::run(page, PageScript::MeasureViewport).await?;
    if (metrics.width, metrics.height) == (viewport.width, viewport.height) {
        return Ok(metrics);
    }

    let width = compensate(viewport.width, metrics.width);
    let height = compensate(viewport.height, metrics.height);
    debug!(
        "Viewport is {}x{} for a {}x{} window, resizing window to {}x{}",
        metrics.width, metrics.height, viewport.width, viewport.height, width, height
    );
    page.resize_window(width, height).await?;
    scripts::run(page, PageScript::MeasureViewport).await
}

/// Window size that yields `wanted` given the size `got` for a window of `wanted`
fn compensate(wanted: u32, got: u32) -> u32 {
    (i64::from(wanted) * 2 - i64::from(got)).max(1) as u32
}

/// Polls `document.readyState` until it reads `complete` or the bound elapses
pub async fn wait_for_ready_state<P>(page: &P, config: &NavigationConfig) -> bool
where
    P: PageSession + ?Sized,
{
    let deadline = Instant::now() + config.ready_timeout();
    loop {
        match scripts::run::<String, _>(page, PageScript::ReadyState).await {
            Ok(state) if state == "complete" => return true,
            Ok(_) => {}
            Err(e) => {
                warn!("Could not read readyState: {}", e);
                return false;
            }
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(READY_POLL_INTERVAL).await;
    }
}

/// Promotes lazy media to eager loading and waits (bounded) for web fonts
pub async fn normalize_media<P>(page: &P, config: &NavigationConfig)
where
    P: PageSession + ?Sized,
{
    if let Some(promoted) = best_effort(
        "eager load media",
        scripts::run::<u64, _>(page, PageScript::EagerLoadMedia),
    )
    .await
    {
        debug!("Promoted {} lazy element(s) to eager loading", promoted);
    }

    let fonts = PageScript::WaitForFonts {
        timeout_ms: config.fonts_timeout_ms,
    };
    if let Some(false) = best_effort("wait for fonts", scripts::run::<bool, _>(page, fonts)).await {
        debug!("Web fonts were still loading after {} ms", config.fonts_timeout_ms);
    }
}
