use tokio::time::sleep;
use tracing::{debug, error, info, trace, warn};

use crate::screenshot::config::{CaptureConfig, RetryConfig};
use crate::screenshot::effort::best_effort;
use crate::screenshot::error::CaptureError;
use crate::screenshot::freeze::freeze_motion_media;
use crate::screenshot::model::{to_device_px, CapturedImage, ScrollPosition, ViewportMetrics};
use crate::screenshot::overlay::{
    clear_overlay_marks, mark_hideable_overlays, overlays_hidden_for_row, set_overlays_hidden,
};
use crate::screenshot::planner::{plan_tiles, TilePlan};
use crate::screenshot::scripts::{self, PageScript};
use crate::screenshot::session::PageSession;
use crate::screenshot::stitch::{Compositor, PlacedTile};

/// Takes one viewport screenshot, retrying with a short backoff before giving up
pub async fn screenshot_with_retry<P>(page: &P, retry: &RetryConfig) -> Result<Vec<u8>, CaptureError>
where
    P: PageSession + ?Sized,
{
    let max_attempts = retry.screenshot_retries + 1;
    let mut attempts = 0;
    let mut last_error = None;

    while attempts < max_attempts {
        attempts += 1;
        match page.screenshot().await {
            Ok(png) => {
                trace!("Screenshot captured on attempt {}, {} bytes", attempts, png.len());
                return Ok(png);
            }
            Err(e) => {
                warn!("Screenshot attempt {}/{} failed: {}", attempts, max_attempts, e);
                last_error = Some(e);
                if attempts < max_attempts {
                    sleep(retry.backoff() * attempts).await;
                }
            }
        }
    }

    error!("Screenshot failed after {} attempts", attempts);
    Err(CaptureError::Screenshot {
        attempts,
        reason: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt made".to_string()),
    })
}

pub async fn scroll_to<P>(page: &P, x: u32, y: u32) -> Result<ScrollPosition, CaptureError>
where
    P: PageSession + ?Sized,
{
    scripts::run(page, PageScript::ScrollTo { x, y }).await
}

/// Captures the page tile by tile and stitches the tiles into one PNG.
///
/// Overlay marks are restored and removed on every path out of the grid, including a
/// failed screenshot, so the page is never left with hidden headers.
pub async fn capture_grid_and_stitch<P>(
    page: &P,
    config: &CaptureConfig,
) -> Result<CapturedImage, CaptureError>
where
    P: PageSession + ?Sized,
{
    scroll_to(page, 0, 0).await?;
    sleep(config.tiling.top_settle()).await;

    freeze_motion_media(page, &config.freeze).await;

    let plan = plan_tiles(page, &config.tiling, &config.retry).await?;

    let marked = if config.overlay.enabled {
        best_effort("mark overlays", mark_hideable_overlays(page, &config.overlay))
            .await
            .unwrap_or(0)
    } else {
        0
    };
    debug!("{} overlay element(s) marked hideable", marked);

    let grid = capture_grid(page, &plan, config, marked > 0).await;

    if marked > 0 {
        best_effort("restore overlays", set_overlays_hidden(page, false)).await;
    }
    // marking can fail after tagging some elements
    if config.overlay.enabled {
        best_effort("clear overlay marks", clear_overlay_marks(page)).await;
    }
    let tiles = grid?;

    let measured: Option<ViewportMetrics> =
        best_effort("re-measure content", scripts::run(page, PageScript::MeasureViewport)).await;
    let (final_width, final_height) = final_size(&plan, measured.as_ref());

    let tile_count = tiles.len();
    let expected_tile = (plan.tile_width, plan.tile_height);
    let (canvas_width, canvas_height) = (plan.canvas_width, plan.canvas_height);

    let (png, width, height) = tokio::task::spawn_blocking(move || {
        stitch_tiles(canvas_width, canvas_height, expected_tile, &tiles, final_width, final_height)
    })
    .await
    .map_err(|e| CaptureError::Compositing(e.to_string()))??;

    info!(
        "Stitched {} tile(s) into a {}x{} image ({} bytes)",
        tile_count,
        width,
        height,
        png.len()
    );
    Ok(CapturedImage {
        png,
        width,
        height,
        tiles: tile_count,
    })
}

/// Visits the planned offsets in row-major order and collects positioned screenshots
async fn capture_grid<P>(
    page: &P,
    plan: &TilePlan,
    config: &CaptureConfig,
    toggle_overlays: bool,
) -> Result<Vec<PlacedTile>, CaptureError>
where
    P: PageSession + ?Sized,
{
    let dpr = plan.metrics.dpr();
    let cap = config.tiling.max_tiles;
    let mut tiles = Vec::with_capacity(plan.tile_count().min(cap));

    'rows: for (row, &y) in plan.ys.iter().enumerate() {
        if toggle_overlays {
            let hidden = overlays_hidden_for_row(row);
            best_effort("toggle overlays", set_overlays_hidden(page, hidden)).await;
        }

        for &x in &plan.xs {
            if tiles.len() >= cap {
                warn!("Tile cap of {} reached, stopping capture", cap);
                break 'rows;
            }

            let position = scroll_to(page, x, y).await?;
            if (position.x - f64::from(x)).abs() > 1.0 || (position.y - f64::from(y)).abs() > 1.0 {
                debug!(
                    "Page scrolled to ({}, {}) instead of ({}, {})",
                    position.x, position.y, x, y
                );
            }
            sleep(config.tiling.tile_settle()).await;

            let png = screenshot_with_retry(page, &config.retry).await?;
            tiles.push(PlacedTile {
                x: to_device_px(f64::from(x), dpr),
                y: to_device_px(f64::from(y), dpr),
                png,
            });
        }
    }

    debug!("Captured {} of {} planned tile(s)", tiles.len(), plan.tile_count());
    Ok(tiles)
}

/// Output size after capture: the re-measured content, bounded by the canvas
pub fn final_size(plan: &TilePlan, measured: Option<&ViewportMetrics>) -> (u32, u32) {
    match measured {
        Some(metrics) => {
            let dpr = metrics.dpr();
            (
                to_device_px(f64::from(metrics.content_width), dpr).min(plan.canvas_width),
                to_device_px(f64::from(metrics.content_height), dpr).min(plan.canvas_height),
            )
        }
        None => (plan.canvas_width, plan.canvas_height),
    }
}

fn stitch_tiles(
    canvas_width: u32,
    canvas_height: u32,
    expected_tile: (u32, u32),
    tiles: &[PlacedTile],
    final_width: u32,
    final_height: u32,
) -> Result<(Vec<u8>, u32, u32), CaptureError> {
    let mut compositor = Compositor::new(canvas_width, canvas_height);
    for tile in tiles {
        let size = compositor.place_png(tile)?;
        if size != expected_tile {
            warn!(
                "Tile at ({}, {}) is {}x{}, probe was {}x{}; placing at nominal offset",
                tile.x, tile.y, size.0, size.1, expected_tile.0, expected_tile.1
            );
        }
    }
    compositor.finish(final_width, final_height)
}
