use tracing::{debug, warn};

use crate::screenshot::capture::screenshot_with_retry;
use crate::screenshot::config::{RetryConfig, TilingConfig};
use crate::screenshot::error::CaptureError;
use crate::screenshot::model::{to_device_px, ViewportMetrics};
use crate::screenshot::scripts::{self, PageScript};
use crate::screenshot::session::PageSession;
use crate::screenshot::stitch::png_dimensions;

/// Scroll offsets to visit, and the pixel geometry of the composite they produce
#[derive(Debug, Clone, PartialEq)]
pub struct TilePlan {
    /// Column offsets in CSS pixels
    pub xs: Vec<u32>,
    /// Row offsets in CSS pixels
    pub ys: Vec<u32>,
    pub metrics: ViewportMetrics,
    /// Output pixel size of one tile, measured from a real screenshot
    pub tile_width: u32,
    pub tile_height: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl TilePlan {
    pub fn tile_count(&self) -> usize {
        self.xs.len() * self.ys.len()
    }

    /// Whether the tile cap cut the plan short of the content edge on either axis
    pub fn truncated(&self) -> bool {
        let last_x = self.xs.last().copied().unwrap_or(0);
        let last_y = self.ys.last().copied().unwrap_or(0);
        last_x < max_offset(self.metrics.content_width, self.metrics.width)
            || last_y < max_offset(self.metrics.content_height, self.metrics.height)
    }
}

fn max_offset(content: u32, viewport: u32) -> u32 {
    content.saturating_sub(viewport)
}

/// Distance between two consecutive offsets on one axis, never below one pixel
pub fn step_size(viewport: u32, ratio: f64, max_overlap_px: u32) -> u32 {
    let overlap = (f64::from(viewport) * ratio).floor().max(0.0) as u32;
    let overlap = overlap.min(max_overlap_px);
    viewport.saturating_sub(overlap).max(1)
}

/// Offsets along one axis.
///
/// Starts at 0 and advances by `step`; every offset is clamped to `content - viewport`
/// so the final tile ends exactly on the content edge. Stops once `cap` offsets exist.
pub fn plan_axis(content: u32, viewport: u32, step: u32, cap: usize) -> Vec<u32> {
    let limit = max_offset(content, viewport);
    let step = step.max(1);
    let mut offsets: Vec<u32> = Vec::new();
    let mut position: u32 = 0;

    while offsets.len() < cap {
        let offset = position.min(limit);
        if offsets.last() != Some(&offset) {
            offsets.push(offset);
        }
        if offset >= limit {
            break;
        }
        position = position.saturating_add(step);
    }

    if offsets.is_empty() {
        offsets.push(0);
    }
    offsets
}

/// Column and row offsets for a page, keeping `xs.len() * ys.len() <= max_tiles`
pub fn plan_offsets(metrics: &ViewportMetrics, tiling: &TilingConfig) -> (Vec<u32>, Vec<u32>) {
    let max_tiles = tiling.max_tiles.max(1);
    let step_x = step_size(metrics.width, tiling.overlap_x_ratio, tiling.max_overlap_px);
    let step_y = step_size(metrics.height, tiling.overlap_y_ratio, tiling.max_overlap_px);

    let xs = plan_axis(metrics.content_width, metrics.width, step_x, max_tiles);
    let row_cap = (max_tiles / xs.len()).max(1);
    let ys = plan_axis(metrics.content_height, metrics.height, step_y, row_cap);
    (xs, ys)
}

/// Output size of the composite along one axis.
///
/// The content size in device pixels, but never more than the planned tiles reach: a
/// plan cut short by the tile cap yields a shorter image instead of a blank band.
pub fn canvas_extent(content: u32, last_offset: u32, tile_px: u32, dpr: f64) -> u32 {
    let content_px = to_device_px(f64::from(content), dpr);
    let reach = to_device_px(f64::from(last_offset), dpr).saturating_add(tile_px);
    content_px.min(reach).max(1)
}

/// Measures the page and plans the capture grid.
///
/// Takes one real screenshot to learn the tile size in output pixels, which folds in
/// the device pixel ratio and any rounding the browser applies.
pub async fn plan_tiles<P>(
    page: &P,
    tiling: &TilingConfig,
    retry: &RetryConfig,
) -> Result<TilePlan, CaptureError>
where
    P: PageSession + ?Sized,
{
    let metrics: ViewportMetrics = scripts::run(page, PageScript::MeasureViewport).await?;
    let (xs, ys) = plan_offsets(&metrics, tiling);

    let probe = screenshot_with_retry(page, retry).await?;
    let (tile_width, tile_height) = png_dimensions(&probe)?;

    let dpr = metrics.dpr();
    let expected = (
        to_device_px(f64::from(metrics.width), dpr),
        to_device_px(f64::from(metrics.height), dpr),
    );
    if expected != (tile_width, tile_height) {
        warn!(
            "Probe tile is {}x{}, expected {}x{} from viewport metrics",
            tile_width, tile_height, expected.0, expected.1
        );
    }

    let last_x = xs.last().copied().unwrap_or(0);
    let last_y = ys.last().copied().unwrap_or(0);
    let plan = TilePlan {
        canvas_width: canvas_extent(metrics.content_width, last_x, tile_width, dpr),
        canvas_height: canvas_extent(metrics.content_height, last_y, tile_height, dpr),
        xs,
        ys,
        metrics,
        tile_width,
        tile_height,
    };

    debug!(
        "Planned {}x{} tiles ({} total) for content {}x{} at dpr {}, canvas {}x{}",
        plan.xs.len(),
        plan.ys.len(),
        plan.tile_count(),
        metrics.content_width,
        metrics.content_height,
        dpr,
        plan.canvas_width,
        plan.canvas_height
    );
    if plan.truncated() {
        warn!(
            "Tile cap of {} reached; capture will not cover the whole page",
            tiling.max_tiles
        );
    }
    Ok(plan)
}
