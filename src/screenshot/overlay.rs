//! Fixed and sticky headers.
//!
//! A header pinned to the top of the viewport would otherwise show up once per row of
//! tiles. The first row keeps it (that is what a visitor sees on arrival); every later
//! row hides it. Sticky elements anchored elsewhere in the viewport are left as they are.

use crate::screenshot::config::OverlayConfig;
use crate::screenshot::error::CaptureError;
use crate::screenshot::scripts::{self, PageScript};
use crate::screenshot::session::PageSession;

/// Tags fixed/sticky elements near the top of the viewport as hideable, returning how many
pub async fn mark_hideable_overlays<P>(page: &P, config: &OverlayConfig) -> Result<u64, CaptureError>
where
    P: PageSession + ?Sized,
{
    scripts::run(
        page,
        PageScript::MarkOverlays {
            top_threshold_px: config.top_threshold_px,
            min_area_px: config.min_area_px,
        },
    )
    .await
}

/// Hides or restores every tagged element; restoring puts back the exact inline style
pub async fn set_overlays_hidden<P>(page: &P, hidden: bool) -> Result<u64, CaptureError>
where
    P: PageSession + ?Sized,
{
    scripts::run(page, PageScript::SetOverlaysHidden { hidden }).await
}

/// Restores and removes all overlay tags so the page is left as it was found
pub async fn clear_overlay_marks<P>(page: &P) -> Result<u64, CaptureError>
where
    P: PageSession + ?Sized,
{
    scripts::run(page, PageScript::ClearOverlayMarks).await
}

/// Overlays stay visible only on the first row of tiles
pub fn overlays_hidden_for_row(row: usize) -> bool {
    row > 0
}
