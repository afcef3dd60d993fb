use tokio::time::sleep;
use tracing::{debug, warn};

use crate::screenshot::capture::scroll_to;
use crate::screenshot::config::{IdleConfig, PrewarmConfig};
use crate::screenshot::error::CaptureError;
use crate::screenshot::idle::{wait_for_soft_idle, IdleOutcome};
use crate::screenshot::model::ViewportMetrics;
use crate::screenshot::scripts::{self, PageScript};
use crate::screenshot::session::PageSession;

/// Result of one scroll-through
#[derive(Debug, Clone, PartialEq)]
pub struct PrewarmReport {
    pub steps: usize,
    pub reached_bottom: bool,
    pub idle: IdleOutcome,
}

/// Scrolls through the whole page so lazily loaded content is requested before capture.
///
/// Steps down by `step_px` (one viewport by default) until the bottom is reached or
/// `max_steps` runs out, waits for the page to settle, then returns to the top.
pub async fn prewarm_page<P>(
    page: &P,
    config: &PrewarmConfig,
    idle: &IdleConfig,
) -> Result<PrewarmReport, CaptureError>
where
    P: PageSession + ?Sized,
{
    scroll_to(page, 0, 0).await?;
    let mut metrics: ViewportMetrics = scripts::run(page, PageScript::MeasureViewport).await?;
    let mut steps = 0;
    let mut reached_bottom = metrics.at_bottom();

    while !reached_bottom && steps < config.max_steps {
        let dy = config.step_px.unwrap_or(metrics.height).max(1);
        metrics = scripts::run(page, PageScript::ScrollBy { dy }).await?;
        steps += 1;
        sleep(config.step_delay()).await;
        reached_bottom = metrics.at_bottom();
    }

    if !reached_bottom {
        warn!(
            "Prewarm stopped after {} steps at y={} of {}",
            steps, metrics.scroll_y, metrics.content_height
        );
    }

    sleep(config.bottom_settle()).await;
    let outcome = wait_for_soft_idle(page, idle).await;

    scroll_to(page, 0, 0).await?;
    sleep(config.top_settle()).await;

    debug!(
        "Prewarm finished after {} steps (bottom reached: {}, idle: {:?})",
        steps, reached_bottom, outcome
    );
    Ok(PrewarmReport {
        steps,
        reached_bottom,
        idle: outcome,
    })
}
