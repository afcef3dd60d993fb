use serde::Deserialize;
use tokio::time::{sleep, Instant};
use tracing::{debug, trace, warn};

use crate::screenshot::config::IdleConfig;
use crate::screenshot::effort::best_effort;
use crate::screenshot::error::CaptureError;
use crate::screenshot::scripts::{self, PageScript};
use crate::screenshot::session::PageSession;

/// Lifecycle event reported by the in-page network probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkEvent {
    Start,
    Finish,
    Fail,
}

/// Running count of requests the page has started but not yet finished
#[derive(Debug, Default, Clone)]
pub struct InflightTracker {
    inflight: usize,
    started: usize,
}

impl InflightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self) {
        self.inflight += 1;
        self.started += 1;
    }

    /// Finish events for requests started before the probe attached are ignored
    pub fn decrement(&mut self) {
        self.inflight = self.inflight.saturating_sub(1);
    }

    pub fn apply(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::Start => self.increment(),
            NetworkEvent::Finish | NetworkEvent::Fail => self.decrement(),
        }
    }

    pub fn snapshot(&self) -> usize {
        self.inflight
    }

    pub fn total_started(&self) -> usize {
        self.started
    }
}

/// How a soft-idle wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleOutcome {
    /// In-flight count stayed at or under the threshold for the quiet period
    Idle,
    /// The maximum window elapsed first
    TimedOut,
    /// The probe could not be installed; the wait was skipped
    Unavailable,
}

/// Waits until the page's network activity quiets down, within a bounded window.
///
/// Never fails: both a timeout and an unusable probe are reported as outcomes. The
/// in-page probe is detached on every path out of the wait.
pub async fn wait_for_soft_idle<P>(page: &P, config: &IdleConfig) -> IdleOutcome
where
    P: PageSession + ?Sized,
{
    let started = Instant::now();
    if best_effort("attach network probe", page.execute(&PageScript::AttachNetworkProbe))
        .await
        .is_none()
    {
        return IdleOutcome::Unavailable;
    }

    let mut tracker = InflightTracker::new();
    let outcome = watch(page, config, &mut tracker, started).await;

    best_effort("detach network probe", page.execute(&PageScript::DetachNetworkProbe)).await;
    debug!(
        "Soft idle wait finished: {:?} after {:?} ({} requests seen, {} in flight)",
        outcome,
        started.elapsed(),
        tracker.total_started(),
        tracker.snapshot()
    );
    outcome
}

async fn watch<P>(
    page: &P,
    config: &IdleConfig,
    tracker: &mut InflightTracker,
    started: Instant,
) -> IdleOutcome
where
    P: PageSession + ?Sized,
{
    let deadline = started + config.max_window();
    let mut quiet_since: Option<Instant> = None;

    loop {
        match drain(page).await {
            Ok(events) => events.into_iter().for_each(|event| tracker.apply(event)),
            Err(e) => {
                // A navigation away or a closed window; nothing left to observe
                warn!("Network probe drain failed, ending idle wait: {}", e);
                return IdleOutcome::TimedOut;
            }
        }

        let now = Instant::now();
        if tracker.snapshot() <= config.max_inflight {
            let since = *quiet_since.get_or_insert(now);
            if now.duration_since(since) >= config.quiet() {
                return IdleOutcome::Idle;
            }
        } else {
            trace!("{} requests in flight", tracker.snapshot());
            quiet_since = None;
        }

        if now >= deadline {
            return IdleOutcome::TimedOut;
        }
        let remaining = deadline - now;
        sleep(config.poll_interval().min(remaining)).await;
    }
}

async fn drain<P>(page: &P) -> Result<Vec<NetworkEvent>, CaptureError>
where
    P: PageSession + ?Sized,
{
    scripts::run(page, PageScript::DrainNetworkEvents).await
}
