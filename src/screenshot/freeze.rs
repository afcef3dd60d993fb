use tracing::debug;

use crate::screenshot::config::FreezeConfig;
use crate::screenshot::effort::best_effort;
use crate::screenshot::scripts::{self, PageScript};
use crate::screenshot::session::PageSession;

/// What the motion freezer managed to do
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FreezeReport {
    pub style_injected: bool,
    pub videos_paused: u64,
    pub players_paused: u64,
    pub svg_nodes_stripped: u64,
    pub gifs_frozen: u64,
    /// Strategies that failed and were skipped
    pub failed: Vec<&'static str>,
}

/// Stops every kind of motion the page can show so repeated captures agree.
///
/// Each strategy runs independently; a failing one is recorded and skipped. Running
/// the freezer again on the same page changes nothing further, since every script
/// checks for its own marker first.
pub async fn freeze_motion_media<P>(page: &P, config: &FreezeConfig) -> FreezeReport
where
    P: PageSession + ?Sized,
{
    let mut report = FreezeReport::default();

    if config.inject_style {
        match step::<bool, _>(page, PageScript::InjectFreezeStyle).await {
            Some(injected) => report.style_injected = injected,
            None => report.failed.push(PageScript::InjectFreezeStyle.name()),
        }
    }

    let counted = [
        (config.pause_video, PageScript::PauseVideos),
        (config.pause_players, PageScript::PauseAnimationPlayers),
        (config.strip_svg_animation, PageScript::StripSvgAnimation),
        (config.freeze_gif, PageScript::FreezeGifs),
    ];
    for (enabled, script) in counted {
        if !enabled {
            continue;
        }
        let Some(count) = step::<u64, _>(page, script).await else {
            report.failed.push(script.name());
            continue;
        };
        match script {
            PageScript::PauseVideos => report.videos_paused = count,
            PageScript::PauseAnimationPlayers => report.players_paused = count,
            PageScript::StripSvgAnimation => report.svg_nodes_stripped = count,
            _ => report.gifs_frozen = count,
        }
    }

    debug!("Motion freeze: {:?}", report);
    report
}

async fn step<T, P>(page: &P, script: PageScript) -> Option<T>
where
    T: serde::de::DeserializeOwned,
    P: PageSession + ?Sized,
{
    best_effort(script.name(), scripts::run(page, script)).await
}
