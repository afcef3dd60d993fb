//! Named in-page operations.
//!
//! Every piece of JavaScript the pipeline runs inside the target page lives here as a
//! variant of [`PageScript`]. The bodies are WebDriver "execute script" function bodies:
//! arguments arrive through `arguments[n]` and asynchronous scripts report through the
//! trailing callback.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::screenshot::error::CaptureError;
use crate::screenshot::session::PageSession;

/// Version stamped into every marker the scripts leave in the page
pub const SCRIPT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageScript {
    MeasureViewport,
    ScrollTo { x: u32, y: u32 },
    ScrollBy { dy: u32 },
    ReadyState,
    WaitForFonts { timeout_ms: u64 },
    EagerLoadMedia,
    InjectFreezeStyle,
    PauseVideos,
    PauseAnimationPlayers,
    StripSvgAnimation,
    FreezeGifs,
    MarkOverlays { top_threshold_px: u32, min_area_px: u32 },
    SetOverlaysHidden { hidden: bool },
    ClearOverlayMarks,
    AttachNetworkProbe,
    DrainNetworkEvents,
    DetachNetworkProbe,
}

impl PageScript {
    pub fn name(&self) -> &'static str {
        match self {
            PageScript::MeasureViewport => "measure_viewport",
            PageScript::ScrollTo { .. } => "scroll_to",
            PageScript::ScrollBy { .. } => "scroll_by",
            PageScript::ReadyState => "ready_state",
            PageScript::WaitForFonts { .. } => "wait_for_fonts",
            PageScript::EagerLoadMedia => "eager_load_media",
            PageScript::InjectFreezeStyle => "inject_freeze_style",
            PageScript::PauseVideos => "pause_videos",
            PageScript::PauseAnimationPlayers => "pause_animation_players",
            PageScript::StripSvgAnimation => "strip_svg_animation",
            PageScript::FreezeGifs => "freeze_gifs",
            PageScript::MarkOverlays { .. } => "mark_overlays",
            PageScript::SetOverlaysHidden { .. } => "set_overlays_hidden",
            PageScript::ClearOverlayMarks => "clear_overlay_marks",
            PageScript::AttachNetworkProbe => "attach_network_probe",
            PageScript::DrainNetworkEvents => "drain_network_events",
            PageScript::DetachNetworkProbe => "detach_network_probe",
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            PageScript::MeasureViewport => include_str!("scripts/measure_viewport.js"),
            PageScript::ScrollTo { .. } => include_str!("scripts/scroll_to.js"),
            PageScript::ScrollBy { .. } => include_str!("scripts/scroll_by.js"),
            PageScript::ReadyState => include_str!("scripts/ready_state.js"),
            PageScript::WaitForFonts { .. } => include_str!("scripts/wait_for_fonts.js"),
            PageScript::EagerLoadMedia => include_str!("scripts/eager_load_media.js"),
            PageScript::InjectFreezeStyle => include_str!("scripts/inject_freeze_style.js"),
            PageScript::PauseVideos => include_str!("scripts/pause_videos.js"),
            PageScript::PauseAnimationPlayers => include_str!("scripts/pause_animation_players.js"),
            PageScript::StripSvgAnimation => include_str!("scripts/strip_svg_animation.js"),
            PageScript::FreezeGifs => include_str!("scripts/freeze_gifs.js"),
            PageScript::MarkOverlays { .. } => include_str!("scripts/mark_overlays.js"),
            PageScript::SetOverlaysHidden { .. } => include_str!("scripts/set_overlays_hidden.js"),
            PageScript::ClearOverlayMarks => include_str!("scripts/clear_overlay_marks.js"),
            PageScript::AttachNetworkProbe => include_str!("scripts/attach_network_probe.js"),
            PageScript::DrainNetworkEvents => include_str!("scripts/drain_network_events.js"),
            PageScript::DetachNetworkProbe => include_str!("scripts/detach_network_probe.js"),
        }
    }

    pub fn args(&self) -> Vec<Value> {
        match *self {
            PageScript::ScrollTo { x, y } => vec![json!(x), json!(y)],
            PageScript::ScrollBy { dy } => vec![json!(dy)],
            PageScript::WaitForFonts { timeout_ms } => vec![json!(timeout_ms)],
            PageScript::MarkOverlays {
                top_threshold_px,
                min_area_px,
            } => vec![json!(top_threshold_px), json!(min_area_px), json!(SCRIPT_VERSION)],
            PageScript::SetOverlaysHidden { hidden } => vec![json!(hidden)],
            PageScript::InjectFreezeStyle
            | PageScript::FreezeGifs
            | PageScript::AttachNetworkProbe => vec![json!(SCRIPT_VERSION)],
            _ => Vec::new(),
        }
    }

    /// Asynchronous scripts complete through the WebDriver callback argument
    pub fn is_async(&self) -> bool {
        matches!(self, PageScript::WaitForFonts { .. })
    }
}

/// Runs a script and decodes its result into `T`
pub async fn run<T, P>(page: &P, script: PageScript) -> Result<T, CaptureError>
where
    T: DeserializeOwned,
    P: PageSession + ?Sized,
{
    let value = page.execute(&script).await?;
    serde_json::from_value(value).map_err(|e| CaptureError::Script {
        script: script.name(),
        reason: format!("unexpected result: {}", e),
    })
}
