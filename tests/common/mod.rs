#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Mutex, MutexGuard};

use fullpage_shot::screenshot::{CaptureError, PageScript, PageSession};

/// Colour of the synthetic page at an absolute device pixel
pub fn color_at(x: u32, y: u32) -> Rgb<u8> {
    Rgb([
        (x % 256) as u8,
        (y % 256) as u8,
        ((x / 256 + 7 * (y / 256)) % 256) as u8,
    ])
}

/// Mutable state of the scripted page; inspect it through [`FakePage::state`]
#[derive(Debug)]
pub struct FakeState {
    pub window: (u32, u32),
    /// Window decorations subtracted from the window to get the viewport
    pub chrome: (u32, u32),
    pub dpr: f64,
    pub content: (u32, u32),
    pub scroll: (u32, u32),
    pub navigated: Option<String>,
    pub fail_navigation: bool,
    /// Script names that always fail
    pub failing_scripts: Vec<&'static str>,
    /// Zero-based screenshot call indices that fail
    pub failing_shots: Vec<usize>,
    pub always_fail_shots: bool,
    pub shot_calls: usize,
    /// Scroll position of every successful screenshot, probe included
    pub shots: Vec<(u32, u32)>,
    /// Whether overlays were hidden at each successful screenshot
    pub shot_hidden: Vec<bool>,
    /// Content height to switch to after the first successful grid tile
    pub content_height_after_capture: Option<u32>,
    pub scripts_run: Vec<&'static str>,
    pub overlay_candidates: u64,
    pub overlays_marked: bool,
    /// Tag the overlays, then fail the marking script
    pub mark_fails_after_tagging: bool,
    pub overlays_hidden: bool,
    /// (scroll y, hidden) for every visibility change request
    pub overlay_log: Vec<(u32, bool)>,
    pub freeze_style: bool,
    pub animated_gifs: u64,
    pub probe_attached: bool,
    pub probe_attaches: usize,
    pub probe_detaches: usize,
    /// Batches returned by successive drains; an exhausted queue drains nothing
    pub network_batches: VecDeque<Vec<&'static str>>,
    /// Emit one `start` per drain forever
    pub network_always_busy: bool,
    pub ready_state: &'static str,
}

pub struct FakePage {
    state: Mutex<FakeState>,
}

impl FakePage {
    pub fn new(viewport: (u32, u32), content: (u32, u32)) -> Self {
        Self {
            state: Mutex::new(FakeState {
                window: viewport,
                chrome: (0, 0),
                dpr: 1.0,
                content,
                scroll: (0, 0),
                navigated: None,
                fail_navigation: false,
                failing_scripts: Vec::new(),
                failing_shots: Vec::new(),
                always_fail_shots: false,
                shot_calls: 0,
                shots: Vec::new(),
                shot_hidden: Vec::new(),
                content_height_after_capture: None,
                scripts_run: Vec::new(),
                overlay_candidates: 1,
                overlays_marked: false,
                mark_fails_after_tagging: false,
                overlays_hidden: false,
                overlay_log: Vec::new(),
                freeze_style: false,
                animated_gifs: 2,
                probe_attached: false,
                probe_attaches: 0,
                probe_detaches: 0,
                network_batches: VecDeque::new(),
                network_always_busy: false,
                ready_state: "complete",
            }),
        }
    }

    pub fn with_dpr(self, dpr: f64) -> Self {
        self.state().dpr = dpr;
        self
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Grid tiles only: every screenshot after the probe
    pub fn grid_shots(&self) -> Vec<(u32, u32)> {
        self.state().shots.iter().skip(1).copied().collect()
    }

    /// Overlay visibility for each grid tile
    pub fn grid_overlays_hidden(&self) -> Vec<bool> {
        self.state().shot_hidden.iter().skip(1).copied().collect()
    }
}

impl FakeState {
    fn viewport(&self) -> (u32, u32) {
        (
            self.window.0.saturating_sub(self.chrome.0).max(1),
            self.window.1.saturating_sub(self.chrome.1).max(1),
        )
    }

    fn max_scroll(&self) -> (u32, u32) {
        let (vw, vh) = self.viewport();
        (self.content.0.saturating_sub(vw), self.content.1.saturating_sub(vh))
    }

    fn metrics(&self) -> Value {
        let (vw, vh) = self.viewport();
        json!({
            "width": vw,
            "height": vh,
            "devicePixelRatio": self.dpr,
            "contentWidth": self.content.0,
            "contentHeight": self.content.1,
            "scrollX": self.scroll.0,
            "scrollY": self.scroll.1,
        })
    }

    fn render(&self) -> Vec<u8> {
        let (vw, vh) = self.viewport();
        let width = (f64::from(vw) * self.dpr).round() as u32;
        let height = (f64::from(vh) * self.dpr).round() as u32;
        let origin_x = (f64::from(self.scroll.0) * self.dpr).round() as u32;
        let origin_y = (f64::from(self.scroll.1) * self.dpr).round() as u32;

        let tile = RgbImage::from_fn(width, height, |x, y| color_at(origin_x + x, origin_y + y));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(tile)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }
}

fn script_failure(script: &PageScript) -> CaptureError {
    CaptureError::Script {
        script: script.name(),
        reason: "scripted failure".to_string(),
    }
}

#[async_trait]
impl PageSession for FakePage {
    async fn navigate(&self, url: &str) -> Result<(), CaptureError> {
        let mut state = self.state();
        if state.fail_navigation {
            return Err(CaptureError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        state.navigated = Some(url.to_string());
        state.scroll = (0, 0);
        Ok(())
    }

    async fn resize_window(&self, width: u32, height: u32) -> Result<(), CaptureError> {
        self.state().window = (width, height);
        Ok(())
    }

    async fn execute(&self, script: &PageScript) -> Result<Value, CaptureError> {
        let mut state = self.state();
        state.scripts_run.push(script.name());
        if state.failing_scripts.contains(&script.name()) {
            return Err(script_failure(script));
        }

        let value = match *script {
            PageScript::MeasureViewport => state.metrics(),
            PageScript::ScrollTo { x, y } => {
                let (max_x, max_y) = state.max_scroll();
                state.scroll = (x.min(max_x), y.min(max_y));
                json!({ "x": state.scroll.0, "y": state.scroll.1 })
            }
            PageScript::ScrollBy { dy } => {
                let (_, max_y) = state.max_scroll();
                state.scroll.1 = state.scroll.1.saturating_add(dy).min(max_y);
                state.metrics()
            }
            PageScript::ReadyState => json!(state.ready_state),
            PageScript::WaitForFonts { .. } => json!(true),
            PageScript::EagerLoadMedia => json!(0),
            PageScript::InjectFreezeStyle => {
                let injected = !state.freeze_style;
                state.freeze_style = true;
                json!(injected)
            }
            PageScript::PauseVideos => json!(1),
            PageScript::PauseAnimationPlayers => json!(0),
            PageScript::StripSvgAnimation => json!(3),
            PageScript::FreezeGifs => {
                let frozen = state.animated_gifs;
                state.animated_gifs = 0;
                json!(frozen)
            }
            PageScript::MarkOverlays { .. } => {
                state.overlays_marked = state.overlay_candidates > 0;
                if state.mark_fails_after_tagging {
                    return Err(script_failure(script));
                }
                json!(state.overlay_candidates)
            }
            PageScript::SetOverlaysHidden { hidden } => {
                let y = state.scroll.1;
                state.overlay_log.push((y, hidden));
                state.overlays_hidden = hidden;
                json!(state.overlay_candidates)
            }
            PageScript::ClearOverlayMarks => {
                state.overlays_marked = false;
                state.overlays_hidden = false;
                json!(state.overlay_candidates)
            }
            PageScript::AttachNetworkProbe => {
                state.probe_attached = true;
                state.probe_attaches += 1;
                json!(true)
            }
            PageScript::DrainNetworkEvents => {
                if state.network_always_busy {
                    json!(["start"])
                } else {
                    json!(state.network_batches.pop_front().unwrap_or_default())
                }
            }
            PageScript::DetachNetworkProbe => {
                state.probe_attached = false;
                state.probe_detaches += 1;
                json!(true)
            }
        };
        Ok(value)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, CaptureError> {
        let mut state = self.state();
        let call = state.shot_calls;
        state.shot_calls += 1;
        if state.always_fail_shots || state.failing_shots.contains(&call) {
            return Err(CaptureError::Driver {
                command: "screenshot",
                reason: format!("scripted failure on call {}", call),
            });
        }

        let png = state.render();
        let position = state.scroll;
        state.shots.push(position);
        let hidden = state.overlays_hidden;
        state.shot_hidden.push(hidden);

        // the probe is the first successful shot; change the page after the first grid tile
        if state.shots.len() == 2 {
            if let Some(height) = state.content_height_after_capture.take() {
                state.content.1 = height;
            }
        }
        Ok(png)
    }
}

/// Asserts that every pixel of `png` matches the synthetic page
pub fn assert_matches_page(png: &[u8]) -> (u32, u32) {
    let image = image::load_from_memory(png).unwrap().to_rgb8();
    for (x, y, pixel) in image.enumerate_pixels() {
        assert_eq!(*pixel, color_at(x, y), "pixel mismatch at ({}, {})", x, y);
    }
    image.dimensions()
}
