use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest viewport edge accepted from a request or from configuration
pub const MAX_VIEWPORT_EDGE: u32 = 8192;

/// Tunables for the capture pipeline.
///
/// Built once at startup and shared read-only by every request. All durations are
/// stored in milliseconds so the structure can be loaded from TOML or the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CaptureConfig {
    pub viewport: ViewportConfig,
    pub tiling: TilingConfig,
    pub idle: IdleConfig,
    pub prewarm: PrewarmConfig,
    pub freeze: FreezeConfig,
    pub overlay: OverlayConfig,
    pub navigation: NavigationConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Default viewport width in CSS pixels
    pub width: u32,
    /// Default viewport height in CSS pixels
    pub height: u32,
    /// Forces Chrome's device scale factor when set
    pub device_scale_factor: Option<f64>,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
            device_scale_factor: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilingConfig {
    /// Horizontal overlap as a fraction of the viewport width, in [0, 1)
    pub overlap_x_ratio: f64,
    /// Vertical overlap as a fraction of the viewport height, in [0, 1)
    pub overlap_y_ratio: f64,
    /// Upper bound for the overlap on either axis
    pub max_overlap_px: u32,
    /// Safety cap on the number of tiles captured for one page
    pub max_tiles: usize,
    /// Pause after each scroll before the tile is captured
    pub tile_settle_ms: u64,
    /// Pause after returning to the top before the grid starts
    pub top_settle_ms: u64,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            overlap_x_ratio: 0.0,
            overlap_y_ratio: 0.05,
            max_overlap_px: 80,
            max_tiles: 100,
            tile_settle_ms: 250,
            top_settle_ms: 300,
        }
    }
}

impl TilingConfig {
    pub fn tile_settle(&self) -> Duration {
        Duration::from_millis(self.tile_settle_ms)
    }

    pub fn top_settle(&self) -> Duration {
        Duration::from_millis(self.top_settle_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleConfig {
    /// In-flight requests tolerated while still counting as quiet
    pub max_inflight: usize,
    /// How long the page must stay quiet
    pub quiet_ms: u64,
    /// Hard upper bound for one wait
    pub max_window_ms: u64,
    /// Interval between drains of the in-page probe
    pub poll_interval_ms: u64,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            max_inflight: 2,
            quiet_ms: 500,
            max_window_ms: 4000,
            poll_interval_ms: 100,
        }
    }
}

impl IdleConfig {
    pub fn quiet(&self) -> Duration {
        Duration::from_millis(self.quiet_ms)
    }

    pub fn max_window(&self) -> Duration {
        Duration::from_millis(self.max_window_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrewarmConfig {
    pub enabled: bool,
    /// Scroll step; `None` scrolls one viewport height at a time
    pub step_px: Option<u32>,
    /// Pause after each step
    pub step_delay_ms: u64,
    /// Iteration cap, guards against endlessly growing pages
    pub max_steps: usize,
    /// Extra wait once the bottom has been reached
    pub bottom_settle_ms: u64,
    /// Wait after scrolling back to the top
    pub top_settle_ms: u64,
}

impl Default for PrewarmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            step_px: None,
            step_delay_ms: 150,
            max_steps: 60,
            bottom_settle_ms: 400,
            top_settle_ms: 200,
        }
    }
}

impl PrewarmConfig {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn bottom_settle(&self) -> Duration {
        Duration::from_millis(self.bottom_settle_ms)
    }

    pub fn top_settle(&self) -> Duration {
        Duration::from_millis(self.top_settle_ms)
    }
}

/// Per-strategy switches for the motion freezer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreezeConfig {
    pub inject_style: bool,
    pub pause_video: bool,
    pub pause_players: bool,
    pub strip_svg_animation: bool,
    pub freeze_gif: bool,
}

impl Default for FreezeConfig {
    fn default() -> Self {
        Self {
            inject_style: true,
            pause_video: true,
            pause_players: true,
            strip_svg_animation: true,
            freeze_gif: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub enabled: bool,
    /// Elements whose top edge sits below this offset are left alone
    pub top_threshold_px: u32,
    /// Elements smaller than this area are ignored
    pub min_area_px: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            top_threshold_px: 10,
            min_area_px: 400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Bound for the `document.readyState` wait after navigation
    pub ready_timeout_ms: u64,
    /// Bound for the web font wait
    pub fonts_timeout_ms: u64,
    /// Promote lazy images and frames and wait for fonts before capture
    pub normalize_media: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            ready_timeout_ms: 10_000,
            fonts_timeout_ms: 3_000,
            normalize_media: true,
        }
    }
}

impl NavigationConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Extra attempts for a failed screenshot call
    pub screenshot_retries: u32,
    /// Backoff before each retry
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            screenshot_retries: 1,
            backoff_ms: 200,
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl CaptureConfig {
    /// Checks the invariants the pipeline relies on
    pub fn validate(&self) -> Result<(), String> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err("viewport dimensions must be non-zero".to_string());
        }
        if self.viewport.width > MAX_VIEWPORT_EDGE || self.viewport.height > MAX_VIEWPORT_EDGE {
            return Err(format!("viewport dimensions must not exceed {}", MAX_VIEWPORT_EDGE));
        }
        if let Some(dpr) = self.viewport.device_scale_factor {
            if !(dpr.is_finite() && dpr > 0.0) {
                return Err(format!("device_scale_factor must be positive, got {}", dpr));
            }
        }
        for (name, ratio) in [
            ("overlap_x_ratio", self.tiling.overlap_x_ratio),
            ("overlap_y_ratio", self.tiling.overlap_y_ratio),
        ] {
            if !(0.0..1.0).contains(&ratio) {
                return Err(format!("{} must be in [0, 1), got {}", name, ratio));
            }
        }
        if self.tiling.max_tiles == 0 {
            return Err("max_tiles must be at least 1".to_string());
        }
        if self.prewarm.step_px == Some(0) {
            return Err("prewarm step_px must be non-zero".to_string());
        }
        Ok(())
    }
}

// Chrome browser arguments
pub fn chrome_arguments(headless: bool, viewport: &ViewportConfig) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--no-sandbox",
        "--disable-gpu",
        "--disable-dev-shm-usage",
        "--disable-extensions",
        "--disable-notifications",
        "--disable-infobars",
        "--disable-popup-blocking",
        "--disable-background-networking",
        "--disable-background-timer-throttling",
        "--disable-backgrounding-occluded-windows",
        "--disable-breakpad",
        "--disable-component-extensions-with-background-pages",
        "--disable-features=TranslateUI",
        "--disable-renderer-backgrounding",
        "--force-color-profile=srgb",
        "--hide-scrollbars",
        "--mute-audio",
        if headless { "--headless=new" } else { "" },
    ]
    .into_iter()
    .filter(|s| !s.is_empty())
    .map(String::from)
    .collect();

    args.push(format!("--window-size={},{}", viewport.width, viewport.height));
    if let Some(dpr) = viewport.device_scale_factor {
        args.push(format!("--force-device-scale-factor={}", dpr));
    }
    args
}

// Chrome content settings preferences
pub fn chrome_preferences() -> serde_json::Map<String, serde_json::Value> {
    let mut prefs = serde_json::Map::new();
    prefs.insert("profile.default_content_setting_values.images".to_string(), 1.into()); // 1 = allow
    prefs.insert("profile.managed_default_content_settings.javascript".to_string(), 1.into()); // 1 = allow
    prefs.insert("profile.managed_default_content_settings.popups".to_string(), 2.into()); // 2 = block
    prefs.insert("profile.managed_default_content_settings.geolocation".to_string(), 2.into()); // 2 = block
    prefs.insert("profile.managed_default_content_settings.notifications".to_string(), 2.into()); // 2 = block
    prefs
}
