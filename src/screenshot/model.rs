use serde::{Deserialize, Serialize};

/// Viewport and document extents as reported by the page, in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportMetrics {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f64,
    pub content_width: u32,
    pub content_height: u32,
    #[serde(default)]
    pub scroll_x: f64,
    #[serde(default)]
    pub scroll_y: f64,
}

impl ViewportMetrics {
    /// Device pixel ratio, falling back to 1 when the page reports nonsense
    pub fn dpr(&self) -> f64 {
        if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        }
    }

    /// True once the bottom edge of the viewport touches the end of the content
    pub fn at_bottom(&self) -> bool {
        self.scroll_y + f64::from(self.height) >= f64::from(self.content_height) - 1.0
    }
}

/// Scroll offset after a scroll command, as the page applied it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollPosition {
    pub x: f64,
    pub y: f64,
}

/// Requested viewport size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// A finished full-page capture
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// PNG-encoded image
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Number of viewport tiles composited into the image
    pub tiles: usize,
}

/// Scales a CSS length to output pixels
pub fn to_device_px(css: f64, dpr: f64) -> u32 {
    (css * dpr).round().max(0.0) as u32
}
