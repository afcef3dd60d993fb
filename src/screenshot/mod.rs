//! Full-page capture engine.
//!
//! A page is captured viewport by viewport and the tiles are stitched into one PNG.
//! Before the grid runs, the page is brought into a stable state: the network is
//! given time to quiet down, lazy content is scrolled into existence, motion is frozen,
//! and fixed headers are tagged so they appear only in the first row.

pub mod capture;
pub mod client;
pub mod config;
pub mod effort;
pub mod error;
pub mod freeze;
pub mod idle;
pub mod model;
pub mod overlay;
pub mod pipeline;
pub mod planner;
pub mod prewarm;
pub mod scripts;
pub mod session;
pub mod stitch;
pub mod taker;

pub use capture::{capture_grid_and_stitch, screenshot_with_retry};
pub use config::CaptureConfig;
pub use error::CaptureError;
pub use freeze::{freeze_motion_media, FreezeReport};
pub use idle::{wait_for_soft_idle, IdleOutcome, InflightTracker};
pub use model::{CapturedImage, Viewport, ViewportMetrics};
pub use overlay::{clear_overlay_marks, mark_hideable_overlays, set_overlays_hidden};
pub use pipeline::capture_url;
pub use planner::{plan_tiles, TilePlan};
pub use prewarm::{prewarm_page, PrewarmReport};
pub use scripts::PageScript;
pub use session::{BrowserSession, PageSession};
pub use taker::{CaptureOutcome, ScreenshotTaker};
