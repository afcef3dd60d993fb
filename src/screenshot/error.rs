use thiserror::Error;

/// Failures surfaced by the capture pipeline
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The request itself was malformed; no browser was launched
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The WebDriver endpoint could not be reached or refused a new session
    #[error("headless browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("screenshot failed after {attempts} attempt(s): {reason}")]
    Screenshot { attempts: u32, reason: String },

    /// A WebDriver command other than navigation or screenshot failed
    #[error("webdriver command {command} failed: {reason}")]
    Driver { command: &'static str, reason: String },

    #[error("page script {script} failed: {reason}")]
    Script { script: &'static str, reason: String },

    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("compositing task failed: {0}")]
    Compositing(String),
}

impl CaptureError {
    /// Whether the failure comes from the deployment rather than the target page
    pub fn is_environment(&self) -> bool {
        matches!(self, CaptureError::BrowserUnavailable(_))
    }
}
