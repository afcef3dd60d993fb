use serde::{Deserialize, Serialize};

/// Query string of `GET /screenshot`.
///
/// Numbers are taken as strings so a malformed value can be answered with the
/// same JSON error body as any other bad input.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ScreenshotQuery {
    /// Page to capture
    pub url: Option<String>,

    /// Viewport width override in CSS pixels
    pub w: Option<String>,

    /// Viewport height override in CSS pixels
    pub h: Option<String>,
}

/// Validated form of [`ScreenshotQuery`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotRequest {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ScreenshotQuery {
    pub fn validate(self) -> Result<ScreenshotRequest, String> {
        let url = match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => return Err("Missing url".to_string()),
        };

        match url::Url::parse(&url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => return Err(format!("Unsupported URL scheme: {}", parsed.scheme())),
            Err(e) => return Err(format!("Invalid url: {}", e)),
        }

        Ok(ScreenshotRequest {
            url,
            width: parse_dimension("w", self.w.as_deref())?,
            height: parse_dimension("h", self.h.as_deref())?,
        })
    }
}

fn parse_dimension(name: &str, raw: Option<&str>) -> Result<Option<u32>, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<u32>()
            .map(Some)
            .map_err(|_| format!("{} must be a positive integer", name)),
    }
}

/// Error body for every non-image response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

/// Health status response for the /health endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    /// healthy while capture slots are free, degraded when all are busy
    pub status: String,

    pub active_captures: usize,
    pub max_concurrent_captures: usize,
    pub total_captures: usize,
    pub failed_captures: usize,
    pub uptime_secs: u64,
}
