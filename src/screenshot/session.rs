use async_trait::async_trait;
use fantoccini::Client;
use serde_json::Value;
use std::fmt;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::screenshot::client::create_client;
use crate::screenshot::config::ViewportConfig;
use crate::screenshot::error::CaptureError;
use crate::screenshot::scripts::PageScript;

/// The browser surface the capture pipeline drives.
///
/// One implementation talks to a real browser over WebDriver; tests substitute a
/// scripted page. Implementations are owned by exactly one request at a time.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Loads `url` and returns once the browser reports the load event
    async fn navigate(&self, url: &str) -> Result<(), CaptureError>;

    /// Resizes the browser window (not the viewport) to the given outer size
    async fn resize_window(&self, width: u32, height: u32) -> Result<(), CaptureError>;

    /// Runs one named page script and returns its raw JSON result
    async fn execute(&self, script: &PageScript) -> Result<Value, CaptureError>;

    /// Captures the current viewport as PNG bytes
    async fn screenshot(&self) -> Result<Vec<u8>, CaptureError>;
}

/// A WebDriver session exclusively owned by one capture request
pub struct BrowserSession {
    id: Uuid,
    client: Client,
}

impl fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserSession").field("id", &self.id).finish()
    }
}

impl BrowserSession {
    /// Starts a fresh browser for one request
    pub async fn launch(
        webdriver_url: &str,
        viewport: &ViewportConfig,
        headless: bool,
    ) -> Result<Self, CaptureError> {
        let client = create_client(webdriver_url, viewport, headless).await?;
        let id = Uuid::new_v4();
        debug!(session = %id, "Browser session started");
        Ok(Self { id, client })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Underlying WebDriver client, for inspecting the page outside the named scripts
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Ends the WebDriver session, which shuts the browser process down
    pub async fn close(self) {
        let id = self.id;
        match self.client.close().await {
            Ok(()) => debug!(session = %id, "Browser session closed"),
            Err(e) => warn!(session = %id, "Failed to close browser session cleanly: {}", e),
        }
    }
}

#[async_trait]
impl PageSession for BrowserSession {
    async fn navigate(&self, url: &str) -> Result<(), CaptureError> {
        trace!(session = %self.id, "Navigating to {}", url);
        self.client
            .goto(url)
            .await
            .map_err(|e| CaptureError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn resize_window(&self, width: u32, height: u32) -> Result<(), CaptureError> {
        self.client
            .set_window_size(width, height)
            .await
            .map_err(|e| CaptureError::Driver {
                command: "set_window_size",
                reason: e.to_string(),
            })
    }

    async fn execute(&self, script: &PageScript) -> Result<Value, CaptureError> {
        trace!(session = %self.id, "Running page script {}", script.name());
        let result = if script.is_async() {
            self.client.execute_async(script.source(), script.args()).await
        } else {
            self.client.execute(script.source(), script.args()).await
        };
        result.map_err(|e| CaptureError::Script {
            script: script.name(),
            reason: e.to_string(),
        })
    }

    async fn screenshot(&self) -> Result<Vec<u8>, CaptureError> {
        self.client
            .screenshot()
            .await
            .map_err(|e| CaptureError::Driver {
                command: "screenshot",
                reason: e.to_string(),
            })
    }
}
