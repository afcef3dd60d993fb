use fantoccini::{Client, ClientBuilder};
use tracing::{debug, error, trace};

use crate::screenshot::config::{self, ViewportConfig};
use crate::screenshot::error::CaptureError;

/// Opens a new WebDriver session, which starts a dedicated browser process
///
/// Sets up a Chrome instance with the hardened argument list used for every capture.
///
/// # Arguments
/// * `webdriver_url` - WebDriver server URL
/// * `viewport` - Initial window size and optional scale factor
/// * `headless` - Whether to run in headless mode
///
/// # Returns
/// * `Result<Client, CaptureError>` - A connected client, or `BrowserUnavailable`
pub async fn create_client(
    webdriver_url: &str,
    viewport: &ViewportConfig,
    headless: bool,
) -> Result<Client, CaptureError> {
    trace!("Creating new WebDriver client connecting to {}", webdriver_url);
    let mut caps = serde_json::map::Map::new();
    let mut chrome_opts = serde_json::map::Map::new();

    debug!("Configuring Chrome options with headless={}", headless);
    let args = config::chrome_arguments(headless, viewport);

    trace!("Setting Chrome arguments: {:?}", args);
    chrome_opts.insert(
        "args".to_string(),
        serde_json::Value::Array(args.into_iter().map(serde_json::Value::String).collect()),
    );
    chrome_opts.insert(
        "prefs".to_string(),
        serde_json::Value::Object(config::chrome_preferences()),
    );

    caps.insert("goog:chromeOptions".to_string(), serde_json::Value::Object(chrome_opts));
    caps.insert("pageLoadStrategy".to_string(), "normal".into());

    debug!("Connecting to WebDriver at {}", webdriver_url);
    match ClientBuilder::native().capabilities(caps).connect(webdriver_url).await {
        Ok(client) => {
            trace!("Successfully created WebDriver client");
            Ok(client)
        }
        Err(e) => {
            error!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
            Err(CaptureError::BrowserUnavailable(format!(
                "failed to open a session at {}: {}",
                webdriver_url, e
            )))
        }
    }
}
