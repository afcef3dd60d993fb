use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::screenshot::CaptureConfig;

/// Environment variable prefix; nested keys are separated by `__`
pub const ENV_PREFIX: &str = "FULLSHOT";

/// Configuration for the API server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// WebDriver endpoint that starts one browser per session
    pub webdriver_url: String,

    /// Whether to run the browser in headless mode
    pub headless: bool,

    /// Directory for log files; logs go to stdout when unset
    pub log_dir: Option<String>,

    /// Upper bound on browsers running at the same time
    pub max_concurrent_captures: usize,

    /// Capture pipeline tunables
    pub capture: CaptureConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            webdriver_url: "http://localhost:4444".to_string(),
            headless: true,
            log_dir: None,
            max_concurrent_captures: 4,
            capture: CaptureConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Loads defaults, then the optional TOML file, then `FULLSHOT__*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let loaded: ServerConfig = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_captures == 0 {
            bail!("max_concurrent_captures must be at least 1");
        }
        url::Url::parse(&self.webdriver_url)
            .with_context(|| format!("Invalid webdriver_url: {}", self.webdriver_url))?;
        if let Err(e) = self.capture.validate() {
            bail!("Invalid capture configuration: {}", e);
        }
        Ok(())
    }
}
