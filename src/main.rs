use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use fullpage_shot::api::config::ServerConfig;
use fullpage_shot::api::start_server;
use fullpage_shot::utils::logger::init_logger;

/// Full-page screenshot API
#[derive(Debug, Parser)]
#[command(name = "fullpage_shot", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// WebDriver endpoint, e.g. http://localhost:4444
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Write logs to a timestamped file in this directory
    #[arg(long)]
    log_dir: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(webdriver_url) = self.webdriver_url {
            config.webdriver_url = webdriver_url;
        }
        if let Some(log_dir) = self.log_dir {
            config.log_dir = Some(log_dir);
        }
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    init_logger(config.log_dir.as_deref())?;

    start_server(config).await
}
