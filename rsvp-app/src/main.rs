mod app;
mod config;
mod ports;
mod screen;
mod text;

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args().nth(1);
    let config = config::AppConfig::load(config_path.as_deref().map(Path::new))?;
    app::App::new(config)?.run()
}
