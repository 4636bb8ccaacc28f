//! Preview server command.

use std::path::PathBuf;

use anyhow::Result;
use mares_server::{PreviewConfig, PreviewServer};

use crate::config::ConfigFile;

/// Command-line overrides for the `[serve]` section.
#[derive(Debug)]
pub struct ServeOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub build_dir: Option<PathBuf>,
    pub live_reload: bool,
    pub open: bool,
}

fn preview_config(file_config: &ConfigFile, options: ServeOptions) -> PreviewConfig {
    PreviewConfig {
        root: options
            .build_dir
            .unwrap_or_else(|| file_config.site.output.clone()),
        host: options
            .host
            .unwrap_or_else(|| file_config.serve.host.clone()),
        port: options.port.unwrap_or(file_config.serve.port),
        live_reload: options.live_reload,
        open: options.open,
    }
}

/// Run the serve command.
pub async fn run(file_config: &ConfigFile, options: ServeOptions) -> Result<()> {
    let config = preview_config(file_config, options);
    PreviewServer::new(config).start().await?;
    Ok(())
}
