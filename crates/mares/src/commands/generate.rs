//! Site generation command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use mares_site::{BuildConfig, SiteGenerator};

use crate::config::ConfigFile;

/// Command-line overrides for the config file.
#[derive(Debug, Default)]
pub struct GenerateOptions {
    pub input_db: Option<PathBuf>,
    pub build_dir: Option<PathBuf>,
    pub template_dir: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    pub compile_css: bool,
}

fn build_config(file_config: &ConfigFile, options: GenerateOptions) -> BuildConfig {
    let mut config = file_config.build_config();

    if let Some(dir) = options.build_dir {
        config.output_dir = dir;
    }
    if let Some(dir) = options.template_dir {
        config.template_dir = Some(dir);
    }
    if let Some(dir) = options.static_dir {
        config.static_dir = dir;
    }
    if options.compile_css && config.css.is_none() {
        config.css = Some(file_config.css.step());
    }

    config
}

/// Run the generate command.
pub fn run(file_config: &ConfigFile, options: GenerateOptions) -> Result<()> {
    let db_dir = options
        .input_db
        .clone()
        .unwrap_or_else(|| file_config.site.db.clone());

    tracing::info!("Loading archive from {}", db_dir.display());
    let archive = mares_db::load_archive(&db_dir)
        .with_context(|| format!("Failed to load archive from {}", db_dir.display()))?;
    tracing::debug!("Loaded {} records", archive.records.len());

    let config = build_config(file_config, options);
    let result = SiteGenerator::new(config).generate(&archive)?;

    if !result.warnings.is_empty() {
        tracing::warn!(
            "{} markup conversions left as raw text",
            result.warnings.len()
        );
    }

    tracing::info!(
        "Generated {} pages and copied {} static files in {}ms",
        result.pages,
        result.static_files,
        result.duration_ms
    );
    if let Some(code) = result.css_exit_code {
        tracing::info!("CSS step exited with code {}", code);
    }
    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
