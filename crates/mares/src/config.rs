//! `mares.toml` configuration file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use mares_site::{BuildConfig, CssStep, DocumentPages, PageKind, PathTable, StandalonePage};

/// Configuration file structure (mares.toml).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub site: SiteSettings,
    #[serde(default)]
    pub css: CssSettings,
    /// Page kinds added to or replacing the built-in path table
    #[serde(default)]
    pub paths: BTreeMap<String, PageKind>,
    /// Per-record document pages; the built-in set when absent
    pub documents: Option<Vec<DocumentPages>>,
    #[serde(default)]
    pub pages: Vec<StandalonePage>,
    #[serde(default)]
    pub serve: ServeSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    pub db: PathBuf,
    pub output: PathBuf,
    pub templates: PathBuf,
    #[serde(rename = "static")]
    pub static_dir: PathBuf,
    pub listing_template: String,
    pub detail_template: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        let build = BuildConfig::default();
        Self {
            db: PathBuf::from("db"),
            output: build.output_dir,
            templates: PathBuf::from("templates"),
            static_dir: build.static_dir,
            listing_template: build.listing_template,
            detail_template: build.detail_template,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CssSettings {
    /// Run the CSS compiler after generating pages
    pub compile: bool,
    pub program: String,
    pub args: Vec<String>,
    pub output: Option<PathBuf>,
    pub minify: bool,
}

impl Default for CssSettings {
    fn default() -> Self {
        let step = CssStep::default();
        Self {
            compile: false,
            program: step.program,
            args: step.args,
            output: step.output,
            minify: step.minify,
        }
    }
}

impl CssSettings {
    pub fn step(&self) -> CssStep {
        CssStep {
            program: self.program.clone(),
            args: self.args.clone(),
            output: self.output.clone(),
            minify: self.minify,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServeSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServeSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8000,
        }
    }
}

impl ConfigFile {
    /// Build configuration for the generator, before CLI overrides.
    pub fn build_config(&self) -> BuildConfig {
        let mut paths = PathTable::default();
        for (name, kind) in &self.paths {
            paths.insert(name.clone(), kind.clone());
        }

        let defaults = BuildConfig::default();
        BuildConfig {
            output_dir: self.site.output.clone(),
            template_dir: Some(self.site.templates.clone()),
            static_dir: self.site.static_dir.clone(),
            paths,
            listing_template: self.site.listing_template.clone(),
            detail_template: self.site.detail_template.clone(),
            documents: self.documents.clone().unwrap_or(defaults.documents),
            pages: self.pages.clone(),
            css: self.css.compile.then(|| self.css.step()),
        }
    }
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(ConfigFile::default());
    }

    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile =
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::info!("Loaded config from {}", path.display());

    Ok(config)
}
