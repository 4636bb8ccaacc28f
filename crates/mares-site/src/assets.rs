//! Static asset copying and the external CSS build step.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use walkdir::WalkDir;

/// Errors that can occur while copying static assets.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Failed to walk {path}: {message}")]
    Walk { path: PathBuf, message: String },

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An external stylesheet compiler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssStep {
    /// Program to run
    pub program: String,

    /// Arguments passed to the program
    pub args: Vec<String>,

    /// Stylesheet the program writes, minified afterwards when `minify` is set
    pub output: Option<PathBuf>,

    /// Minify `output` with lightningcss after a successful run
    pub minify: bool,
}

impl Default for CssStep {
    fn default() -> Self {
        Self {
            program: "npx".to_string(),
            args: ["tailwindcss", "-i", "css/style.css", "-o", "build/style.css"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output: Some(PathBuf::from("build/style.css")),
            minify: false,
        }
    }
}

/// Asset pipeline utilities.
pub struct AssetPipeline;

impl AssetPipeline {
    /// Copy everything under `static_dir` into `output_dir`, overwriting files.
    ///
    /// A missing static directory is not an error; the step is skipped.
    /// Returns the number of files copied.
    pub fn copy_static(static_dir: &Path, output_dir: &Path) -> Result<usize, AssetError> {
        if !static_dir.is_dir() {
            tracing::warn!("Static directory {} does not exist", static_dir.display());
            return Ok(0);
        }

        tracing::debug!(
            "Copying static files from {} to {}",
            static_dir.display(),
            output_dir.display()
        );

        let mut copied = 0;
        for entry in WalkDir::new(static_dir).follow_links(true) {
            let entry = entry.map_err(|e| AssetError::Walk {
                path: static_dir.to_path_buf(),
                message: e.to_string(),
            })?;

            let relative = entry
                .path()
                .strip_prefix(static_dir)
                .unwrap_or(entry.path());
            let target = output_dir.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target).map_err(|source| AssetError::Copy {
                    from: entry.path().to_path_buf(),
                    to: target.clone(),
                    source,
                })?;
            } else {
                fs::copy(entry.path(), &target).map_err(|source| AssetError::Copy {
                    from: entry.path().to_path_buf(),
                    to: target.clone(),
                    source,
                })?;
                copied += 1;
            }
        }

        Ok(copied)
    }

    /// Run the external CSS compiler.
    ///
    /// The exit code is reported but never enforced: a failing or missing
    /// compiler only logs a warning. Returns the exit code when the program ran.
    pub fn compile_css(step: &CssStep) -> Option<i32> {
        tracing::info!("Compiling CSS with {} {}", step.program, step.args.join(" "));

        let status = match Command::new(&step.program).args(&step.args).status() {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("Failed to run {}: {}", step.program, e);
                return None;
            }
        };

        let code = status.code();
        if status.success() {
            tracing::info!("CSS compiler exited with code {}", code.unwrap_or(0));
            if step.minify {
                if let Some(output) = &step.output {
                    Self::minify_file(output);
                }
            }
        } else {
            tracing::warn!("CSS compiler exited with status {}", status);
        }

        code
    }

    /// Minify CSS using lightningcss.
    pub fn minify_css(css: &str) -> Result<String, String> {
        use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

        let stylesheet = StyleSheet::parse(css, ParserOptions::default())
            .map_err(|e| format!("CSS parse error: {}", e))?;

        let minified = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..Default::default()
            })
            .map_err(|e| format!("CSS minify error: {}", e))?;

        Ok(minified.code)
    }

    /// Minify a stylesheet in place, leaving it untouched on any failure.
    fn minify_file(path: &Path) {
        let css = match fs::read_to_string(path) {
            Ok(css) => css,
            Err(e) => {
                tracing::warn!("Cannot minify {}: {}", path.display(), e);
                return;
            }
        };

        match Self::minify_css(&css) {
            Ok(minified) => {
                if let Err(e) = fs::write(path, minified) {
                    tracing::warn!("Cannot write minified {}: {}", path.display(), e);
                }
            }
            Err(e) => tracing::warn!("Cannot minify {}: {}", path.display(), e),
        }
    }
}
