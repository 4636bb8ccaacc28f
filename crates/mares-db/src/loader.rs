//! Record folder discovery and loading.
//!
//! A database directory holds one folder per record:
//!
//! ```text
//! db/
//! ├── ref1/
//! │   ├── index.yaml       # Record metadata
//! │   ├── refs/            # Reference materials
//! │   └── transcripts/     # Transcripts
//! └── ref2/
//! ```
//!
//! Folders are ordered by the integer at the end of their name, so `ref10`
//! comes after `ref9`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::duration::DurationError;
use crate::record::{Category, Record, Totals};

/// Metadata file name inside each record folder.
pub const INDEX_FILE: &str = "index.yaml";

/// Errors that can occur while loading the database.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Database directory not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Record folder '{0}' has no trailing number to order by")]
    MissingOrderKey(String),
}

/// All records with their documents, index-aligned.
///
/// Position `i` in `records`, `materials` and `transcripts` refers to the
/// same source folder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Archive {
    pub records: Vec<Record>,
    pub materials: Vec<Vec<String>>,
    pub transcripts: Vec<Vec<String>>,
}

impl Archive {
    /// Documents of one category, one list per record.
    pub fn documents(&self, category: Category) -> &[Vec<String>] {
        match category {
            Category::Materials => &self.materials,
            Category::Transcripts => &self.transcripts,
        }
    }

    /// Whether all three lists have the same length.
    pub fn is_aligned(&self) -> bool {
        self.records.len() == self.materials.len() && self.records.len() == self.transcripts.len()
    }

    /// Duration totals across every film of every record.
    pub fn totals(&self) -> Result<Totals, DurationError> {
        Totals::of(self.records.iter().flat_map(|r| r.films.iter().map(|(_, film)| film)))
    }
}

/// Load every record folder under `db_dir`.
pub fn load_archive(db_dir: &Path) -> Result<Archive, LoadError> {
    if !db_dir.is_dir() {
        return Err(LoadError::NotFound(db_dir.to_path_buf()));
    }

    let folders = discover_folders(db_dir)?;
    let mut archive = Archive::default();

    for folder in &folders {
        let index_path = folder.join(INDEX_FILE);
        let content = read(&index_path)?;
        let record: Record = serde_yaml::from_str(&content).map_err(|source| LoadError::Yaml {
            path: index_path.clone(),
            source,
        })?;

        tracing::debug!("Loaded record {} from {}", record.id, folder.display());

        archive.records.push(record);
        archive
            .materials
            .push(read_documents(&folder.join(Category::Materials.dir_name()))?);
        archive
            .transcripts
            .push(read_documents(&folder.join(Category::Transcripts.dir_name()))?);
    }

    tracing::info!(
        "Loaded {} records from {}",
        archive.records.len(),
        db_dir.display()
    );

    Ok(archive)
}

/// Find record folders and sort them by their trailing number.
fn discover_folders(db_dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let entries = fs::read_dir(db_dir).map_err(|source| LoadError::Io {
        path: db_dir.to_path_buf(),
        source,
    })?;

    let mut folders = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: db_dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        if name.contains('.') || !path.is_dir() {
            tracing::debug!("Skipping {}", path.display());
            continue;
        }

        let key = order_key(&name).ok_or_else(|| LoadError::MissingOrderKey(name.clone()))?;
        folders.push((key, name, path));
    }

    folders.sort();
    Ok(folders.into_iter().map(|(_, _, path)| path).collect())
}

/// Trailing integer of a folder name: `ref12` -> 12.
fn order_key(name: &str) -> Option<u64> {
    static TRAILING_NUMBER: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(\d+)$").expect("Invalid trailing number regex"));

    TRAILING_NUMBER
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Read all files in a document directory, sorted by file name.
///
/// A missing directory means the record has no documents of that kind.
fn read_documents(dir: &Path) -> Result<Vec<String>, LoadError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| LoadError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    files.iter().map(|path| read(path)).collect()
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}
