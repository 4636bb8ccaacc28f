//! Site generation: the single linear pass from archive to output tree.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use minijinja::context;
use serde::{Deserialize, Serialize};

use mares_db::{Archive, Category, DurationError, Totals};

use crate::assets::{AssetError, AssetPipeline, CssStep};
use crate::markup::{self, MarkupWarning};
use crate::paths::{self, PageKind, PathTable};
use crate::templates::{ListingInfo, RecordView, RenderError, SiteEnvironment};

/// How a per-record page fills its path placeholder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKey {
    /// The record's external id
    Id,
    /// The record's 1-based position, prefixed
    #[default]
    Ordinal,
}

/// One page per record showing a category of documents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentPages {
    /// Which documents feed the page
    pub category: Category,

    /// Page kind name in the path table
    pub page: String,

    /// Template to render; `refMaterials.html` or `refTranscripts.html` by category
    #[serde(default)]
    pub template: Option<String>,

    /// Placeholder source
    #[serde(default)]
    pub key: PageKey,

    /// Prefix for ordinal keys (`R` gives `R1`, `R2`, ...)
    #[serde(default = "default_ordinal_prefix")]
    pub ordinal_prefix: String,
}

impl DocumentPages {
    /// Pages for `category` at the default page kind and template.
    pub fn new(category: Category) -> Self {
        let page = match category {
            Category::Materials => paths::MATERIALS,
            Category::Transcripts => paths::TRANSCRIPTS,
        };
        Self {
            category,
            page: page.to_string(),
            template: None,
            key: PageKey::default(),
            ordinal_prefix: default_ordinal_prefix(),
        }
    }

    /// Template name, falling back to the category default.
    pub fn template_name(&self) -> &str {
        match (&self.template, self.category) {
            (Some(template), _) => template,
            (None, Category::Materials) => "refMaterials.html",
            (None, Category::Transcripts) => "refTranscripts.html",
        }
    }

    fn key_for(&self, index: usize, record_id: &str) -> String {
        match self.key {
            PageKey::Id => record_id.to_string(),
            PageKey::Ordinal => format!("{}{}", self.ordinal_prefix, index + 1),
        }
    }
}

fn default_ordinal_prefix() -> String {
    "R".to_string()
}

/// A fixed page rendered from a template with the listing data.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StandalonePage {
    pub template: String,
    pub path: String,
}

/// Configuration for generating the site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Output directory
    pub output_dir: PathBuf,

    /// Template directory; built-in templates are used for missing files
    pub template_dir: Option<PathBuf>,

    /// Static assets copied into the output root before rendering
    pub static_dir: PathBuf,

    /// Page kinds and their output paths
    pub paths: PathTable,

    /// Template for the landing and listing pages
    pub listing_template: String,

    /// Template for record detail pages
    pub detail_template: String,

    /// Per-record document pages
    pub documents: Vec<DocumentPages>,

    /// Extra fixed pages
    pub pages: Vec<StandalonePage>,

    /// External CSS build, skipped when `None`
    pub css: Option<CssStep>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("build"),
            template_dir: Some(PathBuf::from("templates")),
            static_dir: PathBuf::from("static"),
            paths: PathTable::default(),
            listing_template: "refs.html".to_string(),
            detail_template: "refDetail.html".to_string(),
            documents: vec![
                DocumentPages::new(Category::Materials),
                DocumentPages::new(Category::Transcripts),
            ],
            pages: vec![],
            css: None,
        }
    }
}

/// A markup conversion that was skipped on one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageWarning {
    /// Output path of the page
    pub page: String,
    /// Owning record id
    pub record: String,
    /// Index of the document within the record
    pub document: usize,
    pub warning: MarkupWarning,
}

/// Result of a generation run.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of pages written
    pub pages: usize,

    /// Number of static files copied
    pub static_files: usize,

    /// Markup conversions that fell back to raw text
    pub warnings: Vec<PageWarning>,

    /// Exit code of the CSS step, if it ran
    pub css_exit_code: Option<i32>,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that abort a generation run.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(
        "Input lists are not aligned: {records} records, {materials} material lists, {transcripts} transcript lists"
    )]
    Misaligned {
        records: usize,
        materials: usize,
        transcripts: usize,
    },

    #[error("Invalid duration in record {record}: {source}")]
    Duration {
        record: String,
        #[source]
        source: DurationError,
    },

    #[error("Cannot total the collection: {0}")]
    CollectionTotal(#[source] DurationError),

    #[error("Unknown page kind: {0}")]
    UnknownPage(String),

    #[error("Failed to create output directory: {0}")]
    WriteError(String),

    #[error(transparent)]
    Assets(#[from] AssetError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Generates the full site from an archive.
pub struct SiteGenerator {
    config: BuildConfig,
    env: SiteEnvironment,
}

impl SiteGenerator {
    /// Create a generator; the template environment is built here, once.
    pub fn new(config: BuildConfig) -> Self {
        let env = SiteEnvironment::new(
            config.template_dir.as_deref(),
            Arc::new(config.paths.clone()),
            &config.output_dir,
        );
        Self { config, env }
    }

    /// Regenerate the whole site.
    ///
    /// Static assets are copied first so they never overwrite rendered pages.
    pub fn generate(&self, archive: &Archive) -> Result<BuildResult, BuildError> {
        let start = Instant::now();

        if !archive.is_aligned() {
            return Err(BuildError::Misaligned {
                records: archive.records.len(),
                materials: archive.materials.len(),
                transcripts: archive.transcripts.len(),
            });
        }
        self.check_page_kinds()?;

        tracing::info!("Generating site into {}", self.config.output_dir.display());

        fs::create_dir_all(&self.config.output_dir)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        let static_files =
            AssetPipeline::copy_static(&self.config.static_dir, &self.config.output_dir)?;

        let (views, totals) = enrich(archive)?;
        let info = ListingInfo {
            wasted_time: totals.time,
            speedrun_wasted_time: totals.speedrun_time,
        };

        let mut pages = 0;
        let mut warnings = Vec::new();

        // Landing and listing pages share one context
        for name in [paths::LISTING, paths::INDEX] {
            let path = self.page_kind(name)?.output_path("");
            self.env.render_page(
                &self.config.listing_template,
                &path,
                context! { info => info, refs_info => &views },
            )?;
            pages += 1;
        }

        let detail = self.page_kind(paths::DETAIL)?;
        for view in &views {
            let path = detail.output_path(&view.record.id);
            self.env
                .render_page(&self.config.detail_template, &path, context! { info => view })?;
            pages += 1;
        }

        for doc_pages in &self.config.documents {
            pages += self.generate_documents(doc_pages, archive, &views, &mut warnings)?;
        }

        for page in &self.config.pages {
            self.env.render_page(
                &page.template,
                &page.path,
                context! { info => info, refs_info => &views },
            )?;
            pages += 1;
        }

        let css_exit_code = self.config.css.as_ref().and_then(AssetPipeline::compile_css);

        Ok(BuildResult {
            pages,
            static_files,
            warnings,
            css_exit_code,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: self.config.output_dir.clone(),
        })
    }

    /// Render one documents page per record for a category.
    fn generate_documents(
        &self,
        doc_pages: &DocumentPages,
        archive: &Archive,
        views: &[RecordView<'_>],
        warnings: &mut Vec<PageWarning>,
    ) -> Result<usize, BuildError> {
        let kind = self.page_kind(&doc_pages.page)?;
        let documents = archive.documents(doc_pages.category);

        for (i, (docs, view)) in documents.iter().zip(views).enumerate() {
            let path = kind.output_path(&doc_pages.key_for(i, &view.record.id));

            let mut html = Vec::with_capacity(docs.len());
            let mut page_warnings = Vec::new();
            for (n, doc) in docs.iter().enumerate() {
                let conversion = markup::to_html(doc);
                for warning in conversion.warnings {
                    tracing::warn!(
                        "{} - {} document {} on {}: {}",
                        view.record.id,
                        doc_pages.category,
                        n + 1,
                        path,
                        warning
                    );
                    page_warnings.push(PageWarning {
                        page: path.clone(),
                        record: view.record.id.clone(),
                        document: n,
                        warning,
                    });
                }
                html.push(conversion.html);
            }

            self.env.render_page(
                doc_pages.template_name(),
                &path,
                context! {
                    refs => docs,
                    md_materials => html,
                    info => view,
                    warnings => &page_warnings,
                },
            )?;
            warnings.extend(page_warnings);
        }

        Ok(documents.len())
    }

    fn page_kind(&self, name: &str) -> Result<&PageKind, BuildError> {
        self.config
            .paths
            .get(name)
            .ok_or_else(|| BuildError::UnknownPage(name.to_string()))
    }

    /// Fail before writing anything if a configured page kind is missing.
    fn check_page_kinds(&self) -> Result<(), BuildError> {
        for name in [paths::INDEX, paths::LISTING, paths::DETAIL] {
            self.page_kind(name)?;
        }
        for doc_pages in &self.config.documents {
            self.page_kind(&doc_pages.page)?;
        }
        Ok(())
    }
}

/// Derive display fields and per-record totals; also return the grand total.
fn enrich(archive: &Archive) -> Result<(Vec<RecordView<'_>>, Totals), BuildError> {
    let mut views = Vec::with_capacity(archive.records.len());

    for record in &archive.records {
        let totals = record.totals().map_err(|source| BuildError::Duration {
            record: record.id.clone(),
            source,
        })?;

        views.push(RecordView {
            record,
            id_name: record.id_name(),
            total_time: totals.time,
            speedrun_total_time: totals.speedrun_time,
        });
    }

    let grand = archive.totals().map_err(BuildError::CollectionTotal)?;

    Ok((views, grand))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::Path;

    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, TempDir};
    use walkdir::WalkDir;

    /// Write a database of `(folder, id, length)` records and load it.
    fn archive(records: &[(&str, &str, &str)]) -> (TempDir, Archive) {
        let temp = tempdir().unwrap();
        for (folder, id, length) in records {
            let dir = temp.path().join(folder);
            fs::create_dir_all(&dir).unwrap();
            fs::write(
                dir.join("index.yaml"),
                format!(
                    "id: {id}\nname: Topic {id}\nfilms:\n  main:\n    length: \"{length}\"\n    speedrun_length: \"0:15:00\"\n"
                ),
            )
            .unwrap();
        }
        let archive = mares_db::load_archive(temp.path()).unwrap();
        (temp, archive)
    }

    fn config(out: &Path) -> BuildConfig {
        BuildConfig {
            output_dir: out.to_path_buf(),
            template_dir: None,
            static_dir: out.join("missing-static"),
            ..Default::default()
        }
    }

    fn read(path: PathBuf) -> String {
        fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e))
    }

    fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        WalkDir::new(dir)
            .into_iter()
            .map(|e| e.unwrap())
            .filter(|e| e.file_type().is_file())
            .map(|e| (e.path().to_path_buf(), fs::read(e.path()).unwrap()))
            .collect()
    }

    #[test]
    fn aggregates_totals_across_pages() {
        let (_db, archive) = archive(&[("ref1", "R1", "1:00:00"), ("ref2", "R2", "0:30:00")]);
        let out = tempdir().unwrap();

        let result = SiteGenerator::new(config(out.path()))
            .generate(&archive)
            .unwrap();

        // index + listing + 2 details + 2 materials + 2 transcripts
        assert_eq!(result.pages, 8);

        for listing in ["index.html", "referats/index.html"] {
            let html = read(out.path().join(listing));
            assert!(html.contains("<span class=\"wasted-time\">1:30:00</span>"));
            assert!(html.contains("<span class=\"speedrun-wasted-time\">0:30:00</span>"));
            assert!(html.contains("1. Topic R1"));
        }

        let first = read(out.path().join("ref/R1/index.html"));
        assert!(first.contains("<span class=\"total-time\">1:00:00</span>"));

        let second = read(out.path().join("ref/R2/index.html"));
        assert!(second.contains("<span class=\"total-time\">0:30:00</span>"));
        assert!(second.contains("<span class=\"speedrun-total-time\">0:15:00</span>"));
    }

    #[test]
    fn renders_converted_documents() {
        let (_db, mut archive) = archive(&[("ref1", "R1", "1:00:00")]);
        archive.materials[0] = vec!["# Notes\n\nSee **this**".to_string()];
        archive.transcripts[0] = vec!["hello".to_string()];
        let out = tempdir().unwrap();

        SiteGenerator::new(config(out.path()))
            .generate(&archive)
            .unwrap();

        let materials = read(out.path().join("ref/R1/materials/index.html"));
        assert!(materials.contains("<a class='font-extrabold text-lg'> Notes</a>"));
        assert!(materials.contains("<a class='font-extrabold'>this</a>"));

        let transcripts = read(out.path().join("ref/R1/transcripts/index.html"));
        assert!(transcripts.contains("<p class='dark:text-gray-300 text-gray-600'>hello</p>"));
    }

    #[test]
    fn collects_markup_warnings() {
        let (_db, mut archive) = archive(&[("ref1", "R1", "1:00:00")]);
        archive.materials[0] = vec!["fine".to_string(), "broken **bold".to_string()];
        let out = tempdir().unwrap();

        let result = SiteGenerator::new(config(out.path()))
            .generate(&archive)
            .unwrap();

        assert_eq!(result.warnings.len(), 1);
        let warning = &result.warnings[0];
        assert_eq!(warning.page, "ref/R1/materials/index.html");
        assert_eq!(warning.record, "R1");
        assert_eq!(warning.document, 1);

        let html = read(out.path().join("ref/R1/materials/index.html"));
        assert!(html.contains("broken **bold"));
    }

    #[test]
    fn document_pages_can_use_record_id() {
        let (_db, archive) = archive(&[("ref1", "X9", "1:00:00")]);
        let out = tempdir().unwrap();

        let mut materials = DocumentPages::new(Category::Materials);
        materials.key = PageKey::Id;
        let config = BuildConfig {
            documents: vec![materials],
            ..config(out.path())
        };

        SiteGenerator::new(config).generate(&archive).unwrap();

        assert!(out.path().join("ref/X9/materials/index.html").exists());
        assert!(!out.path().join("ref/R1/materials/index.html").exists());
        assert!(!out.path().join("ref/X9/transcripts").exists());
    }

    #[test]
    fn ordinal_keys_follow_folder_order() {
        let (_db, archive) = archive(&[("ref1", "R7", "1:00:00"), ("ref2", "R9", "1:00:00")]);
        let out = tempdir().unwrap();

        SiteGenerator::new(config(out.path()))
            .generate(&archive)
            .unwrap();

        let second = read(out.path().join("ref/R2/materials/index.html"));
        assert!(second.contains("<h1>9. Topic R9</h1>"));
    }

    #[test]
    fn rejects_misaligned_lists() {
        let (_db, mut archive) = archive(&[
            ("ref1", "R1", "1:00:00"),
            ("ref2", "R2", "1:00:00"),
            ("ref3", "R3", "1:00:00"),
        ]);
        archive.materials.pop();
        let out = tempdir().unwrap();

        let result = SiteGenerator::new(config(out.path())).generate(&archive);

        assert!(matches!(
            result,
            Err(BuildError::Misaligned {
                records: 3,
                materials: 2,
                transcripts: 3
            })
        ));
        assert!(!out.path().join("index.html").exists());
    }

    #[test]
    fn malformed_duration_aborts() {
        let (_db, archive) = archive(&[("ref1", "R1", "1:00")]);
        let out = tempdir().unwrap();

        let result = SiteGenerator::new(config(out.path())).generate(&archive);

        assert!(matches!(
            result,
            Err(BuildError::Duration { ref record, .. }) if record == "R1"
        ));
    }

    #[test]
    fn unknown_page_kind_fails_before_writing() {
        let (_db, archive) = archive(&[("ref1", "R1", "1:00:00")]);
        let out = tempdir().unwrap();

        let mut documents = DocumentPages::new(Category::Materials);
        documents.page = "Nope".to_string();
        let config = BuildConfig {
            documents: vec![documents],
            ..config(out.path())
        };

        let result = SiteGenerator::new(config).generate(&archive);

        assert!(matches!(result, Err(BuildError::UnknownPage(ref name)) if name == "Nope"));
        assert!(!out.path().join("index.html").exists());
    }

    #[test]
    fn second_run_is_byte_identical() {
        let (_db, mut archive) = archive(&[("ref1", "R1", "1:00:00"), ("ref2", "R2", "0:30:00")]);
        archive.materials[1] = vec!["**a** \"b\"\n# c".to_string()];
        let out = tempdir().unwrap();
        let generator = SiteGenerator::new(config(out.path()));

        generator.generate(&archive).unwrap();
        let first = snapshot(out.path());

        generator.generate(&archive).unwrap();
        let second = snapshot(out.path());

        assert_eq!(first, second);
    }

    #[test]
    fn rendered_pages_win_over_static_files() {
        let (_db, archive) = archive(&[("ref1", "R1", "1:00:00")]);
        let temp = tempdir().unwrap();
        let static_dir = temp.path().join("static");
        let out = temp.path().join("build");
        fs::create_dir_all(&static_dir).unwrap();
        fs::write(static_dir.join("index.html"), "stale").unwrap();
        fs::write(static_dir.join("style.css"), "body{}").unwrap();

        let config = BuildConfig {
            static_dir,
            ..config(&out)
        };
        let result = SiteGenerator::new(config).generate(&archive).unwrap();

        assert_eq!(result.static_files, 2);
        assert!(read(out.join("index.html")).contains("wasted-time"));
        assert_eq!(read(out.join("style.css")), "body{}");
    }

    #[test]
    fn renders_standalone_pages() {
        let (_db, archive) = archive(&[("ref1", "R1", "1:00:00")]);
        let temp = tempdir().unwrap();
        let templates = temp.path().join("templates");
        let out = temp.path().join("build");
        fs::create_dir_all(&templates).unwrap();
        fs::write(templates.join("bored.html"), "{{ refs_info|length }} refs").unwrap();

        let config = BuildConfig {
            template_dir: Some(templates),
            pages: vec![StandalonePage {
                template: "bored.html".to_string(),
                path: "i-was-bored/index.html".to_string(),
            }],
            ..config(&out)
        };
        SiteGenerator::new(config).generate(&archive).unwrap();

        assert_eq!(read(out.join("i-was-bored/index.html")), "1 refs");
    }

    #[test]
    fn document_templates_follow_category_names() {
        let (_db, archive) = archive(&[("ref1", "R1", "1:00:00")]);
        let temp = tempdir().unwrap();
        let templates = temp.path().join("templates");
        let out = temp.path().join("build");
        fs::create_dir_all(&templates).unwrap();
        fs::write(
            templates.join("refMaterials.html"),
            "materials for {{ info.id }}",
        )
        .unwrap();

        let config = BuildConfig {
            template_dir: Some(templates),
            ..config(&out)
        };
        SiteGenerator::new(config).generate(&archive).unwrap();

        assert_eq!(read(out.join("ref/R1/materials/index.html")), "materials for R1");
        let transcripts = read(out.join("ref/R1/transcripts/index.html"));
        assert!(transcripts.contains("<h1>1. Topic R1</h1>"));
    }

    #[test]
    fn collection_total_overflow_aborts() {
        let huge = "2562047788015215:00:00";
        let (_db, archive) = archive(&[("ref1", "R1", huge), ("ref2", "R2", huge)]);
        let out = tempdir().unwrap();

        let result = SiteGenerator::new(config(out.path())).generate(&archive);

        assert!(matches!(
            result,
            Err(BuildError::CollectionTotal(DurationError::Overflow { .. }))
        ));
        assert!(!out.path().join("index.html").exists());
    }

    #[test]
    fn empty_archive_renders_listing_only() {
        let out = tempdir().unwrap();
        let result = SiteGenerator::new(config(out.path()))
            .generate(&Archive::default())
            .unwrap();

        assert_eq!(result.pages, 2);
        assert!(read(out.path().join("index.html")).contains("0:00:00"));
    }
}
