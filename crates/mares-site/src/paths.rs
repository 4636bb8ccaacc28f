//! Output path descriptors for each page kind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Landing page.
pub const INDEX: &str = "/";
/// Full record listing.
pub const LISTING: &str = "Referats";
/// Per-record detail page.
pub const DETAIL: &str = "Ref";
/// Per-record reference materials page.
pub const MATERIALS: &str = "RefMaterials";
/// Per-record transcripts page.
pub const TRANSCRIPTS: &str = "RefTranscripts";

/// Placeholder replaced by a record key in path and link templates.
pub const PLACEHOLDER: &str = "{}";

/// Where one kind of page is written and how it is linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageKind {
    /// Output file path relative to the output root, at most one `{}`
    pub path: String,

    /// URL used by templates to link to this page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Whether the page appears in the site header
    #[serde(default, rename = "showHeader", alias = "show_header")]
    pub show_header: bool,

    /// Whether the link leaves the site
    #[serde(default)]
    pub external: bool,
}

impl PageKind {
    fn new(path: &str, link: Option<&str>, show_header: bool) -> Self {
        Self {
            path: path.to_string(),
            link: link.map(str::to_string),
            show_header,
            external: false,
        }
    }

    /// Output path with the placeholder filled by `key`.
    pub fn output_path(&self, key: &str) -> String {
        fill(&self.path, key)
    }

    /// Link with the placeholder filled by `key`.
    pub fn link_for(&self, key: &str) -> Option<String> {
        self.link.as_deref().map(|link| fill(link, key))
    }
}

/// Table of page kinds by logical name.
///
/// Built once per generation run and shared read-only by every render call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PathTable {
    kinds: BTreeMap<String, PageKind>,
}

impl PathTable {
    /// An empty table.
    pub fn empty() -> Self {
        Self {
            kinds: BTreeMap::new(),
        }
    }

    /// Add or replace a page kind.
    pub fn insert(&mut self, name: impl Into<String>, kind: PageKind) {
        self.kinds.insert(name.into(), kind);
    }

    pub fn get(&self, name: &str) -> Option<&PageKind> {
        self.kinds.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PageKind)> {
        self.kinds.iter()
    }
}

impl Default for PathTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.insert(INDEX, PageKind::new("index.html", None, false));
        table.insert(
            LISTING,
            PageKind::new("referats/index.html", Some("referats/"), true),
        );
        table.insert(
            DETAIL,
            PageKind::new("ref/{}/index.html", Some("ref/{}/"), false),
        );
        table.insert(
            MATERIALS,
            PageKind::new(
                "ref/{}/materials/index.html",
                Some("ref/{}/materials/"),
                false,
            ),
        );
        table.insert(
            TRANSCRIPTS,
            PageKind::new(
                "ref/{}/transcripts/index.html",
                Some("ref/{}/transcripts/"),
                false,
            ),
        );
        table
    }
}

fn fill(template: &str, key: &str) -> String {
    template.replacen(PLACEHOLDER, key, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_placeholder() {
        let table = PathTable::default();
        let detail = table.get(DETAIL).unwrap();

        assert_eq!(detail.output_path("R3"), "ref/R3/index.html");
        assert_eq!(detail.link_for("R3").as_deref(), Some("ref/R3/"));
    }

    #[test]
    fn paths_without_placeholder_ignore_key() {
        let table = PathTable::default();
        assert_eq!(table.get(INDEX).unwrap().output_path("R3"), "index.html");
        assert_eq!(table.get(INDEX).unwrap().link_for("R3"), None);
    }

    #[test]
    fn insert_overrides_default() {
        let mut table = PathTable::default();
        table.insert(
            LISTING,
            PageKind {
                path: "all/index.html".to_string(),
                link: Some("all/".to_string()),
                show_header: true,
                external: false,
            },
        );

        assert_eq!(table.get(LISTING).unwrap().output_path(""), "all/index.html");
        assert!(table.contains(MATERIALS));
    }

    #[test]
    fn deserializes_page_kind_with_defaults() {
        let kind: PageKind = serde_json::from_str(r#"{"path": "x/{}/index.html"}"#).unwrap();

        assert_eq!(kind.link, None);
        assert!(!kind.show_header);
        assert!(!kind.external);
    }

    #[test]
    fn header_flag_uses_camel_case_name() {
        let json = serde_json::to_value(PathTable::default()).unwrap();
        assert_eq!(json[LISTING]["showHeader"], true);
        assert_eq!(json[DETAIL]["showHeader"], false);

        let camel: PageKind =
            serde_json::from_str(r#"{"path": "a.html", "showHeader": true}"#).unwrap();
        let snake: PageKind =
            serde_json::from_str(r#"{"path": "a.html", "show_header": true}"#).unwrap();
        assert!(camel.show_header);
        assert!(snake.show_header);
    }
}
