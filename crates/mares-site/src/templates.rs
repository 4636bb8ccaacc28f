//! Template environment and page rendering.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use minijinja::{Environment, ErrorKind, Value};
use serde::Serialize;

use mares_db::{Elapsed, Record};

use crate::paths::PathTable;

/// Errors that can occur while rendering a page.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to render {template} into {path}: {source}")]
    Template {
        template: String,
        path: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A record with its derived display fields, as templates see it.
#[derive(Debug, Clone, Serialize)]
pub struct RecordView<'a> {
    #[serde(flatten)]
    pub record: &'a Record,
    pub id_name: String,
    pub total_time: Elapsed,
    pub speedrun_total_time: Elapsed,
}

/// Collection-wide totals shown on the listing pages.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ListingInfo {
    pub wasted_time: Elapsed,
    pub speedrun_wasted_time: Elapsed,
}

/// Template environment bound to one output directory.
///
/// Templates are looked up in the template directory first and fall back to
/// the built-in defaults. The path table is available to every template as
/// the `paths` global and through the `link(kind, key)` function.
pub struct SiteEnvironment {
    env: Environment<'static>,
    output_dir: PathBuf,
}

impl SiteEnvironment {
    /// Create an environment rendering into `output_dir`.
    pub fn new(template_dir: Option<&Path>, paths: Arc<PathTable>, output_dir: &Path) -> Self {
        let mut env = Environment::new();

        let fs_loader = template_dir.map(|dir| minijinja::path_loader(dir.to_path_buf()));
        env.set_loader(move |name| {
            if let Some(load) = &fs_loader {
                if let Some(source) = load(name)? {
                    return Ok(Some(source));
                }
            }
            Ok(default_template(name).map(str::to_string))
        });

        env.add_global("paths", Value::from_serialize(&*paths));

        let table = Arc::clone(&paths);
        env.add_function(
            "link",
            move |kind: &str, key: Option<&str>| -> Result<String, minijinja::Error> {
                let page = table.get(kind).ok_or_else(|| {
                    minijinja::Error::new(
                        ErrorKind::InvalidOperation,
                        format!("unknown page kind '{}'", kind),
                    )
                })?;
                let key = key.unwrap_or("");
                Ok(page.link_for(key).unwrap_or_else(|| page.output_path(key)))
            },
        );

        Self {
            env,
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Output root pages are written under.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Render `template` with `ctx` and write it to `path` under the output root.
    ///
    /// Parent directories are created as needed; an existing file is
    /// overwritten.
    pub fn render_page<S: Serialize>(
        &self,
        template: &str,
        path: &str,
        ctx: S,
    ) -> Result<PathBuf, RenderError> {
        let full_path = self.output_dir.join(path);

        let html = self
            .env
            .get_template(template)
            .and_then(|tmpl| tmpl.render(ctx))
            .map_err(|source| {
                tracing::error!("Error while generating {}: {}", path, source);
                RenderError::Template {
                    template: template.to_string(),
                    path: path.to_string(),
                    source,
                }
            })?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(|source| {
                tracing::error!("Error while generating {}: {}", path, source);
                RenderError::Write {
                    path: parent.to_path_buf(),
                    source,
                }
            })?;
        }

        fs::write(&full_path, html).map_err(|source| {
            tracing::error!("Error while generating {}: {}", path, source);
            RenderError::Write {
                path: full_path.clone(),
                source,
            }
        })?;

        tracing::debug!("Generated {}", full_path.display());
        Ok(full_path)
    }
}

/// Built-in template sources by name.
fn default_template(name: &str) -> Option<&'static str> {
    match name {
        "base.html" => Some(BASE_TEMPLATE),
        "refs.html" => Some(LISTING_TEMPLATE),
        "refDetail.html" => Some(DETAIL_TEMPLATE),
        "refMaterials.html" | "refTranscripts.html" => Some(DOCUMENTS_TEMPLATE),
        _ => None,
    }
}

const BASE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{% block title %}Mares Archives{% endblock %}</title>
  <link rel="stylesheet" href="/style.css">
</head>
<body class="dark:bg-gray-900 bg-white">
  <header>
    <nav>
      <a href="/">Home</a>
      {% for name, page in paths|items %}{% if page.showHeader %}
      <a href="/{{ page.link }}">{{ name }}</a>
      {% endif %}{% endfor %}
    </nav>
  </header>
  <main>
    {% block content %}{% endblock %}
  </main>
</body>
</html>"##;

const LISTING_TEMPLATE: &str = r##"{% extends "base.html" %}

{% block content %}
<section class="totals">
  <p>Total time: <span class="wasted-time">{{ info.wasted_time }}</span></p>
  <p>Speedrun time: <span class="speedrun-wasted-time">{{ info.speedrun_wasted_time }}</span></p>
</section>
<ul class="refs">
{% for r in refs_info %}
  <li><a href="/{{ link("Ref", r.id) }}">{{ r.id_name }}</a></li>
{% endfor %}
</ul>
{% endblock %}"##;

const DETAIL_TEMPLATE: &str = r##"{% extends "base.html" %}

{% block title %}{{ info.id_name }}{% endblock %}

{% block content %}
<article class="ref">
  <h1>{{ info.id_name }}</h1>
  <p>Total time: <span class="total-time">{{ info.total_time }}</span></p>
  <p>Speedrun time: <span class="speedrun-total-time">{{ info.speedrun_total_time }}</span></p>
  <ul class="films">
  {% for film in info.films %}
    <li>{% if film.title %}{{ film.title }} {% endif %}{{ film.length }} ({{ film.speedrun_length }})</li>
  {% endfor %}
  </ul>
</article>
{% endblock %}"##;

const DOCUMENTS_TEMPLATE: &str = r##"{% extends "base.html" %}

{% block title %}{{ info.id_name }}{% endblock %}

{% block content %}
<article class="documents">
  <h1>{{ info.id_name }}</h1>
  {% for doc in md_materials %}
  <section class="document">{{ doc|safe }}</section>
  {% else %}
  <p>Nothing here yet.</p>
  {% endfor %}
</article>
{% endblock %}"##;
