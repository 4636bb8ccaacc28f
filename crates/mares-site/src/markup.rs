//! Lightweight markup to HTML conversion for freeform documents.
//!
//! This is plain text substitution, not a markdown parser. Four conversions
//! run in a fixed order, each on the output of the previous one:
//!
//! 1. `**strong**` pairs
//! 2. `"quoted"` pairs
//! 3. lines containing `#` become headings
//! 4. every line becomes a paragraph, blank lines become `<br>`
//!
//! Swapping the order changes which characters each step sees, so callers
//! should go through [`to_html`].

use std::fmt;

use serde::Serialize;

const STRONG_MARKER: &str = "**";
const QUOTE_MARKER: &str = "\"";

const STRONG_OPEN: &str = "<a class='font-extrabold'>";
const QUOTE_OPEN: &str = "<a class='font-bold'>";
const HEADING_OPEN: &str = "<a class='font-extrabold text-lg'>";
const INLINE_CLOSE: &str = "</a>";
const PARAGRAPH_OPEN: &str = "<p class='dark:text-gray-300 text-gray-600'>";
const PARAGRAPH_CLOSE: &str = "</p>";

/// A pairing conversion step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkupStep {
    Strong,
    Quote,
}

impl MarkupStep {
    fn marker(self) -> &'static str {
        match self {
            MarkupStep::Strong => STRONG_MARKER,
            MarkupStep::Quote => QUOTE_MARKER,
        }
    }
}

/// A conversion step that was skipped because its markers don't pair up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkupWarning {
    pub step: MarkupStep,
    /// Number of markers found (always odd)
    pub markers: usize,
}

impl fmt::Display for MarkupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unpaired {} marker ({} found), text left unconverted",
            self.step.marker(),
            self.markers
        )
    }
}

/// Converted HTML plus any steps that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversion {
    pub html: String,
    pub warnings: Vec<MarkupWarning>,
}

/// Run all four conversions in order.
pub fn to_html(text: &str) -> Conversion {
    let mut warnings = Vec::new();

    let text = convert_strong(text).unwrap_or_else(|w| {
        warnings.push(w);
        text.to_string()
    });
    let text = convert_quotes(&text).unwrap_or_else(|w| {
        warnings.push(w);
        text.clone()
    });
    let text = convert_headings(&text);

    Conversion {
        html: convert_paragraphs(&text),
        warnings,
    }
}

/// Wrap text between sequential `**` pairs in an extra-bold element.
///
/// Fails when the marker count is odd; the caller keeps the original text.
pub fn convert_strong(text: &str) -> Result<String, MarkupWarning> {
    wrap_pairs(text, MarkupStep::Strong, |inner, out| {
        out.push_str(STRONG_OPEN);
        out.push_str(inner);
        out.push_str(INLINE_CLOSE);
    })
}

/// Wrap sequential `"` pairs, quotes included, in a bold element.
pub fn convert_quotes(text: &str) -> Result<String, MarkupWarning> {
    wrap_pairs(text, MarkupStep::Quote, |inner, out| {
        out.push_str(QUOTE_OPEN);
        out.push('"');
        out.push_str(inner);
        out.push('"');
        out.push_str(INLINE_CLOSE);
    })
}

/// Strip `#` from any line containing one and wrap that line as a heading.
pub fn convert_headings(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.contains('#') {
                format!("{}{}{}", HEADING_OPEN, line.replace('#', ""), INLINE_CLOSE)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turn blank lines into `<br>` and wrap every line in a muted paragraph.
pub fn convert_paragraphs(text: &str) -> String {
    let text = text.replace("\n\n", "\n <br>");

    let mut html = String::with_capacity(text.len() * 2);
    for line in text.split('\n') {
        html.push_str(PARAGRAPH_OPEN);
        html.push_str(line);
        html.push_str(PARAGRAPH_CLOSE);
    }
    html
}

/// Split on a marker and wrap every odd segment.
fn wrap_pairs<F>(text: &str, step: MarkupStep, wrap: F) -> Result<String, MarkupWarning>
where
    F: Fn(&str, &mut String),
{
    let segments: Vec<&str> = text.split(step.marker()).collect();
    if segments.len() == 1 {
        return Ok(text.to_string());
    }

    // n markers give n + 1 segments
    if segments.len() % 2 == 0 {
        return Err(MarkupWarning {
            step,
            markers: segments.len() - 1,
        });
    }

    let mut out = String::with_capacity(text.len() + segments.len() * 16);
    for (i, segment) in segments.iter().enumerate() {
        if i % 2 == 1 {
            wrap(segment, &mut out);
        } else {
            out.push_str(segment);
        }
    }
    Ok(out)
}
