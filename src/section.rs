//! Section Extraction
//!
//! Splits a raw component source into its script, style and markup regions.
//! The regions are delimited by literal marker tags; everything outside the
//! markers is ignored.

use std::path::Path;

use crate::error::{GooError, Result};

/// The three text regions of a component source, trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    pub script: String,
    pub style: String,
    pub markup: String,
    /// Whether the markup delimiters were present at all (an empty
    /// `<component></component>` still counts).
    pub has_markup: bool,
}

/// Splits a component source into sections.
///
/// Kept behind a trait so the marker scan can be swapped for a real lexer
/// without touching the compiler.
pub trait SectionExtractor: Send + Sync {
    fn extract(&self, source: &str, path: &Path) -> Result<Sections>;
}

/// Open/close marker pair for one section.
#[derive(Debug, Clone, Copy)]
pub struct Markers {
    pub open: &'static str,
    pub close: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct MarkerSectionExtractor {
    pub script: Markers,
    pub style: Markers,
    pub markup: Markers,
}

impl Default for MarkerSectionExtractor {
    fn default() -> Self {
        Self {
            script: Markers {
                open: "<script>",
                close: "</script>",
            },
            style: Markers {
                open: "<style>",
                close: "</style>",
            },
            markup: Markers {
                open: "<component>",
                close: "</component>",
            },
        }
    }
}

impl SectionExtractor for MarkerSectionExtractor {
    fn extract(&self, source: &str, path: &Path) -> Result<Sections> {
        let script = string_between(source, self.script, path)?;
        let style = string_between(source, self.style, path)?;
        let markup = string_between(source, self.markup, path)?;

        Ok(Sections {
            script: script.map(str::trim).unwrap_or_default().to_string(),
            style: style.map(str::trim).unwrap_or_default().to_string(),
            has_markup: markup.is_some(),
            markup: markup.map(str::trim).unwrap_or_default().to_string(),
        })
    }
}

/// Returns the text strictly between the first `open` marker and the next
/// `close` marker after it.
///
/// `Ok(None)` when the section is absent; an error when it is opened but
/// never closed.
fn string_between<'a>(source: &'a str, markers: Markers, path: &Path) -> Result<Option<&'a str>> {
    let Some(start) = source.find(markers.open) else {
        return Ok(None);
    };
    let body_start = start + markers.open.len();

    match source[body_start..].find(markers.close) {
        Some(len) => Ok(Some(&source[body_start..body_start + len])),
        None => Err(GooError::malformed(
            path,
            format!("{} is opened but never closed", markers.open),
        )),
    }
}
