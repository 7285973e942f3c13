//! Import scanning for component scripts.
//!
//! A component script references sibling components with ES-style import
//! lines (`import Card from './card.goo';`). Those lines are lifted out of
//! the script, since they must never reach the browser, and turned into
//! [`ImportReference`]s that drive recursive compilation.

use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Component as PathComponent, Path, PathBuf};

use crate::error::{GooError, Result};

lazy_static! {
    static ref IMPORT_LINE_RE: Regex =
        Regex::new(r#"^\s*import\s+(.+?)\s+from\s+['"]([^'"]+)['"]\s*;?\s*(?://.*|/\*.*\*/\s*)?$"#)
            .unwrap();
    static ref CAPITALIZED_RE: Regex = Regex::new(r"^[A-Z][A-Za-z0-9_$]*$").unwrap();
}

/// One component import line: the raw path operand and the capitalised
/// symbols it binds, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReference {
    pub raw_path: String,
    pub names: Vec<String>,
}

impl ImportReference {
    /// The name the imported component is referenced by in markup.
    pub fn display_name(&self) -> &str {
        &self.names[0]
    }
}

/// Script text with component imports stripped, plus the imports found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedScript {
    pub cleaned: String,
    pub imports: Vec<ImportReference>,
}

pub trait ImportScanner: Send + Sync {
    fn scan(&self, script: &str, path: &Path) -> Result<ScannedScript>;
}

/// Line-oriented scanner. Only imports whose path ends in the component
/// extension are treated as component imports; any other line, import or
/// not, passes through verbatim.
#[derive(Debug, Clone)]
pub struct LineImportScanner {
    extension: String,
}

impl LineImportScanner {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    fn is_component_path(&self, raw: &str) -> bool {
        Path::new(raw)
            .extension()
            .map(|ext| ext == self.extension.as_str())
            .unwrap_or(false)
    }
}

impl Default for LineImportScanner {
    fn default() -> Self {
        Self::new("goo")
    }
}

impl ImportScanner for LineImportScanner {
    fn scan(&self, script: &str, path: &Path) -> Result<ScannedScript> {
        let mut kept = Vec::new();
        let mut imports = Vec::new();

        for line in script.lines() {
            let Some(caps) = IMPORT_LINE_RE.captures(line) else {
                kept.push(line);
                continue;
            };
            let raw_path = &caps[2];
            if !self.is_component_path(raw_path) {
                kept.push(line);
                continue;
            }

            let names = binding_names(&caps[1]);
            if names.is_empty() {
                return Err(GooError::malformed(
                    path,
                    format!("import of '{}' binds no capitalized component name", raw_path),
                ));
            }

            imports.push(ImportReference {
                raw_path: raw_path.to_string(),
                names,
            });
        }

        Ok(ScannedScript {
            cleaned: kept.join("\n").trim().to_string(),
            imports,
        })
    }
}

/// Capitalised names bound by an import clause. Handles default bindings,
/// brace lists and `X as Y` renames (the local name wins).
fn binding_names(binding: &str) -> Vec<String> {
    binding
        .split(|c| c == ',' || c == '{' || c == '}')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| match item.rsplit_once(" as ") {
            Some((_, local)) => local.trim(),
            None => item,
        })
        .filter(|name| CAPITALIZED_RE.is_match(name))
        .map(str::to_string)
        .collect()
}

/// Resolves an import path relative to the directory of the importing file.
///
/// Normalisation is lexical (no filesystem access) so that `./a/../b.goo`
/// and `./b.goo` produce the same identity key.
pub fn resolve_import_path(importer: &Path, raw: &str) -> PathBuf {
    let base = importer.parent().unwrap_or_else(|| Path::new(""));
    normalize_path(&base.join(raw))
}

pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for part in path.components() {
        match part {
            PathComponent::CurDir => {}
            PathComponent::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(PathComponent::Normal(_))
                ) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
