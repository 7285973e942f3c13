//! Template sets and their execution.
//!
//! A [`TemplateSet`] is the named-template output of composition: every
//! fragment of a page and its components, plus the augmented layout. It is
//! registered with a per-page handlebars registry to become a
//! [`CompiledPage`], which is immutable and cheap to execute repeatedly.

use handlebars::Handlebars;
use indexmap::IndexMap;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{GooError, Result};
use crate::fragment::{Fragment, FragmentKind};

/// Name of the augmented layout template; every page renders through it.
pub const BASE_TEMPLATE: &str = "base";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSet {
    templates: IndexMap<String, String>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a named template.
    pub fn insert(&mut self, name: impl Into<String>, body: impl Into<String>) -> Option<String> {
        self.templates.insert(name.into(), body.into())
    }

    /// Adds a fragment. Script and style bodies are wrapped in a raw block
    /// so braces in them are never read as template syntax.
    pub fn push_fragment(&mut self, fragment: Fragment) {
        let body = match fragment.kind {
            FragmentKind::Content => fragment.body,
            FragmentKind::Script | FragmentKind::Style => verbatim(&fragment.body),
        };
        self.templates.insert(fragment.name, body);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// The whole set as one template source: every template except `entry`
    /// as an inline definition, followed by the entry body.
    pub fn source(&self, entry: &str) -> String {
        let mut out = String::new();
        for (name, body) in &self.templates {
            if name == entry {
                continue;
            }
            out.push_str(&format!("{{{{#*inline \"{}\"}}}}\n{}\n{{{{/inline}}}}\n", name, body));
        }
        if let Some(body) = self.templates.get(entry) {
            out.push_str(body);
        }
        out
    }
}

/// `{{{{raw}}}}body{{{{/raw}}}}`: emitted as-is by the engine.
pub fn verbatim(body: &str) -> String {
    format!("{{{{{{{{raw}}}}}}}}{}{{{{{{{{/raw}}}}}}}}", body)
}

/// A fully registered, directly executable template set for one page.
pub struct CompiledPage {
    page: PathBuf,
    entry: String,
    set: TemplateSet,
    registry: Handlebars<'static>,
}

impl CompiledPage {
    /// Parses every template of `set`. Fails on the first template the
    /// engine rejects.
    pub fn register(page: &Path, set: TemplateSet, entry: &str) -> Result<Self> {
        let mut registry = Handlebars::new();

        for (name, body) in &set.templates {
            registry
                .register_template_string(name, body)
                .map_err(|e| GooError::TemplateCompositionFailure {
                    template: name.clone(),
                    source: Box::new(e),
                })?;
        }

        if !registry.has_template(entry) {
            return Err(GooError::malformed(
                page,
                format!("template set has no entry template '{}'", entry),
            ));
        }

        Ok(Self {
            page: page.to_path_buf(),
            entry: entry.to_string(),
            set,
            registry,
        })
    }

    pub fn page(&self) -> &Path {
        &self.page
    }

    pub fn template_set(&self) -> &TemplateSet {
        &self.set
    }

    /// Template source of the whole page, for inspection.
    pub fn source(&self) -> String {
        self.set.source(&self.entry)
    }

    pub fn render<T: Serialize>(&self, data: &T) -> Result<String> {
        self.registry
            .render(&self.entry, data)
            .map_err(|e| self.render_failure(e))
    }

    /// Streams the rendered page into `writer`.
    pub fn render_to<T: Serialize, W: Write>(&self, data: &T, writer: W) -> Result<()> {
        self.registry
            .render_to_write(&self.entry, data, writer)
            .map_err(|e| self.render_failure(e))
    }

    fn render_failure(&self, e: handlebars::RenderError) -> GooError {
        GooError::RenderFailure {
            page: self.page.clone(),
            source: Box::new(e),
        }
    }
}

impl std::fmt::Debug for CompiledPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledPage")
            .field("page", &self.page)
            .field("entry", &self.entry)
            .field("templates", &self.set.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_includes_and_missing_blocks() {
        let mut set = TemplateSet::new();
        set.insert("content-c1", "<p>{{title}}</p>");
        set.insert(
            BASE_TEMPLATE,
            "<body>{{#> css-c1}}{{/css-c1}}{{> content-c1}}</body>",
        );

        let page = CompiledPage::register(Path::new("page.goo"), set, BASE_TEMPLATE).unwrap();
        let html = page.render(&json!({ "title": "<Hi>" })).unwrap();
        assert_eq!(html, "<body><p>&lt;Hi&gt;</p></body>");
    }

    #[test]
    fn test_unparseable_template_is_composition_failure() {
        let mut set = TemplateSet::new();
        set.insert(BASE_TEMPLATE, "{{#if}}never closed");

        let err = CompiledPage::register(Path::new("page.goo"), set, BASE_TEMPLATE).unwrap_err();
        assert!(matches!(
            err,
            GooError::TemplateCompositionFailure { ref template, .. } if template == BASE_TEMPLATE
        ));
    }

    #[test]
    fn test_source_lists_definitions_before_entry() {
        let mut set = TemplateSet::new();
        set.insert(BASE_TEMPLATE, "{{> content-a}}");
        set.insert("content-a", "A");
        assert_eq!(
            set.source(BASE_TEMPLATE),
            "{{#*inline \"content-a\"}}\nA\n{{/inline}}\n{{> content-a}}"
        );
    }

    #[test]
    fn test_script_and_style_braces_are_not_template_syntax() {
        let mut set = TemplateSet::new();
        set.push_fragment(Fragment {
            kind: FragmentKind::Script,
            name: "js-c1".to_string(),
            body: "<script>\nif (a) {{ b(); }}\n</script>".to_string(),
        });
        set.push_fragment(Fragment {
            kind: FragmentKind::Style,
            name: "css-c1".to_string(),
            body: "<style>\np { content: \"{{x}}\"; }\n</style>".to_string(),
        });
        set.insert(BASE_TEMPLATE, "{{#> css-c1}}{{/css-c1}}{{#> js-c1}}{{/js-c1}}");

        let page = CompiledPage::register(Path::new("page.goo"), set, BASE_TEMPLATE).unwrap();
        let html = page.render(&json!({ "x": "no" })).unwrap();
        assert!(html.contains("<style>\np { content: \"{{x}}\"; }\n</style>"), "{}", html);
        assert!(html.contains("<script>\nif (a) {{ b(); }}\n</script>"), "{}", html);
        assert!(!html.contains("raw"));
    }

    #[test]
    fn test_render_to_writer() {
        let mut set = TemplateSet::new();
        set.insert(BASE_TEMPLATE, "hello {{name}}");
        let page = CompiledPage::register(Path::new("p.goo"), set, BASE_TEMPLATE).unwrap();

        let mut out = Vec::new();
        page.render_to(&json!({ "name": "goo" }), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "hello goo");
    }
}
