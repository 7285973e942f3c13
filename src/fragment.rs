//! Template fragment generation.
//!
//! Each component compiles to up to three independently addressable
//! fragments, named after the component's scope class:
//!
//! - `js-<scope>`: the cleaned script inside `<script>` tags
//! - `content-<scope>`: the markup
//! - `css-<scope>`: the style inside `<style>` tags
//!
//! Empty sections contribute no fragment.

use serde::Serialize;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FragmentKind {
    Script,
    Content,
    Style,
}

impl FragmentKind {
    pub fn prefix(self) -> &'static str {
        match self {
            FragmentKind::Script => "js",
            FragmentKind::Content => "content",
            FragmentKind::Style => "css",
        }
    }

    /// Fragment name for a scope class, e.g. `content-goo-x1y2`.
    pub fn name_for(self, scope_class: &str) -> String {
        format!("{}-{}", self.prefix(), scope_class)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    pub kind: FragmentKind,
    pub name: String,
    pub body: String,
}

impl Fragment {
    fn new(kind: FragmentKind, scope_class: &str, body: String) -> Self {
        Self {
            kind,
            name: kind.name_for(scope_class),
            body,
        }
    }

    /// The fragment as an inline definition in template source form.
    pub fn definition(&self) -> String {
        format!("{{{{#*inline \"{}\"}}}}\n{}\n{{{{/inline}}}}\n", self.name, self.body)
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.definition())
    }
}

/// Custom element a component is wrapped in when web-component output is on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomElement {
    pub tag: String,
    pub class_name: String,
}

impl CustomElement {
    /// Derives `goo-<segments>` from the source path relative to `app_dir`,
    /// with the extension dropped and separators turned into dashes.
    pub fn for_path(path: &Path, app_dir: &Path) -> Self {
        let relative = path.strip_prefix(app_dir).unwrap_or(path);
        let stem = relative.with_extension("");
        let segments: String = stem
            .to_string_lossy()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        let tag = format!("goo-{}", segments.trim_matches('-'));
        let class_name = to_pascal_case(&tag);
        Self { tag, class_name }
    }

    fn wrap_script(&self, script: &str) -> String {
        format!(
            "class {name} extends HTMLElement {{\nstatic observedAttributes = [\"name\"];\n\nconstructor() {{\nsuper();\n\n{body}\n}}\n}}\n\ncustomElements.define(\"{tag}\", {name});",
            name = self.class_name,
            body = script,
            tag = self.tag
        )
    }

    fn wrap_markup(&self, markup: &str) -> String {
        format!("<{tag}>\n{markup}\n</{tag}>", tag = self.tag, markup = markup)
    }
}

/// Builds the fragment set for one component.
///
/// `element` is only applied when the component has a script; a
/// script-less component has nothing to attach to the element.
pub fn generate_fragments(
    scope_class: &str,
    script: &str,
    markup: &str,
    style: &str,
    element: Option<&CustomElement>,
) -> Vec<Fragment> {
    let mut fragments = Vec::with_capacity(3);
    let element = element.filter(|_| !script.trim().is_empty());

    if !script.trim().is_empty() {
        let body = match element {
            Some(el) => el.wrap_script(script.trim()),
            None => script.trim().to_string(),
        };
        fragments.push(Fragment::new(
            FragmentKind::Script,
            scope_class,
            format!("<script>\n{}\n</script>", body),
        ));
    }

    if !markup.trim().is_empty() {
        let body = match element {
            Some(el) => el.wrap_markup(markup.trim()),
            None => markup.trim().to_string(),
        };
        fragments.push(Fragment::new(FragmentKind::Content, scope_class, body));
    }

    if !style.trim().is_empty() {
        fragments.push(Fragment::new(
            FragmentKind::Style,
            scope_class,
            format!("<style>\n{}\n</style>", style.trim()),
        ));
    }

    fragments
}

/// Converts `goo-nav_bar.item` style names to `GooNavBarItem`.
///
/// Digits force the next letter upper-case and capitals following a
/// capital are lowered (`user-ID` becomes `UserId`).
pub fn to_pascal_case(s: &str) -> String {
    let s = s.trim();
    let mut out = String::with_capacity(s.len());
    let mut cap_next = true;
    let mut prev_is_cap = false;

    for c in s.chars() {
        let is_cap = c.is_ascii_uppercase();
        let is_low = c.is_ascii_lowercase();

        if is_cap || is_low {
            let c = if cap_next {
                c.to_ascii_uppercase()
            } else if prev_is_cap && is_cap {
                c.to_ascii_lowercase()
            } else {
                c
            };
            out.push(c);
            cap_next = false;
        } else if c.is_ascii_digit() {
            out.push(c);
            cap_next = true;
        } else {
            cap_next = matches!(c, '_' | ' ' | '-' | '.');
        }
        prev_is_cap = is_cap;
    }

    out
}
