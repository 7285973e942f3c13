//! Scoped styles
//!
//! Approximates style isolation without shadow DOM: selectors whose leading
//! compound is a bare element tag are qualified with the component's scope
//! class, and the component's top-level elements of those tags receive the
//! class. Descendant selectors (`ul li`) therefore only reach into the
//! component's own roots.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::BTreeSet;

lazy_static! {
    /// Leading compound of a selector: a lowercase tag, optionally followed
    /// by pseudo-classes/elements, and nothing else.
    static ref BARE_TAG_RE: Regex = Regex::new(r"^([a-z][a-z0-9-]*)((?::{1,2}[a-zA-Z-]+(?:\([^)]*\))?)*)$").unwrap();

    static ref TAG_RE: Regex = Regex::new(
        r#"<!--[\s\S]*?-->|<(/?)([A-Za-z][A-Za-z0-9-]*)((?:[^>"']|"[^"]*"|'[^']*')*?)(/?)>"#
    ).unwrap();

    static ref CLASS_ATTR_RE: Regex = Regex::new(r#"\bclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// At-rules whose block holds further style rules.
const NESTING_AT_RULES: &[&str] = &["@media", "@supports", "@container", "@layer", "@document"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedStyle {
    pub style: String,
    pub markup: String,
    /// Tags whose selectors were qualified.
    pub scoped_tags: BTreeSet<String>,
}

/// Rewrites `style` and `markup` so bare-tag rules only match the
/// component's own top-level elements.
pub fn scope_styles(style: &str, markup: &str, class: &str) -> ScopedStyle {
    let mut scoped_tags = BTreeSet::new();
    let style = scope_rules(style, class, &mut scoped_tags);
    let markup = inject_root_class(markup, class, &scoped_tags);

    ScopedStyle {
        style,
        markup,
        scoped_tags,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SELECTOR REWRITING
// ═══════════════════════════════════════════════════════════════════════════════

fn scope_rules(css: &str, class: &str, tags: &mut BTreeSet<String>) -> String {
    let mut out = String::with_capacity(css.len() + 32);
    let mut prelude = String::new();
    let mut rest = css;

    while let Some(c) = rest.chars().next() {
        if rest.starts_with("/*") {
            let end = rest.find("*/").map(|i| i + 2).unwrap_or(rest.len());
            prelude.push_str(&rest[..end]);
            rest = &rest[end..];
            continue;
        }

        match c {
            '{' => {
                let end = matching_brace(rest);
                let block = &rest[..end];
                let head = prelude.trim_start();

                if head.starts_with('@') {
                    out.push_str(&prelude);
                    if NESTING_AT_RULES.iter().any(|rule| head.starts_with(rule)) {
                        let inner_end = if block.ends_with('}') {
                            block.len() - 1
                        } else {
                            block.len()
                        };
                        out.push('{');
                        out.push_str(&scope_rules(&block[1..inner_end], class, tags));
                        out.push_str(&block[inner_end..]);
                    } else {
                        out.push_str(block);
                    }
                } else {
                    out.push_str(&scope_selector_list(&prelude, class, tags));
                    out.push_str(block);
                }

                prelude.clear();
                rest = &rest[end..];
            }
            ';' => {
                prelude.push(';');
                out.push_str(&prelude);
                prelude.clear();
                rest = &rest[1..];
            }
            _ => {
                prelude.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    out.push_str(&prelude);
    out
}

/// Byte offset just past the brace that closes the block opening at `s[0]`.
fn matching_brace(s: &str) -> usize {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
    }
    s.len()
}

fn scope_selector_list(prelude: &str, class: &str, tags: &mut BTreeSet<String>) -> String {
    prelude
        .split(',')
        .map(|selector| scope_selector(selector, class, tags))
        .collect::<Vec<_>>()
        .join(",")
}

fn scope_selector(selector: &str, class: &str, tags: &mut BTreeSet<String>) -> String {
    let body = selector.trim_start();
    let lead = &selector[..selector.len() - body.len()];

    let compound_len = body
        .find(|c: char| c.is_whitespace() || matches!(c, '>' | '+' | '~'))
        .unwrap_or(body.len());
    let (compound, tail) = body.split_at(compound_len);

    match BARE_TAG_RE.captures(compound) {
        Some(caps) => {
            let tag = &caps[1];
            tags.insert(tag.to_string());
            format!("{}{}.{}{}{}", lead, tag, class, &caps[2], tail)
        }
        None => selector.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROOT CLASS INJECTION
// ═══════════════════════════════════════════════════════════════════════════════

fn inject_root_class(markup: &str, class: &str, tags: &BTreeSet<String>) -> String {
    if tags.is_empty() {
        return markup.to_string();
    }

    let mut depth = 0usize;
    TAG_RE
        .replace_all(markup, |caps: &Captures| {
            let Some(name) = caps.get(2) else {
                return caps[0].to_string();
            };
            let name = name.as_str();
            let closing = !caps[1].is_empty();
            let self_closing = !caps[4].is_empty() || VOID_ELEMENTS.contains(&name);

            if closing {
                depth = depth.saturating_sub(1);
                return caps[0].to_string();
            }

            let at_root = depth == 0;
            if !self_closing {
                depth += 1;
            }

            if at_root && tags.contains(name) {
                format!(
                    "<{}{}{}>",
                    name,
                    add_class(&caps[3], class),
                    &caps[4]
                )
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

fn add_class(attrs: &str, class: &str) -> String {
    if CLASS_ATTR_RE.is_match(attrs) {
        CLASS_ATTR_RE
            .replacen(attrs, 1, |caps: &Captures| {
                let existing = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
                if existing.trim().is_empty() {
                    format!("class=\"{}\"", class)
                } else {
                    format!("class=\"{} {}\"", existing, class)
                }
            })
            .into_owned()
    } else {
        format!(" class=\"{}\"{}", class, attrs)
    }
}
