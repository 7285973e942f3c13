//! Tag rewriting and page composition.
//!
//! Component tags in markup (`<Card>...</Card>` or `<Card/>`) are replaced
//! with includes of the component's content fragment. The rewrite runs over
//! the page and over every component in the flattened collection, so a
//! component used inside another component resolves without any recursive
//! lookup at render time.

use regex::{NoExpand, Regex};

use crate::component::Component;
use crate::fragment::{Fragment, FragmentKind};
use crate::template::TemplateSet;

/// Finds and replaces the tags referencing one component.
pub trait TagMatcher: Sized {
    fn for_component(name: &str) -> Self;

    /// Replaces every matching tag with `replacement`; returns the new text
    /// and the number of tags replaced.
    fn replace(&self, text: &str, replacement: &str) -> (String, usize);
}

/// Regex pass recognising a paired form (inner content is discarded) and a
/// self-closing form. The name must end at whitespace, `>` or `/>`, so
/// `<Card/>` does not match `<CardList/>`.
#[derive(Debug, Clone)]
pub struct RegexTagMatcher {
    re: Regex,
}

impl TagMatcher for RegexTagMatcher {
    fn for_component(name: &str) -> Self {
        let name = regex::escape(name);
        let pattern = format!(
            r"(?s)<{name}(?:\s[^>]*[^/>]|\s+)?>.*?</{name}\s*>|<{name}(?:\s[^>]*)?/>",
            name = name
        );
        let re = Regex::new(&pattern).expect("escaped component name forms a valid pattern");
        Self { re }
    }

    fn replace(&self, text: &str, replacement: &str) -> (String, usize) {
        let count = self.re.find_iter(text).count();
        if count == 0 {
            return (text.to_string(), 0);
        }
        (
            self.re.replace_all(text, NoExpand(replacement)).into_owned(),
            count,
        )
    }
}

/// Include reference for a component's content, or nothing when the
/// component has no markup.
pub fn include_for(component: &Component) -> String {
    match component.fragment(FragmentKind::Content) {
        Some(fragment) => format!("{{{{> {}}}}}", fragment.name),
        None => String::new(),
    }
}

/// Rewrites the page and every flattened component against each other and
/// collects all of their fragments into one template set.
///
/// Fragments are collected only after every rewrite pass, so no fragment is
/// captured while it still holds an unresolved tag.
pub fn compose_page<M: TagMatcher>(page: &Component, flat: &[&Component]) -> TemplateSet {
    let mut page_fragments = page.fragments.clone();
    let mut component_fragments: Vec<Vec<Fragment>> =
        flat.iter().map(|c| c.fragments.clone()).collect();

    for (i, target) in flat.iter().enumerate() {
        let replacement = include_for(target);

        for name in target.names() {
            let matcher = M::for_component(name);
            let mut replaced = rewrite_content(&mut page_fragments, &matcher, &replacement);
            for (j, fragments) in component_fragments.iter_mut().enumerate() {
                if j != i {
                    replaced += rewrite_content(fragments, &matcher, &replacement);
                }
            }

            tracing::trace!(component = %target.name, tag = name, replaced, "rewrote component tags");
        }
    }

    let mut set = TemplateSet::new();
    for fragment in page_fragments
        .into_iter()
        .chain(component_fragments.into_iter().flatten())
    {
        set.push_fragment(fragment);
    }
    set
}

fn rewrite_content<M: TagMatcher>(fragments: &mut [Fragment], matcher: &M, replacement: &str) -> usize {
    let Some(content) = fragments.iter_mut().find(|f| f.kind == FragmentKind::Content) else {
        return 0;
    };
    let (body, count) = matcher.replace(&content.body, replacement);
    if count > 0 {
        content.body = body;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::generate_fragments;
    use std::path::PathBuf;

    fn component(name: &str, class: &str, markup: &str) -> Component {
        Component {
            name: name.to_string(),
            source_path: PathBuf::from(format!("{}.goo", name.to_lowercase())),
            raw_source: String::new(),
            script: String::new(),
            style: String::new(),
            markup: markup.to_string(),
            scope_class: class.to_string(),
            fragments: generate_fragments(class, "", markup, "", None),
            children: Vec::new(),
            descendants: Vec::new(),
            aliases: Vec::new(),
            modified: None,
        }
    }

    #[test]
    fn test_self_closing_tag_is_replaced_once() {
        let matcher = RegexTagMatcher::for_component("Foo");
        let (out, count) = matcher.replace("<div><Foo/></div>", "{{> content-c1}}");
        assert_eq!(out, "<div>{{> content-c1}}</div>");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_paired_and_attribute_forms() {
        let matcher = RegexTagMatcher::for_component("Foo");
        let (out, count) = matcher.replace(
            "<Foo>ignored</Foo>\n<Foo title=\"x\" />\n<Foo a=\"1\"></Foo >",
            "X",
        );
        assert_eq!(out, "X\nX\nX");
        assert_eq!(count, 3);
    }

    #[test]
    fn test_prefix_names_do_not_match() {
        let matcher = RegexTagMatcher::for_component("Card");
        let (out, count) = matcher.replace("<CardList/><Card/>", "X");
        assert_eq!(out, "<CardList/>X");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_self_closing_is_not_paired_with_later_close() {
        let matcher = RegexTagMatcher::for_component("Foo");
        let (out, _) = matcher.replace("<Foo /><p>keep</p><Foo></Foo>", "X");
        assert_eq!(out, "X<p>keep</p>X");
    }

    #[test]
    fn test_nested_components_resolve_in_one_pass() {
        let page = component("Page", "p0", "<main><A/></main>");
        let a = component("A", "a1", "<section><B/></section>");
        let b = component("B", "b2", "<i>leaf</i>");

        let set = compose_page::<RegexTagMatcher>(&page, &[&a, &b]);
        assert_eq!(set.get("content-p0"), Some("<main>{{> content-a1}}</main>"));
        assert_eq!(set.get("content-a1"), Some("<section>{{> content-b2}}</section>"));
        assert_eq!(set.get("content-b2"), Some("<i>leaf</i>"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_every_alias_is_rewritten() {
        let page = component("Page", "p0", "<Card/><div><Tile/></div>");
        let mut card = component("Card", "c1", "<b>card</b>");
        card.aliases.push("Tile".to_string());

        let set = compose_page::<RegexTagMatcher>(&page, &[&card]);
        assert_eq!(
            set.get("content-p0"),
            Some("{{> content-c1}}<div>{{> content-c1}}</div>")
        );
    }

    #[test]
    fn test_component_without_markup_tag_is_removed() {
        let page = component("Page", "p0", "<main><Tracker/></main>");
        let mut tracker = component("Tracker", "t1", "");
        tracker.fragments = generate_fragments("t1", "track();", "", "", None);

        let set = compose_page::<RegexTagMatcher>(&page, &[&tracker]);
        assert_eq!(set.get("content-p0"), Some("<main></main>"));
        assert!(set.contains("js-t1"));
    }
}
