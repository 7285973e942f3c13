//! Base layout augmentation.
//!
//! The project's layout file is the shell every page renders through. For a
//! given page it gains one insertion point per component and fragment kind:
//! styles before `</head>`, the page content right after `<body>`, scripts
//! before `</body>`. Insertion points are partial blocks, so a fragment the
//! component never produced renders as nothing.

use lazy_static::lazy_static;
use regex::Regex;

use crate::component::Component;
use crate::fragment::FragmentKind;

lazy_static! {
    static ref HEAD_CLOSE_RE: Regex = Regex::new(r"(?i)</head\s*>").unwrap();
    static ref BODY_OPEN_RE: Regex = Regex::new(r"(?i)<body\b[^>]*>").unwrap();
    static ref BODY_CLOSE_RE: Regex = Regex::new(r"(?i)</body\s*>").unwrap();
}

/// Insertion point for one fragment: `{{#> css-x}}{{/css-x}}`.
pub fn insertion_point(kind: FragmentKind, scope_class: &str) -> String {
    let name = kind.name_for(scope_class);
    format!("{{{{#> {name}}}}}{{{{/{name}}}}}", name = name)
}

/// Inserts style/content/script insertion points for `page` and every
/// component in `flat` into `layout`.
pub fn augment_layout(layout: &str, page: &Component, flat: &[&Component]) -> String {
    let owners = || std::iter::once(page).chain(flat.iter().copied());

    let styles = block_lines(owners(), FragmentKind::Style);
    let scripts = block_lines(owners(), FragmentKind::Script);
    let content = format!("{}\n", insertion_point(FragmentKind::Content, &page.scope_class));

    let mut out = layout.to_string();

    out = match HEAD_CLOSE_RE.find(&out) {
        Some(m) => splice(&out, m.start(), &styles),
        None => {
            tracing::warn!("layout has no </head>; styles are placed at the top");
            format!("{}{}", styles, out)
        }
    };

    out = match BODY_OPEN_RE.find(&out) {
        Some(m) => splice(&out, m.end(), &format!("\n{}", content)),
        None => {
            tracing::warn!("layout has no <body>; page content is appended");
            format!("{}\n{}", out, content)
        }
    };

    // Last occurrence, so a literal `</body>` inside the page cannot capture the scripts.
    out = match BODY_CLOSE_RE.find_iter(&out).last() {
        Some(m) => splice(&out, m.start(), &scripts),
        None => {
            tracing::warn!("layout has no </body>; scripts are appended");
            format!("{}\n{}", out, scripts)
        }
    };

    out
}

fn block_lines<'a>(owners: impl Iterator<Item = &'a Component>, kind: FragmentKind) -> String {
    owners
        .map(|c| format!("{}\n", insertion_point(kind, &c.scope_class)))
        .collect()
}

fn splice(text: &str, at: usize, insert: &str) -> String {
    let mut out = String::with_capacity(text.len() + insert.len());
    out.push_str(&text[..at]);
    out.push_str(insert);
    out.push_str(&text[at..]);
    out
}
