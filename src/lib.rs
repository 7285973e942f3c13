//! # Goo Component Compiler
//!
//! Compiles single-file components (`.goo` files with `<script>`, `<style>`
//! and `<component>` sections) into named template fragments, composes a
//! page with everything it imports into one template set rendered through
//! the project's base layout, and caches the executable result per page.
//!
//! ## Pipeline
//!
//! 1. **Sections**: split a source into script, style and markup.
//! 2. **Imports**: strip component imports from the script and resolve
//!    them relative to the importing file.
//! 3. **Components**: compile the page and its imports into an arena
//!    keyed by source path, then flatten it.
//! 4. **Fragments**: one `js-`, `content-` and `css-` template per
//!    component, named after its scope class.
//! 5. **Rewrite**: replace component tags with includes of their content.
//! 6. **Layout**: add insertion points for every fragment to the base layout.
//! 7. **Cache**: register the set once, render it on every request.

mod cache;
mod component;
mod config;
mod discovery;
mod error;
mod fragment;
mod imports;
mod layout;
mod logging;
mod rewrite;
mod section;
mod service;
mod style;
mod template;

#[cfg(feature = "server")]
pub mod server;


pub use cache::{CacheEntry, CacheStats, TemplateCache};
pub use component::{
    CompileOptions, Component, ComponentCompiler, ComponentGraph, ScopeStrategy,
};
pub use config::{GooConfig, ServerConfig, CONFIG_FILE};
pub use discovery::{discover_routes, route_path, validate_structure, ProjectStructure, Route};
pub use error::*;
pub use fragment::{generate_fragments, to_pascal_case, CustomElement, Fragment, FragmentKind};
pub use imports::{
    normalize_path, resolve_import_path, ImportReference, ImportScanner, LineImportScanner,
    ScannedScript,
};
pub use layout::{augment_layout, insertion_point};
pub use logging::init_logging;
pub use rewrite::{compose_page, include_for, RegexTagMatcher, TagMatcher};
pub use section::{MarkerSectionExtractor, Markers, SectionExtractor, Sections};
pub use service::{CompilerService, ServiceStats, WarmReport, PAGE_COMPONENT};
pub use style::{scope_styles, ScopedStyle};
pub use template::{CompiledPage, TemplateSet, BASE_TEMPLATE};
