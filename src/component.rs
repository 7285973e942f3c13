//! Component compilation.
//!
//! A page and everything it imports are compiled into a [`ComponentGraph`]:
//! an arena of components keyed by normalised source path. Each source is
//! read and parsed at most once per compilation pass, however many import
//! sites reference it. Children are referenced by key, never by pointer,
//! and every component also records its flattened set of transitive
//! descendants so later stages can work over a flat collection.

use indexmap::IndexMap;
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{GooError, Result};
use crate::fragment::{generate_fragments, CustomElement, Fragment, FragmentKind};
use crate::imports::{normalize_path, resolve_import_path, ImportScanner};
use crate::section::SectionExtractor;
use crate::style::scope_styles;

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct Component {
    /// Symbol used to reference the component from markup.
    pub name: String,
    /// Identity key.
    pub source_path: PathBuf,
    pub raw_source: String,
    /// Script with component imports stripped.
    pub script: String,
    pub style: String,
    pub markup: String,
    pub scope_class: String,
    pub fragments: Vec<Fragment>,
    /// Immediate imports, in import order.
    pub children: Vec<PathBuf>,
    /// Every component transitively reachable from this one, deduplicated,
    /// in first-reached order.
    pub descendants: Vec<PathBuf>,
    /// Further names other importers bind this source to.
    pub aliases: Vec<String>,
    /// Modification time of the source when it was read.
    pub modified: Option<SystemTime>,
}

impl Component {
    /// Every name the component is referenced by in markup, primary first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn fragment(&self, kind: FragmentKind) -> Option<&Fragment> {
        self.fragments.iter().find(|f| f.kind == kind)
    }

    pub fn fragment_mut(&mut self, kind: FragmentKind) -> Option<&mut Fragment> {
        self.fragments.iter_mut().find(|f| f.kind == kind)
    }

    /// The component's fragments in template source form.
    pub fn template(&self) -> String {
        self.fragments.iter().map(Fragment::definition).collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GRAPH
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct ComponentGraph {
    components: IndexMap<PathBuf, Component>,
}

impl ComponentGraph {
    pub fn get(&self, path: &Path) -> Option<&Component> {
        self.components.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.components.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Every source path in the graph, with the modification time recorded
    /// when it was read.
    pub fn sources(&self) -> Vec<(PathBuf, Option<SystemTime>)> {
        self.components
            .values()
            .map(|c| (c.source_path.clone(), c.modified))
            .collect()
    }

    /// The flat, deduplicated collection of components reachable from
    /// `root` (the root itself excluded).
    ///
    /// Fails when two distinct sources are referenced under the same name,
    /// since tag rewriting could not tell them apart.
    pub fn flatten(&self, root: &Path) -> Result<Vec<&Component>> {
        let Some(root) = self.components.get(root) else {
            return Ok(Vec::new());
        };

        let mut by_name: IndexMap<&str, &Path> = IndexMap::new();
        let mut flat = Vec::with_capacity(root.descendants.len());

        for path in &root.descendants {
            let Some(component) = self.components.get(path) else {
                continue;
            };
            for name in component.names() {
                if let Some(first) = by_name.insert(name, &component.source_path) {
                    if first != component.source_path.as_path() {
                        return Err(GooError::AmbiguousComponentName {
                            name: name.to_string(),
                            first: first.to_path_buf(),
                            second: component.source_path.clone(),
                        });
                    }
                }
            }
            flat.push(component);
        }

        Ok(flat)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeStrategy {
    /// Fresh random class for every compiled instance.
    #[default]
    Random,
    /// Derived from the source path; stable across compiles.
    Hashed,
}

const SCOPE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SCOPE_LEN: usize = 8;

impl ScopeStrategy {
    pub fn scope_class(self, path: &Path) -> String {
        let suffix: String = match self {
            ScopeStrategy::Random => {
                let mut rng = rand::thread_rng();
                (0..SCOPE_LEN)
                    .map(|_| SCOPE_ALPHABET[rng.gen_range(0..SCOPE_ALPHABET.len())] as char)
                    .collect()
            }
            ScopeStrategy::Hashed => {
                let mut hasher = Sha256::new();
                hasher.update(path.to_string_lossy().as_bytes());
                format!("{:x}", hasher.finalize())[..SCOPE_LEN].to_string()
            }
        };
        format!("goo-{}", suffix)
    }
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub scoped_styles: bool,
    pub scope_strategy: ScopeStrategy,
    /// App folder used to name custom elements; `None` disables wrapping.
    pub web_components: Option<PathBuf>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            scoped_styles: true,
            scope_strategy: ScopeStrategy::Random,
            web_components: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER
// ═══════════════════════════════════════════════════════════════════════════════

/// One compilation pass. Holds the arena being built and the stack of
/// sources currently being compiled (for cycle detection).
pub struct ComponentCompiler<'a> {
    extractor: &'a dyn SectionExtractor,
    scanner: &'a dyn ImportScanner,
    options: &'a CompileOptions,
    graph: ComponentGraph,
    in_progress: Vec<PathBuf>,
}

impl<'a> ComponentCompiler<'a> {
    pub fn new(
        extractor: &'a dyn SectionExtractor,
        scanner: &'a dyn ImportScanner,
        options: &'a CompileOptions,
    ) -> Self {
        Self {
            extractor,
            scanner,
            options,
            graph: ComponentGraph::default(),
            in_progress: Vec::new(),
        }
    }

    /// Compiles a page entry point. Pages must have markup delimiters.
    pub fn compile_page(&mut self, path: &Path, name: &str) -> Result<PathBuf> {
        self.compile_source(path, name, true)
    }

    /// Compiles a component (and, recursively, its imports) into the graph
    /// and returns its key. Already-compiled sources are reused.
    pub fn compile(&mut self, path: &Path, name: &str) -> Result<PathBuf> {
        self.compile_source(path, name, false)
    }

    pub fn graph(&self) -> &ComponentGraph {
        &self.graph
    }

    pub fn into_graph(self) -> ComponentGraph {
        self.graph
    }

    fn compile_source(&mut self, path: &Path, name: &str, require_markup: bool) -> Result<PathBuf> {
        let key = normalize_path(path);

        if let Some(existing) = self.graph.components.get_mut(&key) {
            if !existing.names().any(|n| n == name) {
                tracing::debug!(
                    path = %key.display(),
                    name = %existing.name,
                    alias = %name,
                    "component bound to another name"
                );
                existing.aliases.push(name.to_string());
            }
            return Ok(key);
        }
        if self.in_progress.contains(&key) {
            return Err(GooError::CyclicImport { path: key });
        }

        let raw_source = fs::read_to_string(&key).map_err(|source| GooError::SourceNotFound {
            path: key.clone(),
            source,
        })?;
        let modified = fs::metadata(&key).and_then(|m| m.modified()).ok();

        let sections = self.extractor.extract(&raw_source, &key)?;
        if require_markup && !sections.has_markup {
            return Err(GooError::malformed(&key, "page has no <component> section"));
        }

        let scanned = self.scanner.scan(&sections.script, &key)?;

        self.in_progress.push(key.clone());
        let mut children: Vec<PathBuf> = Vec::with_capacity(scanned.imports.len());
        for import in &scanned.imports {
            let resolved = resolve_import_path(&key, &import.raw_path);
            let child = self
                .compile_source(&resolved, import.display_name(), false)
                .map_err(|e| GooError::ImportResolutionFailure {
                    importer: key.clone(),
                    import: import.raw_path.clone(),
                    source: Box::new(e),
                });
            let child = match child {
                Ok(child) => child,
                Err(e) => {
                    self.in_progress.pop();
                    return Err(e);
                }
            };
            if !children.contains(&child) {
                children.push(child);
            }
        }
        self.in_progress.pop();

        let descendants = self.flatten_children(&children);

        let scope_class = self.options.scope_strategy.scope_class(&key);
        let (style, markup) = if self.options.scoped_styles && !sections.style.is_empty() {
            let scoped = scope_styles(&sections.style, &sections.markup, &scope_class);
            (scoped.style, scoped.markup)
        } else {
            (sections.style, sections.markup)
        };

        let element = self
            .options
            .web_components
            .as_deref()
            .map(|app_dir| CustomElement::for_path(&key, app_dir));
        let fragments =
            generate_fragments(&scope_class, &scanned.cleaned, &markup, &style, element.as_ref());

        tracing::debug!(
            path = %key.display(),
            name,
            scope = %scope_class,
            children = children.len(),
            descendants = descendants.len(),
            fragments = fragments.len(),
            "compiled component"
        );

        self.graph.components.insert(
            key.clone(),
            Component {
                name: name.to_string(),
                source_path: key.clone(),
                raw_source,
                script: scanned.cleaned,
                style,
                markup,
                scope_class,
                fragments,
                children,
                descendants,
                aliases: Vec::new(),
                modified,
            },
        );

        Ok(key)
    }

    /// Promotes each child's descendants next to the child itself.
    fn flatten_children(&self, children: &[PathBuf]) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut flat = Vec::new();

        for child in children {
            let Some(component) = self.graph.get(child) else {
                continue;
            };
            for path in std::iter::once(child).chain(component.descendants.iter()) {
                if seen.insert(path.clone()) {
                    flat.push(path.clone());
                }
            }
        }

        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::LineImportScanner;
    use crate::section::MarkerSectionExtractor;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, rel: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    fn compile(page: &Path) -> Result<(PathBuf, ComponentGraph)> {
        let extractor = MarkerSectionExtractor::default();
        let scanner = LineImportScanner::default();
        let options = CompileOptions::default();
        let mut compiler = ComponentCompiler::new(&extractor, &scanner, &options);
        let key = compiler.compile_page(page, "Page")?;
        Ok((key, compiler.into_graph()))
    }

    #[test]
    fn test_nested_imports_are_flattened() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.goo", "<component><i>b</i></component>");
        write(
            &dir,
            "a.goo",
            "<script>\nimport B from './b.goo';\n</script>\n<component><B/></component>",
        );
        let page = write(
            &dir,
            "page.goo",
            "<script>\nimport A from './a.goo';\n</script>\n<component><A/></component>",
        );

        let (key, graph) = compile(&page).unwrap();
        let flat = graph.flatten(&key).unwrap();
        let names: Vec<_> = flat.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.get(&key).unwrap().children.len(), 1);
    }

    #[test]
    fn test_shared_import_is_compiled_once() {
        let dir = TempDir::new().unwrap();
        write(&dir, "shared.goo", "<component><hr/></component>");
        write(
            &dir,
            "left.goo",
            "<script>\nimport Shared from './shared.goo';\n</script>\n<component><Shared/></component>",
        );
        write(
            &dir,
            "sub/right.goo",
            "<script>\nimport Shared from '../shared.goo';\n</script>\n<component><Shared/></component>",
        );
        let page = write(
            &dir,
            "page.goo",
            "<script>\nimport Left from './left.goo';\nimport Right from './sub/right.goo';\n</script>\n<component><Left/><Right/></component>",
        );

        let (key, graph) = compile(&page).unwrap();
        let flat = graph.flatten(&key).unwrap();
        assert_eq!(flat.len(), 3);
        assert_eq!(flat.iter().filter(|c| c.name == "Shared").count(), 1);

        let left = flat.iter().find(|c| c.name == "Left").unwrap();
        let right = flat.iter().find(|c| c.name == "Right").unwrap();
        assert_eq!(left.children, right.children);
    }

    #[test]
    fn test_missing_import_wraps_cause() {
        let dir = TempDir::new().unwrap();
        let page = write(
            &dir,
            "page.goo",
            "<script>\nimport Gone from './gone.goo';\n</script>\n<component><Gone/></component>",
        );

        let err = compile(&page).unwrap_err();
        match &err {
            GooError::ImportResolutionFailure { import, .. } => assert_eq!(import, "./gone.goo"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(err.root_cause(), GooError::SourceNotFound { .. }));
    }

    #[test]
    fn test_import_cycle_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "a.goo",
            "<script>\nimport B from './b.goo';\n</script>\n<component><B/></component>",
        );
        write(
            &dir,
            "b.goo",
            "<script>\nimport A from './a.goo';\n</script>\n<component><A/></component>",
        );
        let page = write(
            &dir,
            "page.goo",
            "<script>\nimport A from './a.goo';\n</script>\n<component><A/></component>",
        );

        let err = compile(&page).unwrap_err();
        assert!(matches!(err.root_cause(), GooError::CyclicImport { .. }));
    }

    #[test]
    fn test_duplicate_names_are_ambiguous() {
        let dir = TempDir::new().unwrap();
        write(&dir, "x/card.goo", "<component>x</component>");
        write(&dir, "y/card.goo", "<component>y</component>");
        write(
            &dir,
            "other.goo",
            "<script>\nimport Card from './y/card.goo';\n</script>\n<component><Card/></component>",
        );
        let page = write(
            &dir,
            "page.goo",
            "<script>\nimport Card from './x/card.goo';\nimport Other from './other.goo';\n</script>\n<component><Card/><Other/></component>",
        );

        let (key, graph) = compile(&page).unwrap();
        let err = graph.flatten(&key).unwrap_err();
        assert!(matches!(err, GooError::AmbiguousComponentName { ref name, .. } if name == "Card"));
    }

    #[test]
    fn test_second_import_name_becomes_alias() {
        let dir = TempDir::new().unwrap();
        write(&dir, "card.goo", "<component><b>card</b></component>");
        write(
            &dir,
            "other.goo",
            "<script>\nimport Tile from './card.goo';\n</script>\n<component><div><Tile/></div></component>",
        );
        let page = write(
            &dir,
            "page.goo",
            "<script>\nimport Card from './card.goo';\nimport Other from './other.goo';\n</script>\n<component><Card/><Other/></component>",
        );

        let (key, graph) = compile(&page).unwrap();
        let card = graph.get(&dir.path().join("card.goo")).unwrap();
        assert_eq!(card.names().collect::<Vec<_>>(), vec!["Card", "Tile"]);
        assert_eq!(graph.flatten(&key).unwrap().len(), 2);
    }

    #[test]
    fn test_alias_clashing_with_other_component_is_ambiguous() {
        let dir = TempDir::new().unwrap();
        write(&dir, "card.goo", "<component>card</component>");
        write(&dir, "tile.goo", "<component>tile</component>");
        write(
            &dir,
            "other.goo",
            "<script>\nimport Tile from './card.goo';\n</script>\n<component><Tile/></component>",
        );
        let page = write(
            &dir,
            "page.goo",
            "<script>\nimport Card from './card.goo';\nimport Tile from './tile.goo';\nimport Other from './other.goo';\n</script>\n<component><Card/><Tile/><Other/></component>",
        );

        let (key, graph) = compile(&page).unwrap();
        let err = graph.flatten(&key).unwrap_err();
        assert!(matches!(err, GooError::AmbiguousComponentName { ref name, .. } if name == "Tile"));
    }

    #[test]
    fn test_page_without_markup_is_malformed() {
        let dir = TempDir::new().unwrap();
        let page = write(&dir, "page.goo", "<script>console.log(1);</script>");
        assert!(matches!(
            compile(&page).unwrap_err(),
            GooError::MalformedSource { .. }
        ));
    }

    #[test]
    fn test_empty_component_is_kept_as_node() {
        let dir = TempDir::new().unwrap();
        write(&dir, "empty.goo", "");
        let page = write(
            &dir,
            "page.goo",
            "<script>\nimport Empty from './empty.goo';\n</script>\n<component><Empty/></component>",
        );

        let (key, graph) = compile(&page).unwrap();
        let flat = graph.flatten(&key).unwrap();
        assert_eq!(flat.len(), 1);
        assert!(flat[0].fragments.is_empty());
    }

    #[test]
    fn test_hashed_scope_is_stable() {
        let a = ScopeStrategy::Hashed.scope_class(Path::new("app/page.goo"));
        let b = ScopeStrategy::Hashed.scope_class(Path::new("app/page.goo"));
        let c = ScopeStrategy::Hashed.scope_class(Path::new("app/other.goo"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("goo-"));
        assert_eq!(a.len(), "goo-".len() + SCOPE_LEN);
    }

    #[test]
    fn test_random_scope_shape() {
        let class = ScopeStrategy::Random.scope_class(Path::new("x.goo"));
        assert!(class.starts_with("goo-"));
        assert!(class[4..].chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
