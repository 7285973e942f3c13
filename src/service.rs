//! Compiler Service
//!
//! Owns everything a running site needs: configuration, the base layout,
//! the section/import front end, the discovered route table and the
//! compiled template cache. A single value is built at startup (after
//! structural validation) and shared behind an `Arc`.

use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::cache::{CacheEntry, CacheStats, TemplateCache};
use crate::component::{CompileOptions, ComponentCompiler};
use crate::config::GooConfig;
use crate::discovery::{discover_routes, validate_structure, Route};
use crate::error::{GooError, Result};
use crate::imports::{normalize_path, ImportScanner, LineImportScanner};
use crate::layout::augment_layout;
use crate::rewrite::{compose_page, RegexTagMatcher};
use crate::section::{MarkerSectionExtractor, SectionExtractor};
use crate::template::{CompiledPage, BASE_TEMPLATE};

/// Name under which a page's own markup is compiled.
pub const PAGE_COMPONENT: &str = "Page";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStats {
    /// Full pipeline runs since startup.
    pub compilations: u64,
    pub cache: CacheStats,
}

#[derive(Debug, Default)]
pub struct WarmReport {
    pub compiled: usize,
    pub failures: Vec<(String, GooError)>,
}

pub struct CompilerService {
    config: GooConfig,
    options: CompileOptions,
    layout: String,
    routes: Vec<Route>,
    extractor: Box<dyn SectionExtractor>,
    scanner: Box<dyn ImportScanner>,
    cache: TemplateCache,
    compilations: AtomicU64,
}

impl CompilerService {
    /// Validates the project structure, loads the base layout and discovers
    /// the route table. Failure here means the site cannot be served.
    pub fn new(config: GooConfig) -> Result<Self> {
        let scanner = LineImportScanner::new(config.extension.clone());
        Self::with_front_end(
            config,
            Box::new(MarkerSectionExtractor::default()),
            Box::new(scanner),
        )
    }

    /// Like [`CompilerService::new`] with a custom section extractor and
    /// import scanner.
    pub fn with_front_end(
        config: GooConfig,
        extractor: Box<dyn SectionExtractor>,
        scanner: Box<dyn ImportScanner>,
    ) -> Result<Self> {
        let structure = validate_structure(&config)?;
        let routes = discover_routes(&structure.app_dir, &config.entry_file);

        tracing::info!(
            root = %config.root.display(),
            routes = routes.len(),
            cache = config.cache,
            "project validated"
        );

        Ok(Self {
            options: config.compile_options(),
            cache: TemplateCache::new(config.invalidate_on_change),
            config,
            layout: structure.layout_source,
            routes,
            extractor,
            scanner,
            compilations: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &GooConfig {
        &self.config
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route(&self, url_path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.path == url_path)
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            compilations: self.compilations.load(Ordering::Relaxed),
            cache: self.cache.stats(),
        }
    }

    /// Runs the full pipeline for one page, bypassing the cache.
    pub fn compile_page(&self, page: &Path) -> Result<CompiledPage> {
        let (compiled, _) = self.build(&normalize_path(page))?;
        Ok(compiled)
    }

    /// Returns the executable page, from the cache when caching is enabled.
    pub fn page(&self, page: &Path) -> Result<Arc<CompiledPage>> {
        let key = normalize_path(page);
        if self.config.cache {
            self.cache.get_or_compile(&key, || self.compile_entry(&key))
        } else {
            Ok(self.compile_entry(&key)?.page)
        }
    }

    /// Compiles (or fetches) and executes a page against `context`.
    pub fn render_page<T: Serialize>(&self, page: &Path, context: &T) -> Result<String> {
        self.page(page)?.render(context)
    }

    /// Drops the cached compilation of one page.
    pub fn invalidate(&self, page: &Path) {
        self.cache.invalidate(&normalize_path(page));
    }

    /// Compiles every discovered route in parallel. Failures are reported,
    /// not propagated, so one broken page does not block the others.
    pub fn warm(&self) -> WarmReport {
        let started = Instant::now();
        let results: Vec<(String, Result<Arc<CompiledPage>>)> = self
            .routes
            .par_iter()
            .map(|route| (route.path.clone(), self.page(&route.source)))
            .collect();

        let mut report = WarmReport::default();
        for (path, result) in results {
            match result {
                Ok(_) => report.compiled += 1,
                Err(e) => {
                    tracing::warn!(route = %path, code = e.code(), "warmup failed: {}", e);
                    report.failures.push((path, e));
                }
            }
        }

        tracing::info!(
            compiled = report.compiled,
            failed = report.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "warmup finished"
        );
        report
    }

    fn compile_entry(&self, page: &Path) -> Result<CacheEntry> {
        let (compiled, sources) = self.build(page)?;
        Ok(CacheEntry::new(compiled, sources))
    }

    fn build(&self, page: &Path) -> Result<(CompiledPage, Vec<(PathBuf, Option<SystemTime>)>)> {
        let started = Instant::now();

        let mut compiler =
            ComponentCompiler::new(self.extractor.as_ref(), self.scanner.as_ref(), &self.options);
        let root = compiler.compile_page(page, PAGE_COMPONENT)?;
        let graph = compiler.into_graph();

        let page_component = graph
            .get(&root)
            .ok_or_else(|| GooError::malformed(&root, "page missing from component graph"))?;
        let flat = graph.flatten(&root)?;

        let mut set = compose_page::<RegexTagMatcher>(page_component, &flat);
        set.insert(BASE_TEMPLATE, augment_layout(&self.layout, page_component, &flat));
        tracing::debug!(page = %root.display(), source = %set.source(BASE_TEMPLATE), "composed template set");

        let compiled = CompiledPage::register(&root, set, BASE_TEMPLATE)?;
        self.compilations.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            page = %root.display(),
            components = flat.len(),
            templates = compiled.template_set().len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "compiled page"
        );

        Ok((compiled, graph.sources()))
    }
}

impl std::fmt::Debug for CompilerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilerService")
            .field("root", &self.config.root)
            .field("routes", &self.routes.len())
            .field("stats", &self.stats())
            .finish()
    }
}
