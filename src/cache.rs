//! Compiled template cache.
//!
//! Maps a page source path to its executable [`CompiledPage`]. Each page has
//! its own slot lock: the first request for a page compiles while holding
//! the slot, and concurrent requests for the same page wait for that result
//! instead of compiling again. Requests for different pages never contend
//! beyond the short map lookup.
//!
//! Entries live until process exit. With `invalidate_on_change`, a hit
//! first compares the recorded modification time of every source the page
//! was built from, and recompiles when any of them moved.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::Result;
use crate::template::CompiledPage;

pub struct CacheEntry {
    pub page: Arc<CompiledPage>,
    /// Every source file the page was compiled from.
    pub sources: Vec<(PathBuf, Option<SystemTime>)>,
}

impl CacheEntry {
    pub fn new(page: CompiledPage, sources: Vec<(PathBuf, Option<SystemTime>)>) -> Self {
        Self {
            page: Arc::new(page),
            sources,
        }
    }

    /// True when any source's modification time differs from the one
    /// recorded at compile time, or can no longer be read.
    pub fn is_stale(&self) -> bool {
        self.sources.iter().any(|(path, recorded)| {
            let current = fs::metadata(path).and_then(|m| m.modified()).ok();
            current.is_none() || current != *recorded
        })
    }
}

type Slot = Arc<Mutex<Option<CacheEntry>>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

pub struct TemplateCache {
    slots: Mutex<HashMap<PathBuf, Slot>>,
    invalidate_on_change: bool,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TemplateCache {
    pub fn new(invalidate_on_change: bool) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            invalidate_on_change,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn slot(&self, page: &Path) -> Slot {
        self.slots
            .lock()
            .entry(page.to_path_buf())
            .or_default()
            .clone()
    }

    /// Returns the cached page, compiling it with `compile` on a miss (or a
    /// stale hit). A failed compile leaves the slot empty.
    pub fn get_or_compile<F>(&self, page: &Path, compile: F) -> Result<Arc<CompiledPage>>
    where
        F: FnOnce() -> Result<CacheEntry>,
    {
        let slot = self.slot(page);
        let mut guard = slot.lock();

        if let Some(entry) = guard.as_ref() {
            if !(self.invalidate_on_change && entry.is_stale()) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(&entry.page));
            }
            tracing::info!(page = %page.display(), "sources changed, recompiling");
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let entry = compile()?;
        let compiled = Arc::clone(&entry.page);
        *guard = Some(entry);
        Ok(compiled)
    }

    pub fn get(&self, page: &Path) -> Option<Arc<CompiledPage>> {
        let slot = self.slots.lock().get(page).cloned()?;
        let guard = slot.lock();
        guard.as_ref().map(|entry| Arc::clone(&entry.page))
    }

    pub fn invalidate(&self, page: &Path) {
        self.slots.lock().remove(page);
    }

    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let slots: Vec<Slot> = self.slots.lock().values().cloned().collect();
        let entries = slots.iter().filter(|slot| slot.lock().is_some()).count();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
        }
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new(false)
    }
}
