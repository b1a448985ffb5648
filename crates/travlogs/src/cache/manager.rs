//! Cache lifecycle management: freshness check, rebuild trigger, fallback.
//!
//! [`GraphCache`] is the primary entry point for obtaining a graph. It
//! transparently picks the fastest available source:
//!
//! 1. **Cache file**: if its stored fingerprint matches the current one,
//!    decode the graph directly.
//! 2. **Build log**: otherwise run the builder over the log, then rewrite
//!    the cache so the next load is fast.
//!
//! A cache that is missing, corrupt, foreign, or of another format version
//! is a plain miss. Failing to write the new cache is logged and reported
//! through [`LoadSource::RebuiltWriteFailed`] but never fails the load.
//!
//! # Atomic replacement
//!
//! The cache is written to a uniquely named temporary file in the same
//! directory and renamed into place, so a reader only ever sees the old or
//! the new file. Concurrent rebuilds (threads or processes) each write their
//! own temporary file; the last rename wins.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, instrument, warn};

use crate::cache::fingerprint::Fingerprint;
use crate::cache::snapshot;
use crate::config::{GraphConfig, RuleFilter};
use crate::error::Result;
use crate::graph::{BuildGraph, build_graph_from_log};

// ---------------------------------------------------------------------------
// GraphCache
// ---------------------------------------------------------------------------

/// Handle on one cache file.
///
/// # Usage
///
/// ```rust,no_run
/// use std::path::Path;
/// use travlogs::cache::GraphCache;
///
/// let cache = GraphCache::new("out/graph.cache");
/// let loaded = cache.load(Path::new("out/build_log.json"))?;
/// println!("{} nodes via {:?}", loaded.graph.node_count(), loaded.source);
/// # Ok::<(), travlogs::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct GraphCache {
    cache_path: PathBuf,
    filter: RuleFilter,
}

/// Result of a [`GraphCache::load_or_build`] call, including provenance.
#[derive(Debug, Clone)]
pub struct LoadResult {
    pub graph: BuildGraph,
    pub source: LoadSource,
}

/// Where a graph came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Decoded from a fresh cache file.
    Cache,
    /// Built from the log; the cache was rewritten.
    Rebuilt,
    /// Built from the log; rewriting the cache failed (non-fatal).
    RebuiltWriteFailed,
}

impl GraphCache {
    /// A cache at `cache_path` that keeps every rule.
    #[must_use]
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
            filter: RuleFilter::All,
        }
    }

    /// The cache for a build directory, located and filtered per `config`.
    #[must_use]
    pub fn for_build_dir(build_dir: &Path, config: &GraphConfig) -> Self {
        Self {
            cache_path: config.cache_path(build_dir),
            filter: config.rule_filter(),
        }
    }

    #[must_use]
    pub fn with_rule_filter(mut self, filter: RuleFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    #[must_use]
    pub const fn rule_filter(&self) -> &RuleFilter {
        &self.filter
    }

    /// Whether the cache file exists and matches the current fingerprint of
    /// `log_path`. Only the cache header is inspected.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LogRead`] if the log's metadata is unreadable.
    pub fn is_fresh(&self, log_path: &Path) -> Result<bool> {
        let current = Fingerprint::of_log(log_path, &self.filter)?;
        Ok(fs::read(&self.cache_path)
            .ok()
            .and_then(|bytes| snapshot::read_fingerprint(&bytes).ok())
            .is_some_and(|stored| stored == current))
    }

    /// Load the graph for `log_path`, building it with the standard builder
    /// on a miss.
    ///
    /// # Errors
    ///
    /// See [`GraphCache::load_or_build`].
    pub fn load(&self, log_path: &Path) -> Result<LoadResult> {
        self.load_or_build(log_path, build_graph_from_log)
    }

    /// Load the graph for `log_path` from cache, or call `builder` and
    /// store its result.
    ///
    /// The fingerprint is taken before `builder` runs. If the log changes
    /// while building, the stored fingerprint is already stale and the next
    /// load rebuilds.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LogRead`] if the log cannot be read, and any
    /// error `builder` returns. Cache problems never surface as errors.
    #[instrument(skip(self, builder), fields(cache = %self.cache_path.display()))]
    pub fn load_or_build<F>(&self, log_path: &Path, builder: F) -> Result<LoadResult>
    where
        F: FnOnce(&Path, &RuleFilter) -> Result<BuildGraph>,
    {
        let current = Fingerprint::of_log(log_path, &self.filter)?;

        if let Some(graph) = self.try_cached(&current) {
            return Ok(LoadResult {
                graph,
                source: LoadSource::Cache,
            });
        }

        let graph = builder(log_path, &self.filter)?;

        let source = match self.write(&graph, &current) {
            Ok(()) => {
                debug!(fingerprint = %current, "rewrote graph cache");
                LoadSource::Rebuilt
            }
            Err(e) => {
                warn!("graph cache write failed (non-fatal): {e:#}");
                LoadSource::RebuiltWriteFailed
            }
        };

        Ok(LoadResult { graph, source })
    }

    /// Delete the cache file, if any.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file exists but cannot be removed.
    pub fn clear(&self) -> std::io::Result<()> {
        match fs::remove_file(&self.cache_path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn try_cached(&self, current: &Fingerprint) -> Option<BuildGraph> {
        let bytes = match fs::read(&self.cache_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("no usable graph cache: {e}");
                return None;
            }
        };

        match snapshot::read_fingerprint(&bytes) {
            Ok(stored) if stored == *current => {}
            Ok(_) => {
                debug!("graph cache fingerprint mismatch, rebuilding");
                return None;
            }
            Err(e) => {
                debug!("graph cache header unreadable, rebuilding: {e:#}");
                return None;
            }
        }

        match snapshot::decode(&bytes) {
            Ok((_, graph)) => {
                debug!(nodes = graph.node_count(), "loaded graph from cache");
                Some(graph)
            }
            Err(e) => {
                warn!("graph cache decode failed, rebuilding: {e:#}");
                None
            }
        }
    }

    fn write(&self, graph: &BuildGraph, fingerprint: &Fingerprint) -> anyhow::Result<()> {
        let bytes = snapshot::encode(graph, fingerprint)?;

        let dir = match self.cache_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).with_context(|| format!("create cache dir {}", dir.display()))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".graph-cache.")
            .suffix(".tmp")
            .tempfile_in(dir)
            .with_context(|| format!("create temp file in {}", dir.display()))?;
        tmp.write_all(&bytes)
            .with_context(|| format!("write {}", tmp.path().display()))?;

        // On failure the temp file is dropped along with the error.
        tmp.persist(&self.cache_path)
            .map_err(|e| e.error)
            .with_context(|| format!("atomically replace {}", self.cache_path.display()))?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
