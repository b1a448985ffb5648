#![forbid(unsafe_code)]
//! travlogs library.
//!
//! Turns a compilation log (a JSON array of `{inputs, output, rule}`
//! records) into an acyclic file-dependency graph, caches that graph on
//! disk keyed by a fingerprint of the log, and answers "which sources does
//! this target come from" and "which targets does this source feed" in
//! both set and path form.
//!
//! # Entry points
//!
//! - [`build_or_load_graph`]: graph for a log, via an explicit [`GraphCache`].
//! - [`open_build_dir`]: same, using a build directory's conventions.
//! - [`find_sources_from_targets`], [`find_targets_from_sources`],
//!   [`find_paths_from_targets`], [`find_paths_from_sources`].
//!
//! # Conventions
//!
//! - **Errors**: every public operation returns [`Result`] with the single
//!   [`Error`] taxonomy; cache problems are never errors.
//! - **Logging**: `tracing` macros only. No subscriber is installed here and
//!   nothing is printed.

pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod query;
pub mod record;

use std::path::Path;

use tracing::{debug, instrument};

pub use cache::{GraphCache, LoadResult, LoadSource};
pub use config::{GraphConfig, RuleFilter, load_config};
pub use error::{Error, ErrorCode, Result};
pub use graph::{ArcInfo, BuildGraph, GraphStats, NodeRole, ProductionStep};
pub use query::{
    DependencyPath, Hop, NodeFilter, QueryEngine, find_paths_from_sources,
    find_paths_from_targets, find_sources_from_targets, find_targets_from_sources,
};

/// Graph for the log at `log_path`, from `cache` when it is fresh and
/// rebuilt from the log otherwise.
///
/// # Errors
///
/// - [`Error::LogRead`] if the log is missing or not a JSON array.
/// - [`Error::MissingField`] / [`Error::InvalidField`] for a malformed record.
/// - [`Error::CycleDetected`] if the records describe a cycle.
pub fn build_or_load_graph(log_path: &Path, cache: &GraphCache) -> Result<BuildGraph> {
    cache.load(log_path).map(|loaded| loaded.graph)
}

/// Load the graph for a build directory.
///
/// Reads the optional `travlogs.toml`, then loads the configured log
/// (default `build_log.json`) through the configured cache (default
/// `graph.cache`) with the configured rule filter.
///
/// # Errors
///
/// As [`build_or_load_graph`], plus [`Error::LogRead`] for an unreadable
/// config file.
#[instrument]
pub fn open_build_dir(build_dir: &Path) -> Result<LoadResult> {
    let config = load_config(build_dir)?;
    let cache = GraphCache::for_build_dir(build_dir, &config);
    let loaded = cache.load(&config.log_path(build_dir))?;
    debug!(
        nodes = loaded.graph.node_count(),
        source = ?loaded.source,
        "opened build directory"
    );
    Ok(loaded)
}
