//! Fingerprinted on-disk graph cache.
//!
//! The cache is a derived copy of a [`BuildGraph`](crate::graph::BuildGraph).
//! The build log stays the source of truth; the cache only saves re-reading
//! and re-validating it when nothing has changed.
//!
//! # Module layout
//!
//! - [`fingerprint`]: [`Fingerprint`] over log metadata, rule filter and
//!   graph-logic version.
//! - [`manager`]: [`GraphCache`] load/rebuild/write lifecycle.
//! - `snapshot`: the file format (header line plus JSON body).
//!
//! # Usage sketch
//!
//! ```rust,no_run
//! use std::path::Path;
//! use travlogs::cache::{GraphCache, LoadSource};
//!
//! let cache = GraphCache::new("out/graph.cache");
//! let loaded = cache.load(Path::new("out/build_log.json"))?;
//! if loaded.source != LoadSource::Cache {
//!     eprintln!("graph rebuilt from log");
//! }
//! # Ok::<(), travlogs::Error>(())
//! ```

pub mod fingerprint;
pub mod manager;
mod snapshot;

pub use fingerprint::{Fingerprint, GRAPH_LOGIC_VERSION};
pub use manager::{GraphCache, LoadResult, LoadSource};
pub use snapshot::CACHE_FORMAT_VERSION;
