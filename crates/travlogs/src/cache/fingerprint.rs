//! Cache freshness fingerprint.
//!
//! A fingerprint identifies the inputs a cached graph was built from:
//!
//! - the graph-construction logic ([`GRAPH_LOGIC_VERSION`] and the crate
//!   version),
//! - the log file's canonical path, size and modification time,
//! - the rule filter, since it changes which arcs exist.
//!
//! The log is opened but never read, so checking freshness stays cheap while
//! an unreadable log still fails before any cache lookup.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::config::RuleFilter;
use crate::error::{Error, Result};

/// Bumped whenever graph construction changes in a way that alters the
/// graph for an unchanged log.
pub const GRAPH_LOGIC_VERSION: u32 = 1;

/// BLAKE3 digest of everything a cached graph depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint the log at `log_path` under `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LogRead`] if the log's metadata cannot be read.
    pub fn of_log(log_path: &Path, filter: &RuleFilter) -> Result<Self> {
        let meta = fs::metadata(log_path).map_err(|e| Error::LogRead {
            path: log_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !meta.is_file() {
            return Err(Error::LogRead {
                path: log_path.to_path_buf(),
                reason: "not a regular file".to_string(),
            });
        }
        fs::File::open(log_path).map_err(|e| Error::LogRead {
            path: log_path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let canonical = fs::canonicalize(log_path).unwrap_or_else(|_| log_path.to_path_buf());
        let mtime_ns = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_nanos());

        let mut hasher = blake3::Hasher::new();
        hasher.update(&GRAPH_LOGIC_VERSION.to_le_bytes());
        hasher.update(env!("CARGO_PKG_VERSION").as_bytes());
        hasher.update(b"\x00");
        hasher.update(canonical.to_string_lossy().as_bytes());
        hasher.update(b"\x00");
        hasher.update(&meta.len().to_le_bytes());
        hasher.update(&mtime_ns.to_le_bytes());
        hash_rule_filter(&mut hasher, filter);

        Ok(Self(hasher.finalize().to_hex().to_string()))
    }

    /// Rebuild a fingerprint read back from a cache header.
    pub(crate) fn from_stored(hex: &str) -> Self {
        Self(hex.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Variant tag, then each allowed rule length-prefixed, so no two distinct
/// filters share an encoding.
fn hash_rule_filter(hasher: &mut blake3::Hasher, filter: &RuleFilter) {
    match filter {
        RuleFilter::All => {
            hasher.update(&[0]);
        }
        RuleFilter::Only(rules) => {
            hasher.update(&[1]);
            hasher.update(&(rules.len() as u64).to_le_bytes());
            for rule in rules {
                hasher.update(&(rule.len() as u64).to_le_bytes());
                hasher.update(rule.as_bytes());
            }
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
