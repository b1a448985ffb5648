//! Build-directory configuration.
//!
//! A build directory holds the compilation log and, by default, the graph
//! cache next to it. An optional `travlogs.toml` in the same directory can
//! rename either file and restrict which rules contribute arcs:
//!
//! ```toml
//! log_file = "build_log.json"
//! cache_file = "graph.cache"
//! rules = ["cc", "cxx", "link"]
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the optional per-build-directory config file.
pub const CONFIG_FILE_NAME: &str = "travlogs.toml";

/// Default log file name under the build directory.
pub const DEFAULT_LOG_FILE: &str = "build_log.json";

/// Default cache file name under the build directory.
pub const DEFAULT_CACHE_FILE: &str = "graph.cache";

/// Leads the `reason` of a [`Error::LogRead`] caused by the config file
/// rather than the log.
pub const CONFIG_READ_PREFIX: &str = "config file";

/// Rules that compile or link; everything else (`stamp`, `copy`, ...) is
/// bookkeeping.
pub const COMPILE_AND_LINK_RULES: [&str; 5] = ["cc", "cxx", "link", "solink", "alink"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Log file name, relative to the build directory.
    #[serde(default = "default_log_file")]
    pub log_file: String,
    /// Cache file path, relative to the build directory.
    #[serde(default = "default_cache_file")]
    pub cache_file: String,
    /// Allow-list of rule labels. `None` keeps every record.
    #[serde(default)]
    pub rules: Option<Vec<String>>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            cache_file: default_cache_file(),
            rules: None,
        }
    }
}

impl GraphConfig {
    #[must_use]
    pub fn log_path(&self, build_dir: &Path) -> PathBuf {
        build_dir.join(&self.log_file)
    }

    #[must_use]
    pub fn cache_path(&self, build_dir: &Path) -> PathBuf {
        build_dir.join(&self.cache_file)
    }

    #[must_use]
    pub fn rule_filter(&self) -> RuleFilter {
        self.rules
            .as_ref()
            .map_or(RuleFilter::All, |rules| RuleFilter::only(rules.iter().map(String::as_str)))
    }
}

fn default_log_file() -> String {
    DEFAULT_LOG_FILE.to_string()
}

fn default_cache_file() -> String {
    DEFAULT_CACHE_FILE.to_string()
}

/// Load `travlogs.toml` from `build_dir`, falling back to defaults when the
/// file is absent.
///
/// # Errors
///
/// Returns [`Error::LogRead`] if the file exists but cannot be read or
/// parsed; a broken config is as fatal as a broken log.
pub fn load_config(build_dir: &Path) -> Result<GraphConfig> {
    let path = build_dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(GraphConfig::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|e| Error::LogRead {
        path: path.clone(),
        reason: format!("{CONFIG_READ_PREFIX} unreadable: {e}"),
    })?;

    toml::from_str::<GraphConfig>(&content).map_err(|e| Error::LogRead {
        path,
        reason: format!("{CONFIG_READ_PREFIX} invalid: {e}"),
    })
}

// ---------------------------------------------------------------------------
// RuleFilter
// ---------------------------------------------------------------------------

/// Selects which log records take part in graph construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RuleFilter {
    /// Keep every record.
    #[default]
    All,
    /// Keep only records whose rule is in the set.
    Only(BTreeSet<String>),
}

impl RuleFilter {
    pub fn only<'a>(rules: impl IntoIterator<Item = &'a str>) -> Self {
        Self::Only(rules.into_iter().map(str::to_string).collect())
    }

    /// The compile-and-link preset, see [`COMPILE_AND_LINK_RULES`].
    #[must_use]
    pub fn compile_and_link() -> Self {
        Self::only(COMPILE_AND_LINK_RULES)
    }

    #[must_use]
    pub fn allows(&self, rule: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(rules) => rules.contains(rule),
        }
    }
}
