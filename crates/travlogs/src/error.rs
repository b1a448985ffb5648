//! Error taxonomy for graph construction and queries.
//!
//! Construction errors ([`Error::MissingField`], [`Error::InvalidField`],
//! [`Error::LogRead`], [`Error::CycleDetected`]) abort the whole build; no
//! partial graph is ever returned. [`Error::NodeNamesNotInGraph`] aborts only
//! the query that raised it.
//!
//! Cache corruption is not represented here: an unreadable cache degrades to
//! a rebuild inside [`crate::cache`].

use std::fmt;
use std::path::PathBuf;

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A log record lacks one of `inputs`, `output`, `rule`.
    #[error("record #{record} is missing mandatory field '{field}'")]
    MissingField {
        /// Zero-based position of the record in the log.
        record: usize,
        /// Name of the absent field.
        field: &'static str,
    },

    /// A known field has the wrong JSON type, or the record is not an object.
    #[error("record #{record}: field '{field}' must be {expected}")]
    InvalidField {
        /// Zero-based position of the record in the log.
        record: usize,
        /// Offending field name (`"<record>"` when the record itself is malformed).
        field: &'static str,
        /// Human-readable description of the expected shape.
        expected: &'static str,
    },

    /// The log file could not be read or is not a JSON array at the top level.
    #[error("cannot read build log {}: {reason}", path.display())]
    LogRead {
        /// Path of the log file.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// The production records describe a dependency cycle.
    #[error("dependency cycle detected: {}", cycle.join(" -> "))]
    CycleDetected {
        /// Node sequence of the cycle; the first node is repeated at the end.
        cycle: Vec<String>,
    },

    /// A query named nodes that do not exist in the graph.
    #[error("node names not in graph: {}", names.join(", "))]
    NodeNamesNotInGraph {
        /// Every unknown name, in request order, without duplicates.
        names: Vec<String>,
    },
}

impl Error {
    /// The stable error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::MissingField { .. } => ErrorCode::MissingField,
            Self::InvalidField { .. } => ErrorCode::InvalidField,
            Self::LogRead { .. } => ErrorCode::LogRead,
            Self::CycleDetected { .. } => ErrorCode::CycleDetected,
            Self::NodeNamesNotInGraph { .. } => ErrorCode::NodeNamesNotInGraph,
        }
    }

    /// Whether the error invalidates the whole graph build (as opposed to a
    /// single query).
    #[must_use]
    pub const fn is_construction_error(&self) -> bool {
        !matches!(self, Self::NodeNamesNotInGraph { .. })
    }
}

/// Machine-readable error codes for the surrounding layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MissingField,
    InvalidField,
    LogRead,
    CycleDetected,
    NodeNamesNotInGraph,
}

impl ErrorCode {
    /// Stable code identifier (`E####`).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::LogRead => "E1001",
            Self::MissingField => "E2001",
            Self::InvalidField => "E2002",
            Self::CycleDetected => "E2003",
            Self::NodeNamesNotInGraph => "E3001",
        }
    }

    /// Short summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::LogRead => "Build log unreadable",
            Self::MissingField => "Log record missing mandatory field",
            Self::InvalidField => "Log record field has wrong type",
            Self::CycleDetected => "Dependency cycle in build log",
            Self::NodeNamesNotInGraph => "Unknown node names",
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::LogRead => Some(
                "Check that the build wrote the log as a JSON array; if the reason starts \
                 with 'config file', fix travlogs.toml in the build directory instead.",
            ),
            Self::MissingField | Self::InvalidField => {
                Some("Every record needs 'inputs', 'output' and 'rule'; 'headers' is a list of paths.")
            }
            Self::CycleDetected => Some("Fix the build description so no file depends on itself."),
            Self::NodeNamesNotInGraph => {
                Some("Use paths exactly as they appear in the build log.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
