//! Common error types used throughout collectforge.
//!
//! Provider errors are contained per provider by the lookup orchestrator.
//! Everything else surfaces to the caller unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single problem found while validating a module definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Location of the offending value, e.g. `fields[2].constraints.min`.
    pub path: String,
    /// Human-readable description of the problem.
    pub reason: String,
}

impl ValidationIssue {
    /// Create a new issue at `path`.
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Classification of a single provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Connection failure or non-success HTTP status.
    Network,
    /// The provider did not answer within its time budget.
    Timeout,
    /// Credentials were missing or rejected.
    Authentication,
    /// The provider answered with something we could not interpret.
    InvalidResponse,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Timeout => write!(f, "timeout"),
            Self::Authentication => write!(f, "authentication"),
            Self::InvalidResponse => write!(f, "invalid response"),
        }
    }
}

/// Common error type for collectforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A module definition failed validation. The whole definition is rejected.
    #[error("Invalid module definition: {}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),

    /// The requested entity was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity (e.g. "module", "provider").
        entity: String,
        /// The key or id that was looked up.
        id: String,
    },

    /// A single metadata provider failed.
    #[error("Provider '{provider}' failed ({kind}): {message}")]
    Provider {
        /// Key of the failing provider.
        provider: String,
        /// Failure classification.
        kind: ProviderErrorKind,
        /// Human-readable error description.
        message: String,
    },

    /// The caller supplied an unusable argument (bad file name, path outside
    /// the import directory, empty identifier list, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A filesystem operation on the import directory failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A fault in collectforge itself rather than in its input.
    #[error("Internal error: {0}")]
    Internal(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a validation error carrying a single issue.
    pub fn validation(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation(vec![ValidationIssue::new(path, reason)])
    }

    /// Create a new InvalidArgument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a new Storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a new Provider error.
    pub fn provider(
        provider: impl Into<String>,
        kind: ProviderErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            kind,
            message: message.into(),
        }
    }

    /// Validation issues carried by this error, if it is a validation error.
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Self::Validation(issues) => issues,
            _ => &[],
        }
    }

    /// Returns `true` for not-found errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
