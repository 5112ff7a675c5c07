//! Graph error model.

use thiserror::Error;

/// Result type used across the graph layer.
pub type GraphResult<T> = Result<T, GraphError>;

/// Assembly-time error.
///
/// These are the failures this workspace can detect on its own: malformed
/// declarations, broken references and conflicting registrations. Anything
/// that only the provisioning engine can observe (quotas, permissions,
/// naming collisions in the account) is out of reach here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A value failed validation (e.g. malformed property).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A graph invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A logical identifier was invalid.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested declaration was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A declaration collides with an existing one (duplicate id, route, output).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A resource references a logical id that is not declared in the graph.
    #[error("unresolved reference from '{from}' to '{to}'")]
    UnresolvedReference { from: String, to: String },

    /// The reference/dependency graph contains a cycle.
    #[error("dependency cycle: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),
}

impl GraphError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn unresolved(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            from: from.into(),
            to: to.into(),
        }
    }
}
