//! Repository failure taxonomy.

use vendix_core::{ErrorKind, VendixError};

/// Failure returned by a repository method.
///
/// Services never let this cross their own public boundary — they match
/// on it and construct the corresponding [`VendixError`] via
/// [`RepoError::into_vendix_error`] with whatever entity-specific context
/// they have (e.g. which id was being looked up).
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepoError {
    /// A uniqueness or foreign-key constraint would be violated.
    #[error("constraint violation: {0}")]
    Constraint(String),
    /// The referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// A transient failure (connection loss, timeout); safe to retry.
    #[error("transient repository failure: {0}")]
    Transient(String),
    /// A domain invariant was violated while executing a transaction (empty
    /// cart, insufficient stock, ...). Maps to `ErrorKind::Domain`, not
    /// `RepoOther`, since the caller did nothing the repository couldn't
    /// service — the request itself is invalid.
    #[error("domain error: {0}")]
    Domain(String),
    /// Any other repository failure.
    #[error("repository error: {0}")]
    Other(String),
}

impl RepoError {
    /// Convert to a [`VendixError`] with a generic message, for call sites
    /// that have no more specific context to add.
    #[must_use]
    pub fn into_vendix_error(self) -> VendixError {
        match self {
            Self::Constraint(msg) => VendixError::new(ErrorKind::Conflict, msg),
            Self::NotFound(msg) => VendixError::new(ErrorKind::NotFound, msg),
            Self::Transient(msg) => VendixError::new(ErrorKind::RepoTransient, msg),
            Self::Domain(msg) => VendixError::new(ErrorKind::Domain, msg),
            Self::Other(msg) => VendixError::new(ErrorKind::RepoOther, msg),
        }
    }
}
