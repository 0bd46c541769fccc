//! Unified error handling.
//!
//! A single [`VendixError`] type is used across every service crate. Domain
//! services never let a bare [`crate::model::RepoError`] or cache failure
//! cross their public boundary — they wrap it in a named variant here, and
//! the HTTP transport (external to this crate) maps each [`ErrorKind`] to
//! exactly one status code via [`VendixError::http_status`].

use std::fmt;

/// Result type alias for vendix operations.
pub type VendixResult<T> = Result<T, VendixError>;

/// Unified error type for the commerce core.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct VendixError {
    /// Error classification, used for HTTP status mapping and programmatic handling.
    pub kind: ErrorKind,
    /// Human-readable message. Never includes connection strings, stack traces,
    /// or other information that should not reach a client.
    pub message: String,
}

/// Error classification. Each variant maps to exactly one HTTP status code
/// in [`VendixError::http_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No bearer credential was presented.
    MissingCredential,
    /// Signature verification or decode failed.
    Invalid,
    /// Token is structurally malformed (not three dot-separated parts, bad base64, ...).
    Malformed,
    /// Token's `exp` claim has passed.
    Expired,
    /// Token id (`jti`) is present in the revocation store.
    Revoked,
    /// Token `type` claim did not match what the caller required.
    WrongTokenType,
    /// Principal is authenticated but lacks the role/ownership required.
    Forbidden,
    /// Referenced entity does not exist.
    NotFound,
    /// A uniqueness constraint would be violated (email, product name, ...).
    Conflict,
    /// Request data failed a range/shape check.
    Validation,
    /// A domain invariant specific to the commerce workflow was violated.
    Domain,
    /// The repository reported a transient failure; safe to retry.
    RepoTransient,
    /// The repository reported a failure that is not retryable.
    RepoOther,
    /// Internal error with no better classification.
    Internal,
}

impl VendixError {
    /// Construct an error with an explicit kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// `NotFound` error for a product id.
    pub fn product_not_found(id: impl fmt::Display) -> Self {
        Self::new(ErrorKind::NotFound, format!("product {id} not found"))
    }

    /// `NotFound` error for a cart id.
    pub fn cart_not_found(id: impl fmt::Display) -> Self {
        Self::new(ErrorKind::NotFound, format!("cart {id} not found"))
    }

    /// `NotFound` error for a sale id.
    pub fn sale_not_found(id: impl fmt::Display) -> Self {
        Self::new(ErrorKind::NotFound, format!("sale {id} not found"))
    }

    /// `NotFound` error for an invoice id.
    pub fn invoice_not_found(id: impl fmt::Display) -> Self {
        Self::new(ErrorKind::NotFound, format!("invoice {id} not found"))
    }

    /// `NotFound` error for a delivery address id.
    pub fn address_not_found(id: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::NotFound,
            format!("delivery address {id} not found"),
        )
    }

    /// `Forbidden` error, optionally naming the resource involved.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// `Conflict` error for a duplicate email on registration.
    pub fn email_in_use(email: &str) -> Self {
        Self::new(ErrorKind::Conflict, format!("email '{email}' already in use"))
    }

    /// `Conflict` error for a duplicate product name.
    pub fn product_name_in_use(name: &str) -> Self {
        Self::new(
            ErrorKind::Conflict,
            format!("product name '{name}' already in use"),
        )
    }

    /// `Domain` error for an insufficient-stock rejection.
    pub fn insufficient_stock(product_id: impl fmt::Display, available: i64, requested: i64) -> Self {
        Self::new(
            ErrorKind::Domain,
            format!(
                "insufficient stock for product {product_id}: available {available}, requested {requested}"
            ),
        )
    }

    /// `Domain` error aggregating every reason a checkout failed validation.
    pub fn sale_error(reasons: &[String]) -> Self {
        Self::new(ErrorKind::Domain, reasons.join("; "))
    }

    /// `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// `Validation` error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// The HTTP status code an external transport should map this error to.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self.kind {
            ErrorKind::Malformed => 422,
            ErrorKind::MissingCredential
            | ErrorKind::Invalid
            | ErrorKind::Expired
            | ErrorKind::Revoked
            | ErrorKind::WrongTokenType => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Validation | ErrorKind::Domain => 400,
            ErrorKind::RepoTransient => 503,
            ErrorKind::RepoOther | ErrorKind::Internal => 500,
        }
    }

    /// Whether the caller may retry this operation as-is.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::RepoTransient)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingCredential => "missing credential",
            Self::Invalid => "invalid token",
            Self::Malformed => "malformed token",
            Self::Expired => "token expired",
            Self::Revoked => "token revoked",
            Self::WrongTokenType => "wrong token type",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not found",
            Self::Conflict => "conflict",
            Self::Validation => "validation error",
            Self::Domain => "domain error",
            Self::RepoTransient => "transient repository error",
            Self::RepoOther => "repository error",
            Self::Internal => "internal error",
        };
        write!(f, "{s}")
    }
}
