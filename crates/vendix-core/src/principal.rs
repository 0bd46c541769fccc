//! The authenticated identity carried through a request.

use crate::model::{Id, Role};
use serde::{Deserialize, Serialize};

/// Identity and authorization context produced by successfully validating an
/// access token. Services receive a `Principal`, never a raw token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    /// The authenticated user.
    pub user_id: Id,
    /// Role at the time the token was issued. A role change takes effect
    /// only on the next token issuance, not retroactively.
    pub role: Role,
    /// Token id (`jti`), used to check and record revocation.
    pub jti: String,
    /// Unix timestamp the token expires at.
    pub expires_at: i64,
}

impl Principal {
    /// Whether this principal holds the [`Role::Admin`] role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether `self` is the owner of a resource belonging to `owner_id`,
    /// or is an admin (who may act on behalf of any owner).
    #[must_use]
    pub fn owns_or_admin(&self, owner_id: Id) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}
