//! JWT claim set.

use serde::{Deserialize, Serialize};
use vendix_core::model::{Id, Role};

/// Distinguishes an access token from a refresh token so one cannot be used
/// in place of the other, even though both are signed by the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived, presented on every authenticated request.
    Access,
    /// Long-lived, presented only to mint a new access token.
    Refresh,
}

/// Claim set embedded in every vendix-issued JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id, as a string per JWT convention.
    pub sub: String,
    /// Role at issuance time.
    pub role: Role,
    /// Token type, checked so an access token can't be replayed as a
    /// refresh token or vice versa.
    pub typ: TokenType,
    /// Token id. Unique per issuance; the unit of revocation.
    pub jti: String,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiration, Unix seconds.
    pub exp: i64,
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
}

impl Claims {
    /// Parse [`Self::sub`] into a [`vendix_core::model::Id`].
    ///
    /// # Errors
    ///
    /// Returns an error if `sub` is not a valid id. This should never
    /// happen for tokens this crate issued itself; it guards against a
    /// forged or corrupted token that otherwise passed signature checks.
    pub fn user_id(&self) -> Result<Id, std::num::ParseIntError> {
        self.sub.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_parses_numeric_subject() {
        let claims = Claims {
            sub: "42".into(),
            role: Role::Customer,
            typ: TokenType::Access,
            jti: "t".into(),
            iat: 0,
            exp: 0,
            iss: "vendix".into(),
            aud: "vendix-api".into(),
        };
        assert_eq!(claims.user_id().unwrap(), 42);
    }
}
