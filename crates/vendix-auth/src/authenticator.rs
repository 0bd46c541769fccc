//! Entry point services use to issue and validate tokens.

use std::sync::Arc;

use vendix_core::model::{Id, Role};
use vendix_core::{ErrorKind, Principal, VendixError, VendixResult};

use crate::claims::TokenType;
use crate::revocation::RevocationStore;
use crate::token::TokenEngine;

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    /// Short-lived bearer token for authenticated requests.
    pub access_token: String,
    /// Long-lived token used only to mint a new pair via [`Authenticator::refresh`].
    pub refresh_token: String,
}

/// Ties a [`TokenEngine`] and a [`RevocationStore`] together.
#[derive(Debug, Clone)]
pub struct Authenticator {
    engine: Arc<dyn TokenEngine>,
    revocation: Arc<dyn RevocationStore>,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl Authenticator {
    /// Construct an authenticator from a token engine, a revocation store,
    /// and the access/refresh token lifetimes to issue.
    pub fn new(
        engine: Arc<dyn TokenEngine>,
        revocation: Arc<dyn RevocationStore>,
        access_ttl_secs: i64,
        refresh_ttl_secs: i64,
    ) -> Self {
        Self {
            engine,
            revocation,
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    /// Issue a fresh access/refresh pair for `user_id`/`role`, as on login
    /// or registration.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Internal`] if signing fails.
    pub fn issue(&self, user_id: Id, role: Role) -> VendixResult<TokenPair> {
        let (access_token, _) = self
            .engine
            .issue(user_id, role, TokenType::Access, self.access_ttl_secs)
            .map_err(|e| VendixError::internal(format!("failed to issue access token: {e}")))?;
        let (refresh_token, _) = self
            .engine
            .issue(user_id, role, TokenType::Refresh, self.refresh_ttl_secs)
            .map_err(|e| VendixError::internal(format!("failed to issue refresh token: {e}")))?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Validate `token` as a token of type `required_type`, returning the
    /// [`Principal`] it authenticates.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Malformed`] if the token cannot be parsed at all.
    /// - [`ErrorKind::Expired`] if `exp` has passed.
    /// - [`ErrorKind::Invalid`] if the signature or another standard claim
    ///   fails.
    /// - [`ErrorKind::WrongTokenType`] if the token's `typ` claim does not
    ///   match `required_type`.
    /// - [`ErrorKind::Revoked`] if the token's `jti` is in the revocation
    ///   store.
    pub async fn validate(&self, token: &str, required_type: TokenType) -> VendixResult<Principal> {
        let claims = self.engine.decode(token).map_err(|e| classify_decode_error(&e))?;

        if claims.typ != required_type {
            return Err(VendixError::new(
                ErrorKind::WrongTokenType,
                format!("expected {required_type:?} token, got {:?}", claims.typ),
            ));
        }

        if self.revocation.is_revoked(&claims.jti).await {
            return Err(VendixError::new(ErrorKind::Revoked, "token has been revoked"));
        }

        let user_id = claims
            .user_id()
            .map_err(|_| VendixError::new(ErrorKind::Malformed, "token subject is not a valid user id"))?;

        Ok(Principal {
            user_id,
            role: claims.role,
            jti: claims.jti,
            expires_at: claims.exp,
        })
    }

    /// Validate a refresh token and exchange it for a brand new pair,
    /// revoking the old refresh token so it cannot be replayed.
    ///
    /// # Errors
    ///
    /// Propagates the same errors as [`Self::validate`], plus
    /// [`ErrorKind::Internal`] if issuing the new pair fails.
    pub async fn refresh(&self, refresh_token: &str) -> VendixResult<TokenPair> {
        let principal = self.validate(refresh_token, TokenType::Refresh).await?;
        self.revocation.revoke(&principal.jti, principal.expires_at).await;
        self.issue(principal.user_id, principal.role)
    }

    /// Revoke `token` immediately (logout). Accepts either token type: a
    /// user logging out should not be able to keep using either half of
    /// their pair.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Malformed`] or [`ErrorKind::Invalid`] if the
    /// token cannot even be decoded; expiry and type are not checked since
    /// a caller revoking a token they hold should always succeed.
    pub async fn revoke(&self, token: &str) -> VendixResult<()> {
        let claims = match self.engine.decode(token) {
            Ok(claims) => claims,
            // Already expired: expiry alone already prevents reuse, so
            // there is nothing left to add to the revocation store.
            Err(e) if e.kind() == &jsonwebtoken::errors::ErrorKind::ExpiredSignature => return Ok(()),
            Err(e) => return Err(classify_decode_error(&e)),
        };
        self.revocation.revoke(&claims.jti, claims.exp).await;
        Ok(())
    }
}

fn classify_decode_error(err: &jsonwebtoken::errors::Error) -> VendixError {
    use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
    match err.kind() {
        JwtErrorKind::ExpiredSignature => VendixError::new(ErrorKind::Expired, "token expired"),
        JwtErrorKind::InvalidToken
        | JwtErrorKind::Base64(_)
        | JwtErrorKind::Json(_)
        | JwtErrorKind::Utf8(_) => VendixError::new(ErrorKind::Malformed, "token is malformed"),
        _ => VendixError::new(ErrorKind::Invalid, format!("token validation failed: {err}")),
    }
}
