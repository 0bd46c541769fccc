//! Token signing and verification.
//!
//! `decode` always pins `jsonwebtoken::Validation` to a single expected
//! algorithm rather than trusting the token header's `alg` field, the same
//! algorithm-confusion defense the validator this was adapted from applies
//! via its allowlist.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use uuid::Uuid;
use vendix_core::config::{AuthSettings, JwtAlgorithm};
use vendix_core::model::{Id, Role};

use crate::claims::{Claims, TokenType};

/// Signs and verifies vendix JWTs.
///
/// Implementations commit to exactly one algorithm at construction time —
/// there is no runtime algorithm negotiation, which is what keeps the
/// decode path immune to algorithm-confusion attacks.
pub trait TokenEngine: std::fmt::Debug + Send + Sync {
    /// Mint a signed token for `user_id`/`role` of type `token_type`,
    /// expiring after `ttl_secs` seconds from now.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails (e.g. malformed key material).
    fn issue(
        &self,
        user_id: Id,
        role: Role,
        token_type: TokenType,
        ttl_secs: i64,
    ) -> Result<(String, Claims), jsonwebtoken::errors::Error>;

    /// Verify `token`'s signature and standard claims (`exp`, `iss`,
    /// `aud`), returning the decoded claim set unchanged. Callers are
    /// responsible for checking [`Claims::typ`] and revocation status —
    /// this method only proves the token was issued by this engine and is
    /// unexpired.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature is invalid, the token is
    /// malformed, or a standard claim fails validation.
    fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error>;
}

fn new_claims(
    user_id: Id,
    role: Role,
    token_type: TokenType,
    ttl_secs: i64,
    issuer: &str,
    audience: &str,
) -> Claims {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64;
    Claims {
        sub: user_id.to_string(),
        role,
        typ: token_type,
        jti: Uuid::new_v4().to_string(),
        iat: now,
        exp: now + ttl_secs,
        iss: issuer.to_string(),
        aud: audience.to_string(),
    }
}

fn base_validation(algorithm: Algorithm, issuer: &str, audience: &str, leeway_secs: u64) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.leeway = leeway_secs;
    validation.set_issuer(&[issuer]);
    validation.set_audience(&[audience]);
    validation
}

/// HMAC-SHA256 token engine. Symmetric: the same secret signs and verifies.
pub struct Hs256Engine {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    leeway_secs: u64,
}

impl std::fmt::Debug for Hs256Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hs256Engine")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl Hs256Engine {
    /// Build an engine from [`AuthSettings`].
    ///
    /// # Panics
    ///
    /// Panics if `settings.algorithm` is not [`JwtAlgorithm::Hs256`] or its
    /// `hmac_secret` is absent — both are configuration-time invariants a
    /// correctly constructed [`AuthSettings`] guarantees.
    #[must_use]
    pub fn from_settings(settings: &AuthSettings) -> Self {
        assert_eq!(settings.algorithm, JwtAlgorithm::Hs256, "Hs256Engine requires HS256 settings");
        let secret = settings
            .hmac_secret
            .as_ref()
            .expect("HS256 settings must carry hmac_secret")
            .expose_secret();
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            leeway_secs: settings.leeway.as_secs(),
        }
    }
}

impl TokenEngine for Hs256Engine {
    fn issue(
        &self,
        user_id: Id,
        role: Role,
        token_type: TokenType,
        ttl_secs: i64,
    ) -> Result<(String, Claims), jsonwebtoken::errors::Error> {
        let claims = new_claims(user_id, role, token_type, ttl_secs, &self.issuer, &self.audience);
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok((token, claims))
    }

    fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let validation = base_validation(Algorithm::HS256, &self.issuer, &self.audience, self.leeway_secs);
        Ok(decode::<Claims>(token, &self.decoding_key, &validation)?.claims)
    }
}

/// RSA-SHA256 token engine. Asymmetric: the private key signs, the public
/// key verifies. This is the original service's default algorithm.
pub struct Rs256Engine {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    leeway_secs: u64,
}

impl std::fmt::Debug for Rs256Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rs256Engine")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl Rs256Engine {
    /// Build an engine from [`AuthSettings`].
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM key material cannot be parsed.
    ///
    /// # Panics
    ///
    /// Panics if `settings.algorithm` is not [`JwtAlgorithm::Rs256`] or its
    /// key material is absent — both are configuration-time invariants a
    /// correctly constructed [`AuthSettings`] guarantees.
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, jsonwebtoken::errors::Error> {
        assert_eq!(settings.algorithm, JwtAlgorithm::Rs256, "Rs256Engine requires RS256 settings");
        let private_pem = settings
            .rsa_private_key_pem
            .as_ref()
            .expect("RS256 settings must carry rsa_private_key_pem")
            .expose_secret();
        let public_pem = settings
            .rsa_public_key_pem
            .as_ref()
            .expect("RS256 settings must carry rsa_public_key_pem")
            .expose_secret();
        Ok(Self {
            encoding_key: EncodingKey::from_rsa_pem(private_pem.as_bytes())?,
            decoding_key: DecodingKey::from_rsa_pem(public_pem.as_bytes())?,
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            leeway_secs: settings.leeway.as_secs(),
        })
    }
}

impl TokenEngine for Rs256Engine {
    fn issue(
        &self,
        user_id: Id,
        role: Role,
        token_type: TokenType,
        ttl_secs: i64,
    ) -> Result<(String, Claims), jsonwebtoken::errors::Error> {
        let claims = new_claims(user_id, role, token_type, ttl_secs, &self.issuer, &self.audience);
        let token = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)?;
        Ok((token, claims))
    }

    fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let validation = base_validation(Algorithm::RS256, &self.issuer, &self.audience, self.leeway_secs);
        Ok(decode::<Claims>(token, &self.decoding_key, &validation)?.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hs256_settings() -> AuthSettings {
        AuthSettings {
            algorithm: JwtAlgorithm::Hs256,
            hmac_secret: Some(secrecy::SecretString::from("unit-test-secret".to_string())),
            rsa_private_key_pem: None,
            rsa_public_key_pem: None,
            issuer: "vendix".into(),
            audience: "vendix-api".into(),
            access_token_ttl: std::time::Duration::from_secs(900),
            refresh_token_ttl: std::time::Duration::from_secs(604_800),
            leeway: std::time::Duration::from_secs(0),
        }
    }

    #[test]
    fn hs256_round_trip() {
        let engine = Hs256Engine::from_settings(&hs256_settings());
        let (token, issued) = engine.issue(7, Role::Customer, TokenType::Access, 60).unwrap();
        let decoded = engine.decode(&token).unwrap();
        assert_eq!(decoded.sub, issued.sub);
        assert_eq!(decoded.jti, issued.jti);
        assert_eq!(decoded.role, Role::Customer);
        assert_eq!(decoded.typ, TokenType::Access);
    }

    #[test]
    fn expired_token_is_rejected() {
        let engine = Hs256Engine::from_settings(&hs256_settings());
        let (token, _) = engine.issue(7, Role::Customer, TokenType::Access, -60).unwrap();
        let err = engine.decode(&token).unwrap_err();
        assert_eq!(err.kind(), &jsonwebtoken::errors::ErrorKind::ExpiredSignature);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let engine = Hs256Engine::from_settings(&hs256_settings());
        let (token, _) = engine.issue(7, Role::Customer, TokenType::Access, 60).unwrap();

        let mut other = hs256_settings();
        other.hmac_secret = Some(secrecy::SecretString::from("different-secret".to_string()));
        let other_engine = Hs256Engine::from_settings(&other);

        assert!(other_engine.decode(&token).is_err());
    }
}
