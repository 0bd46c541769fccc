//! Environment-backed configuration, following the teacher's `from_env()`
//! convention (see `AuthConfig::from_env` in the upstream auth middleware
//! this crate was adapted from).

use std::env;
use std::fmt;
use std::time::Duration;

use secrecy::SecretString;

/// JWT signing algorithm selected for this deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwtAlgorithm {
    /// Symmetric HMAC-SHA256, single shared secret.
    Hs256,
    /// Asymmetric RSA-SHA256, private key signs, public key verifies.
    Rs256,
}

impl fmt::Display for JwtAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hs256 => write!(f, "HS256"),
            Self::Rs256 => write!(f, "RS256"),
        }
    }
}

/// Error returned by [`AuthSettings::from_env`] and [`CacheSettings::from_env`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// A required variable was not set.
    #[error("missing required environment variable: {0}")]
    Missing(String),
    /// A variable was set but could not be parsed.
    #[error("invalid value for environment variable {name}: {reason}")]
    Invalid {
        /// Variable name.
        name: String,
        /// Why parsing failed.
        reason: String,
    },
}

/// Token-engine configuration, sourced from the environment.
///
/// HS256 reads `JWT_SECRET`; RS256 reads `JWT_PRIVATE_KEY`/`JWT_PUBLIC_KEY`
/// (PEM contents, not file paths — mirrors the original's `_read_file`
/// fallback being resolved before this struct is constructed).
pub struct AuthSettings {
    /// Selected algorithm.
    pub algorithm: JwtAlgorithm,
    /// HS256 shared secret. `None` when `algorithm` is RS256.
    pub hmac_secret: Option<SecretString>,
    /// RS256 PEM-encoded private key. `None` when `algorithm` is HS256.
    pub rsa_private_key_pem: Option<SecretString>,
    /// RS256 PEM-encoded public key. `None` when `algorithm` is HS256.
    pub rsa_public_key_pem: Option<SecretString>,
    /// Issuer claim to set/require.
    pub issuer: String,
    /// Audience claim to set/require.
    pub audience: String,
    /// Access token lifetime.
    pub access_token_ttl: Duration,
    /// Refresh token lifetime.
    pub refresh_token_ttl: Duration,
    /// Clock skew leeway applied during validation.
    pub leeway: Duration,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("algorithm", &self.algorithm)
            .field("hmac_secret", &self.hmac_secret.as_ref().map(|_| "<redacted>"))
            .field(
                "rsa_private_key_pem",
                &self.rsa_private_key_pem.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "rsa_public_key_pem",
                &self.rsa_public_key_pem.as_ref().map(|_| "<redacted>"),
            )
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("leeway", &self.leeway)
            .finish()
    }
}

impl AuthSettings {
    /// Build settings from the process environment.
    ///
    /// Reads `JWT_ALGORITHM` (`HS256` or `RS256`, default `RS256` to match
    /// the original service), `JWT_SECRET` (HS256 only), `JWT_PRIVATE_KEY`
    /// and `JWT_PUBLIC_KEY` (RS256 only), `JWT_ISSUER` (default `vendix`),
    /// `JWT_AUDIENCE` (default `vendix-api`), `JWT_ACCESS_TOKEN_EXPIRES`
    /// (seconds, default 900), `JWT_REFRESH_TOKEN_EXPIRES` (seconds, default
    /// 604800), and `JWT_LEEWAY_SECS` (default 0).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the selected algorithm's key material is
    /// missing, or if a numeric variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let algorithm = match env::var("JWT_ALGORITHM")
            .unwrap_or_else(|_| "RS256".to_string())
            .to_uppercase()
            .as_str()
        {
            "HS256" => JwtAlgorithm::Hs256,
            "RS256" => JwtAlgorithm::Rs256,
            other => {
                return Err(ConfigError::Invalid {
                    name: "JWT_ALGORITHM".into(),
                    reason: format!("unsupported algorithm '{other}', expected HS256 or RS256"),
                })
            }
        };

        let (hmac_secret, rsa_private_key_pem, rsa_public_key_pem) = match algorithm {
            JwtAlgorithm::Hs256 => {
                let secret = env::var("JWT_SECRET")
                    .map_err(|_| ConfigError::Missing("JWT_SECRET".into()))?;
                (Some(SecretString::from(secret)), None, None)
            }
            JwtAlgorithm::Rs256 => {
                let private_key = env::var("JWT_PRIVATE_KEY")
                    .map_err(|_| ConfigError::Missing("JWT_PRIVATE_KEY".into()))?;
                let public_key = env::var("JWT_PUBLIC_KEY")
                    .map_err(|_| ConfigError::Missing("JWT_PUBLIC_KEY".into()))?;
                (
                    None,
                    Some(SecretString::from(private_key)),
                    Some(SecretString::from(public_key)),
                )
            }
        };

        let issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "vendix".to_string());
        let audience = env::var("JWT_AUDIENCE").unwrap_or_else(|_| "vendix-api".to_string());
        let access_token_ttl = parse_secs_env("JWT_ACCESS_TOKEN_EXPIRES", 900)?;
        let refresh_token_ttl = parse_secs_env("JWT_REFRESH_TOKEN_EXPIRES", 604_800)?;
        let leeway = parse_secs_env("JWT_LEEWAY_SECS", 0)?;

        Ok(Self {
            algorithm,
            hmac_secret,
            rsa_private_key_pem,
            rsa_public_key_pem,
            issuer,
            audience,
            access_token_ttl,
            refresh_token_ttl,
            leeway,
        })
    }
}

/// Cache-layer configuration.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Default TTL applied to cache entries with no explicit TTL.
    pub default_ttl: Duration,
}

impl CacheSettings {
    /// Build settings from the process environment.
    ///
    /// Reads `CACHE_DEFAULT_TIMEOUT_SECS` (default 300, matching the
    /// original Flask-Caching default of 5 minutes).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the variable is set but not a valid
    /// non-negative integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            default_ttl: parse_secs_env("CACHE_DEFAULT_TIMEOUT_SECS", 300)?,
        })
    }
}

fn parse_secs_env(name: &str, default_secs: u64) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::Invalid {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        Err(_) => Ok(Duration::from_secs(default_secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn hs256_requires_secret() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("JWT_ALGORITHM", "HS256");
        env::remove_var("JWT_SECRET");
        let err = AuthSettings::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(name) if name == "JWT_SECRET"));
        env::remove_var("JWT_ALGORITHM");
    }

    #[test]
    fn hs256_succeeds_with_secret() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("JWT_ALGORITHM", "HS256");
        env::set_var("JWT_SECRET", "test-secret");
        let settings = AuthSettings::from_env().unwrap();
        assert_eq!(settings.algorithm, JwtAlgorithm::Hs256);
        assert_eq!(settings.access_token_ttl, Duration::from_secs(900));
        env::remove_var("JWT_ALGORITHM");
        env::remove_var("JWT_SECRET");
    }

    #[test]
    fn rejects_unknown_algorithm() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("JWT_ALGORITHM", "ES256");
        let err = AuthSettings::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        env::remove_var("JWT_ALGORITHM");
    }

    #[test]
    fn cache_settings_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::remove_var("CACHE_DEFAULT_TIMEOUT_SECS");
        let settings = CacheSettings::from_env().unwrap();
        assert_eq!(settings.default_ttl, Duration::from_secs(300));
    }
}
