//! End-to-end authenticator scenarios: login, refresh, and logout over
//! the full `TokenEngine` + `RevocationStore` stack (no transport layer,
//! per the spec's scope).

use std::sync::Arc;
use std::time::Duration;

use vendix_auth::authenticator::Authenticator;
use vendix_auth::claims::TokenType;
use vendix_auth::revocation::CacheRevocationStore;
use vendix_auth::token::Hs256Engine;
use vendix_cache::memory::InMemoryCache;
use vendix_core::config::{AuthSettings, JwtAlgorithm};
use vendix_core::model::Role;
use vendix_core::ErrorKind;

fn settings() -> AuthSettings {
    AuthSettings {
        algorithm: JwtAlgorithm::Hs256,
        hmac_secret: Some(secrecy::SecretString::from("integration-test-secret".to_string())),
        rsa_private_key_pem: None,
        rsa_public_key_pem: None,
        issuer: "vendix".into(),
        audience: "vendix-api".into(),
        access_token_ttl: Duration::from_secs(900),
        refresh_token_ttl: Duration::from_secs(604_800),
        leeway: Duration::from_secs(0),
    }
}

fn authenticator() -> Authenticator {
    let engine = Arc::new(Hs256Engine::from_settings(&settings()));
    let revocation = Arc::new(CacheRevocationStore::new(InMemoryCache::new()));
    Authenticator::new(engine, revocation, 900, 604_800)
}

#[tokio::test]
async fn login_produces_a_token_whose_role_matches_the_issued_role() {
    let auth = authenticator();
    let pair = auth.issue(42, Role::Admin).unwrap();

    let principal = auth.validate(&pair.access_token, TokenType::Access).await.unwrap();
    assert_eq!(principal.user_id, 42);
    assert_eq!(principal.role, Role::Admin);
}

#[tokio::test]
async fn refresh_rotates_tokens_and_revokes_the_old_refresh_token() {
    let auth = authenticator();
    let first = auth.issue(1, Role::Customer).unwrap();

    let second = auth.refresh(&first.refresh_token).await.unwrap();
    assert_ne!(first.access_token, second.access_token);
    assert_ne!(first.refresh_token, second.refresh_token);

    let err = auth.refresh(&first.refresh_token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Revoked);

    let principal = auth.validate(&second.access_token, TokenType::Access).await.unwrap();
    assert_eq!(principal.user_id, 1);
}

#[tokio::test]
async fn logout_revokes_both_halves_of_the_pair() {
    let auth = authenticator();
    let pair = auth.issue(7, Role::Customer).unwrap();

    auth.revoke(&pair.access_token).await.unwrap();
    let err = auth.validate(&pair.access_token, TokenType::Access).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Revoked);

    auth.revoke(&pair.refresh_token).await.unwrap();
    let err = auth.validate(&pair.refresh_token, TokenType::Refresh).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Revoked);
}

#[tokio::test]
async fn access_token_cannot_be_used_as_a_refresh_token() {
    let auth = authenticator();
    let pair = auth.issue(3, Role::Customer).unwrap();

    let err = auth.validate(&pair.access_token, TokenType::Refresh).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::WrongTokenType);
}
