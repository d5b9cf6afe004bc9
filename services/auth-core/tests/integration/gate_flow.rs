//! Gate evaluation scenarios.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use auth_core::gate::SubjectDirectory;
use auth_core::{
    AuthConfig, AuthError, AuthGate, FaultOrigin, GateDecision, GateStage, SecretKeyStore,
    TokenType, TokenValidator,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use http::StatusCode;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use crate::support::{Answer, FixedDirectory, Harness};

const ALICE: &str = "alice@example.com";

#[tokio::test]
async fn test_active_subject_is_allowed() {
    let harness = Harness::new(FixedDirectory::default().with(ALICE, Answer::Active));
    let header = harness.bearer(ALICE, TokenType::Access);

    let identity = harness
        .gate(TokenType::Access)
        .evaluate(Some(&header))
        .await
        .into_result()
        .unwrap();

    assert_eq!(identity.subject(), ALICE);
    assert!(!identity.remember_me());
}

#[tokio::test]
async fn test_inactive_subject_is_unauthorized() {
    let harness = Harness::new(FixedDirectory::default().with(ALICE, Answer::Inactive));
    let header = harness.bearer(ALICE, TokenType::Access);

    let rejection = harness
        .gate(TokenType::Access)
        .evaluate(Some(&header))
        .await
        .into_result()
        .unwrap_err();

    assert!(matches!(rejection.error, AuthError::SubjectNotActive));
    assert_eq!(rejection.error.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(rejection.error.to_string(), "Subject is not active");
    assert_eq!(rejection.stage, GateStage::SubjectExtracted);
}

#[tokio::test]
async fn test_empty_bearer_token() {
    let harness = Harness::new(FixedDirectory::default());
    let rejection = harness
        .gate(TokenType::Access)
        .evaluate(Some("Bearer "))
        .await
        .into_result()
        .unwrap_err();

    assert!(matches!(rejection.error, AuthError::InvalidAuthorizationHeader));
    assert_eq!(rejection.stage, GateStage::Start);
    assert_eq!(harness.directory.calls(), 0);
}

#[tokio::test]
async fn test_missing_header() {
    let harness = Harness::new(FixedDirectory::default());
    let rejection = harness
        .gate(TokenType::Access)
        .evaluate(None)
        .await
        .into_result()
        .unwrap_err();

    assert!(matches!(rejection.error, AuthError::NoAuthorizationHeader));
    assert_eq!(rejection.error.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_subject_is_unauthorized_but_distinct() {
    let harness = Harness::new(FixedDirectory::default());
    let header = harness.bearer("ghost@example.com", TokenType::Access);

    let rejection = harness
        .gate(TokenType::Access)
        .evaluate(Some(&header))
        .await
        .into_result()
        .unwrap_err();

    assert!(matches!(rejection.error, AuthError::SubjectNotFound));
    assert_eq!(rejection.error.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_token_type_for_route() {
    let harness = Harness::new(FixedDirectory::default().with(ALICE, Answer::Active));
    let header = harness.bearer(ALICE, TokenType::Refresh);

    let rejection = harness
        .gate(TokenType::Access)
        .evaluate(Some(&header))
        .await
        .into_result()
        .unwrap_err();

    assert!(matches!(
        rejection.error,
        AuthError::TokenTypeMismatch {
            expected: TokenType::Access,
            actual: TokenType::Refresh
        }
    ));
    assert_eq!(rejection.stage, GateStage::SignatureVerified);
    assert_eq!(harness.directory.calls(), 0);
}

#[tokio::test]
async fn test_settings_route_accepts_settings_token() {
    let harness = Harness::new(FixedDirectory::default().with(ALICE, Answer::Active));
    let header = harness.bearer(ALICE, TokenType::SettingsAccess);

    let decision = harness
        .gate(TokenType::SettingsAccess)
        .evaluate(Some(&header))
        .await;
    assert!(decision.is_allowed());
}

#[tokio::test]
async fn test_expired_token_rejected_before_lookup() {
    let harness = Harness::new(FixedDirectory::default().with(ALICE, Answer::Active));
    let header = harness.bearer(ALICE, TokenType::SettingsAccess);
    let later = Utc::now() + chrono::Duration::minutes(6);

    let rejection = harness
        .gate(TokenType::SettingsAccess)
        .evaluate_at(Some(&header), later)
        .await
        .into_result()
        .unwrap_err();

    assert!(matches!(rejection.error, AuthError::TokenExpired { .. }));
    assert_eq!(rejection.stage, GateStage::TypeMatched);
    assert_eq!(harness.directory.calls(), 0);
}

#[tokio::test]
async fn test_directory_failure_is_server_fault() {
    let harness = Harness::new(FixedDirectory::default().with(ALICE, Answer::Fail));
    let header = harness.bearer(ALICE, TokenType::Access);

    let rejection = harness
        .gate(TokenType::Access)
        .evaluate(Some(&header))
        .await
        .into_result()
        .unwrap_err();

    assert!(matches!(rejection.error, AuthError::SubjectLookupFailed(_)));
    assert_eq!(rejection.error.origin(), FaultOrigin::Server);
    assert_eq!(rejection.error.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_directory_timeout_is_server_fault() {
    let harness = Harness::new(FixedDirectory::default().with(ALICE, Answer::Hang));
    let header = harness.bearer(ALICE, TokenType::Access);

    let decision = harness
        .gate(TokenType::Access)
        .with_lookup_timeout(Duration::from_millis(250))
        .evaluate(Some(&header))
        .await;

    let GateDecision::Rejected(rejection) = decision else {
        panic!("hung lookup was allowed");
    };
    assert!(matches!(
        rejection.error,
        AuthError::SubjectLookupTimedOut { timeout } if timeout == Duration::from_millis(250)
    ));
    assert_eq!(rejection.error.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_refresh_flow_mints_access_token() {
    let harness = Harness::new(FixedDirectory::default().with(ALICE, Answer::Active));
    let pair = harness.issuer.issue_pair(ALICE, true).unwrap();

    let refresh = auth_core::TokenValidator::new(harness.keys.clone())
        .validate(Some(&format!("Bearer {}", pair.refresh_token)))
        .unwrap();
    let access = harness.issuer.reissue_access(&refresh).unwrap();

    let identity = harness
        .gate(TokenType::Access)
        .evaluate(Some(&format!("Bearer {access}")))
        .await
        .into_result()
        .unwrap();
    assert_eq!(identity.subject(), ALICE);
    assert!(identity.remember_me());
}

#[tokio::test]
async fn test_missing_key_for_claimed_type_is_server_fault() {
    let harness = Harness::new(FixedDirectory::default().with(ALICE, Answer::Active));
    let header = harness.bearer(ALICE, TokenType::SettingsAccess);

    let access_only = SecretKeyStore::builder(12)
        .with_key(TokenType::Access, "access-secret-123", Duration::from_secs(15 * 60))
        .build()
        .unwrap();
    let gate = AuthGate::new(
        TokenValidator::new(Arc::new(access_only)),
        TokenType::SettingsAccess,
        Arc::clone(&harness.directory) as Arc<dyn SubjectDirectory>,
    );

    let rejection = gate.evaluate(Some(&header)).await.into_result().unwrap_err();

    assert!(matches!(rejection.error, AuthError::TokenUnverifiable { .. }));
    assert_eq!(rejection.error.origin(), FaultOrigin::Server);
    assert_eq!(rejection.error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(rejection.stage, GateStage::HeaderParsed);
    assert_eq!(harness.directory.calls(), 0);
}

#[tokio::test]
async fn test_non_hmac_algorithms_are_unauthorized() {
    let harness = Harness::new(FixedDirectory::default().with(ALICE, Answer::Active));
    let claims = URL_SAFE_NO_PAD.encode(
        json!({
            "sub": ALICE,
            "name": "ACCESS_TOKEN",
            "iat": Utc::now().timestamp(),
            "remember_me": false,
        })
        .to_string(),
    );

    for (alg, signature) in [("none", ""), ("RS256", "c2lnbmF0dXJl")] {
        let header = URL_SAFE_NO_PAD.encode(json!({ "alg": alg, "typ": "JWT" }).to_string());
        let bearer = format!("Bearer {header}.{claims}.{signature}");

        let rejection = harness
            .gate(TokenType::Access)
            .evaluate(Some(&bearer))
            .await
            .into_result()
            .unwrap_err();

        assert!(
            matches!(rejection.error, AuthError::UnexpectedSigningMethod { .. }),
            "{alg}: {:?}",
            rejection.error
        );
        assert_eq!(rejection.error.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(rejection.stage, GateStage::HeaderParsed);
    }
    assert_eq!(harness.directory.calls(), 0);
}

#[tokio::test]
async fn test_empty_subject_fails_after_expiry_stage() {
    let harness = Harness::new(FixedDirectory::default());
    let token = encode(
        &Header::default(),
        &json!({
            "sub": "",
            "name": "ACCESS_TOKEN",
            "iat": Utc::now().timestamp(),
            "remember_me": false,
        }),
        &EncodingKey::from_secret(b"access-secret-123"),
    )
    .unwrap();

    let rejection = harness
        .gate(TokenType::Access)
        .evaluate(Some(&format!("Bearer {token}")))
        .await
        .into_result()
        .unwrap_err();

    assert!(matches!(rejection.error, AuthError::TokenProblem { .. }));
    assert_eq!(rejection.stage, GateStage::NotExpired);
    assert_eq!(harness.directory.calls(), 0);
}

#[tokio::test]
async fn test_configured_lookup_timeout_bounds_directory() {
    let harness = Harness::new(FixedDirectory::default().with(ALICE, Answer::Hang));
    let header = harness.bearer(ALICE, TokenType::Access);
    let config =
        AuthConfig::from_source(&HashMap::from([("SUBJECT_LOOKUP_TIMEOUT_MS", "150")])).unwrap();

    let gate = AuthGate::from_config(
        TokenValidator::new(Arc::clone(&harness.keys)),
        TokenType::Access,
        Arc::clone(&harness.directory) as Arc<dyn SubjectDirectory>,
        &config,
    );
    assert_eq!(gate.lookup_timeout(), Duration::from_millis(150));

    let rejection = gate.evaluate(Some(&header)).await.into_result().unwrap_err();
    assert!(matches!(
        rejection.error,
        AuthError::SubjectLookupTimedOut { timeout } if timeout == Duration::from_millis(150)
    ));
    assert_eq!(rejection.stage, GateStage::SubjectExtracted);
}
