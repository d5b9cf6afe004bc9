//! Token issuance and validation properties.

use auth_core::jwt::TokenClaims;
use auth_core::{AuthError, TokenIssuer, TokenType, TokenValidator};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use proptest::prelude::*;

use crate::generators::{
    arb_issued_at, arb_subject, arb_token_type, key_store, ACCESS_SECRET, REFRESH_SECRET,
    SETTINGS_SECRET,
};

fn secret_for(token_type: TokenType) -> &'static str {
    match token_type {
        TokenType::Access => ACCESS_SECRET,
        TokenType::Refresh => REFRESH_SECRET,
        TokenType::SettingsAccess => SETTINGS_SECRET,
    }
}

fn at(timestamp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp, 0).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Issued tokens validate anywhere inside their window with the same claims.
    #[test]
    fn prop_issue_validate_round_trip(
        subject in arb_subject(),
        token_type in arb_token_type(),
        remember_me in any::<bool>(),
        iat in arb_issued_at(),
        elapsed_pct in 0i64..=100,
    ) {
        let keys = key_store();
        let issuer = TokenIssuer::new(keys.clone());
        let validator = TokenValidator::new(keys.clone());

        let issued_at = at(iat);
        let validity = keys.validity(token_type).unwrap();
        let now = issued_at + validity * i32::try_from(elapsed_pct).unwrap() / 100;

        let token = issuer.issue_at(&subject, token_type, remember_me, issued_at).unwrap();
        let claims = validator
            .validate_at(Some(&format!("Bearer {token}")), now)
            .unwrap();

        prop_assert_eq!(claims.subject, subject);
        prop_assert_eq!(claims.token_type, token_type);
        prop_assert_eq!(claims.remember_me, remember_me);
        prop_assert_eq!(claims.issued_at, issued_at);
        prop_assert_eq!(claims.expires_at, issued_at + validity);
    }

    /// Valid at exactly `iat + validity`, expired one second later.
    #[test]
    fn prop_expiry_boundary(
        subject in arb_subject(),
        token_type in arb_token_type(),
        iat in arb_issued_at(),
    ) {
        let keys = key_store();
        let issuer = TokenIssuer::new(keys.clone());
        let validator = TokenValidator::new(keys.clone());

        let issued_at = at(iat);
        let expiry = issued_at + keys.validity(token_type).unwrap();
        let token = issuer.issue_at(&subject, token_type, false, issued_at).unwrap();

        prop_assert!(validator.validate_token_at(&token, expiry).is_ok());

        let late = validator.validate_token_at(&token, expiry + Duration::seconds(1));
        let expired_at_boundary = matches!(
            late,
            Err(AuthError::TokenExpired { expired_at }) if expired_at == expiry
        );
        prop_assert!(expired_at_boundary);
    }

    /// A token claiming one type but signed with another type's key is rejected.
    #[test]
    fn prop_type_confusion_rejected(
        subject in arb_subject(),
        claimed in arb_token_type(),
        signer in arb_token_type(),
        iat in arb_issued_at(),
    ) {
        prop_assume!(claimed != signer);
        let validator = TokenValidator::new(key_store());

        let claims = TokenClaims::new(subject, claimed, false, at(iat));
        let forged = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret_for(signer).as_bytes()),
        )
        .unwrap();

        let rejected = matches!(
            validator.validate_token_at(&forged, at(iat)),
            Err(AuthError::InvalidTokenSignature)
        );
        prop_assert!(rejected);
    }

    /// Any bit flip in the claims segment invalidates the token.
    #[test]
    fn prop_tampered_claims_rejected(
        subject in arb_subject(),
        token_type in arb_token_type(),
        iat in arb_issued_at(),
        flip in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let keys = key_store();
        let token = TokenIssuer::new(keys.clone())
            .issue_at(&subject, token_type, false, at(iat))
            .unwrap();

        let segments: Vec<&str> = token.split('.').collect();
        let mut payload = URL_SAFE_NO_PAD.decode(segments[1]).unwrap();
        let idx = flip.index(payload.len());
        payload[idx] ^= 1 << bit;

        let tampered = format!(
            "{}.{}.{}",
            segments[0],
            URL_SAFE_NO_PAD.encode(&payload),
            segments[2]
        );

        prop_assert!(TokenValidator::new(keys).validate_token_at(&tampered, at(iat)).is_err());
    }

    /// Arbitrary header values never panic the validator.
    #[test]
    fn prop_arbitrary_header_rejected(header in ".{0,200}") {
        let validator = TokenValidator::new(key_store());
        prop_assert!(validator.validate(Some(&header)).is_err());
    }
}

#[test]
fn test_changed_subject_fails_signature() {
    let keys = key_store();
    let issued_at = Utc::now();
    let token = TokenIssuer::new(keys.clone())
        .issue_at("alice@example.com", TokenType::Access, false, issued_at)
        .unwrap();

    let segments: Vec<&str> = token.split('.').collect();
    let payload = String::from_utf8(URL_SAFE_NO_PAD.decode(segments[1]).unwrap()).unwrap();
    let forged_payload = payload.replace("alice@example.com", "mallory@example.com");
    let forged = format!(
        "{}.{}.{}",
        segments[0],
        URL_SAFE_NO_PAD.encode(forged_payload),
        segments[2]
    );

    assert!(matches!(
        TokenValidator::new(keys).validate_token_at(&forged, issued_at),
        Err(AuthError::InvalidTokenSignature)
    ));
}
