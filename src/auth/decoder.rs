// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Supabase JWT verification.
//!
//! The unverified header is read only to pick the verification path
//! (algorithm and, for RS256, the `kid`). Signature, expiry, and audience
//! are then verified with server-side key material resolved by
//! [`KeyResolver`]; the header is never trusted beyond branch selection.

use base64ct::{Base64UrlUnpadded, Encoding};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Validation;
use serde::Deserialize;

use super::claims::{Claims, EXPECTED_AUDIENCE};
use super::error::AuthError;
use super::keys::{KeyResolver, TokenAlgorithm};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Token header fields read before signature verification.
///
/// Used only for algorithm and key selection; never for anything else.
#[derive(Debug, Deserialize)]
struct UnverifiedHeader {
    alg: String,
    #[serde(default)]
    kid: Option<String>,
}

/// Decodes and verifies Supabase access tokens.
pub struct TokenDecoder {
    keys: KeyResolver,
    leeway: u64,
}

impl TokenDecoder {
    pub fn new(keys: KeyResolver) -> Self {
        Self {
            keys,
            leeway: CLOCK_SKEW_LEEWAY,
        }
    }

    /// Verify `token` and return its claims.
    pub async fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let header = unverified_header(token)?;
        let algorithm = TokenAlgorithm::from_name(&header.alg)?;
        tracing::debug!(%algorithm, "JWT algorithm detected");

        let key = self.keys.resolve(algorithm, header.kid.as_deref()).await?;

        let mut validation = Validation::new(algorithm.as_jwt());
        validation.leeway = self.leeway;
        validation.set_audience(&[EXPECTED_AUDIENCE]);

        let token_data =
            jsonwebtoken::decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidAudience => AuthError::InvalidAudience,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                // Key family does not match the dispatched algorithm.
                ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
                _ => AuthError::InvalidToken,
            })?;

        Ok(token_data.claims)
    }

    /// Key resolver backing this decoder (used by health checks).
    pub fn keys(&self) -> &KeyResolver {
        &self.keys
    }
}

/// Parse the compact-serialization header without verifying the signature.
fn unverified_header(token: &str) -> Result<UnverifiedHeader, AuthError> {
    let mut segments = token.split('.');
    let (Some(header), Some(_payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::InvalidToken);
    };

    let bytes = Base64UrlUnpadded::decode_vec(header).map_err(|_| AuthError::InvalidToken)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::InvalidToken)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::jwks::tests::{rsa_jwk_set, FakeJwksSource};
    use crate::auth::jwks::JwksManager;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use jsonwebtoken::jwk::Jwk;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use ring::rand::SystemRandom;
    use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING};
    use std::sync::Arc;

    pub(crate) const TEST_SECRET: &str = "test-jwt-secret";
    pub(crate) const TEST_SUB: &str = "550e8400-e29b-41d4-a716-446655440000";

    /// ES256 key pair usable for both signing (tests) and verification (JWK).
    pub(crate) struct TestEs256Key {
        pkcs8: Vec<u8>,
        pub(crate) jwk: Jwk,
    }

    impl TestEs256Key {
        pub(crate) fn generate() -> Self {
            let rng = SystemRandom::new();
            let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
                .expect("generate ES256 key");
            let pair =
                EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8.as_ref(), &rng)
                    .expect("parse generated key");

            // Uncompressed point: 0x04 || X || Y
            let public = pair.public_key().as_ref();
            let jwk = serde_json::from_value(serde_json::json!({
                "kty": "EC",
                "crv": "P-256",
                "x": URL_SAFE_NO_PAD.encode(&public[1..33]),
                "y": URL_SAFE_NO_PAD.encode(&public[33..65]),
            }))
            .unwrap();

            Self {
                pkcs8: pkcs8.as_ref().to_vec(),
                jwk,
            }
        }

        pub(crate) fn encoding_key(&self) -> EncodingKey {
            EncodingKey::from_ec_der(&self.pkcs8)
        }
    }

    pub(crate) fn test_claims(exp_offset_secs: i64) -> Claims {
        let now = chrono::Utc::now().timestamp();
        Claims {
            sub: TEST_SUB.to_string(),
            email: Some("user@example.com".to_string()),
            aud: EXPECTED_AUDIENCE.to_string(),
            exp: now + exp_offset_secs,
            iat: Some(now),
            role: Some("authenticated".to_string()),
            session_id: None,
        }
    }

    pub(crate) fn hs256_token(secret: &str, claims: &Claims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    pub(crate) fn decoder_with(es256: Option<&Jwk>) -> TokenDecoder {
        let jwks = JwksManager::with_fetcher(Arc::new(FakeJwksSource::new(rsa_jwk_set("key-1"))));
        TokenDecoder::new(KeyResolver::new(TEST_SECRET, es256, jwks).unwrap())
    }

    #[tokio::test]
    async fn hs256_round_trip() {
        let decoder = decoder_with(None);
        let claims = test_claims(3600);
        let token = hs256_token(TEST_SECRET, &claims);

        let decoded = decoder.decode(&token).await.unwrap();
        assert_eq!(decoded, claims);
        assert_eq!(decoded.sub, TEST_SUB);
        assert_eq!(decoded.email.as_deref(), Some("user@example.com"));
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let decoder = decoder_with(None);
        let err = decoder.decode("invalid.jwt.token").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn wrong_segment_count_is_invalid() {
        let decoder = decoder_with(None);
        for token in ["", "a.b", "a.b.c.d"] {
            let err = decoder.decode(token).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidToken), "token {token:?}");
        }
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let decoder = decoder_with(None);
        let token = hs256_token(TEST_SECRET, &test_claims(-3600));
        let err = decoder.decode(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn wrong_audience_is_rejected() {
        let decoder = decoder_with(None);
        let mut claims = test_claims(3600);
        claims.aud = "anon".to_string();
        let token = hs256_token(TEST_SECRET, &claims);
        let err = decoder.decode(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidAudience));
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let decoder = decoder_with(None);
        let token = hs256_token("a-different-secret", &test_claims(3600));
        let err = decoder.decode(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[tokio::test]
    async fn algorithm_outside_closed_set_is_unsupported() {
        let decoder = decoder_with(None);
        let token = encode(
            &Header::new(Algorithm::HS384),
            &test_claims(3600),
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        let err = decoder.decode(&token).await.unwrap_err();
        assert!(matches!(&err, AuthError::UnsupportedAlgorithm(alg) if alg == "HS384"));
    }

    #[tokio::test]
    async fn alg_none_is_unsupported() {
        let decoder = decoder_with(None);
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&test_claims(3600)).unwrap());
        let token = format!("{header}.{payload}.");

        let err = decoder.decode(&token).await.unwrap_err();
        assert!(matches!(&err, AuthError::UnsupportedAlgorithm(alg) if alg == "none"));
    }

    #[tokio::test]
    async fn es256_round_trip() {
        let key = TestEs256Key::generate();
        let decoder = decoder_with(Some(&key.jwk));
        let claims = test_claims(3600);
        let token = encode(&Header::new(Algorithm::ES256), &claims, &key.encoding_key()).unwrap();

        let decoded = decoder.decode(&token).await.unwrap();
        assert_eq!(decoded, claims);
    }

    #[tokio::test]
    async fn es256_signed_by_other_key_is_rejected() {
        let configured = TestEs256Key::generate();
        let attacker = TestEs256Key::generate();
        let decoder = decoder_with(Some(&configured.jwk));
        let token = encode(
            &Header::new(Algorithm::ES256),
            &test_claims(3600),
            &attacker.encoding_key(),
        )
        .unwrap();

        let err = decoder.decode(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    /// A token whose header declares ES256 but whose signature is an HMAC
    /// over the signing input (the classic key-confusion attack) must never
    /// verify against the EC key.
    #[tokio::test]
    async fn hmac_signature_never_satisfies_es256() {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        let key = TestEs256Key::generate();
        let decoder = decoder_with(Some(&key.jwk));

        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"ES256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&test_claims(3600)).unwrap());
        let signing_input = format!("{header}.{payload}");

        let mut mac = Hmac::<Sha256>::new_from_slice(TEST_SECRET.as_bytes()).unwrap();
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        let err = decoder
            .decode(&format!("{signing_input}.{signature}"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::InvalidSignature | AuthError::InvalidToken
        ));
    }

    #[tokio::test]
    async fn missing_exp_is_invalid() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            br#"{"sub":"550e8400-e29b-41d4-a716-446655440000","aud":"authenticated"}"#,
        );
        let signing_input = format!("{header}.{payload}");

        // Sign properly so only the missing claim can fail validation.
        use hmac::{Hmac, Mac};
        use sha2::Sha256;
        let mut mac = Hmac::<Sha256>::new_from_slice(TEST_SECRET.as_bytes()).unwrap();
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        let decoder = decoder_with(None);
        let err = decoder
            .decode(&format!("{signing_input}.{signature}"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }
}
