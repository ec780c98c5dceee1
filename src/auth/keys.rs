// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verification key resolution.
//!
//! Each supported algorithm is bound to exactly one kind of key material:
//! HS256 to the configured shared secret, ES256 to the configuration-supplied
//! public JWK, RS256 to a key fetched from the project JWKS endpoint. The
//! algorithm used for verification always comes from this dispatch, never
//! from the token header directly, so a key of the wrong family can never
//! satisfy a given `alg`.

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk};
use jsonwebtoken::{Algorithm, DecodingKey};

use super::error::AuthError;
use super::jwks::JwksManager;

/// The closed set of token algorithms this service accepts.
///
/// Anything else is rejected at header-parse time, before key resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAlgorithm {
    Hs256,
    Es256,
    Rs256,
}

impl TokenAlgorithm {
    /// Parse the `alg` value from an unverified token header.
    pub fn from_name(name: &str) -> Result<Self, AuthError> {
        match name {
            "HS256" => Ok(TokenAlgorithm::Hs256),
            "ES256" => Ok(TokenAlgorithm::Es256),
            "RS256" => Ok(TokenAlgorithm::Rs256),
            other => Err(AuthError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// The `jsonwebtoken` algorithm used for verification.
    pub fn as_jwt(self) -> Algorithm {
        match self {
            TokenAlgorithm::Hs256 => Algorithm::HS256,
            TokenAlgorithm::Es256 => Algorithm::ES256,
            TokenAlgorithm::Rs256 => Algorithm::RS256,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TokenAlgorithm::Hs256 => "HS256",
            TokenAlgorithm::Es256 => "ES256",
            TokenAlgorithm::Rs256 => "RS256",
        }
    }
}

impl std::fmt::Display for TokenAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolves verification key material for each algorithm.
#[derive(Debug)]
pub struct KeyResolver {
    /// HS256 shared secret.
    secret: DecodingKey,
    /// ES256 public key, parsed once from the configured JWK.
    es256_key: Option<DecodingKey>,
    /// RS256 keys, fetched from the project JWKS endpoint.
    jwks: JwksManager,
}

impl KeyResolver {
    /// Build a resolver from configured key material.
    ///
    /// The ES256 JWK, when present, is parsed here once and reused across
    /// requests; a malformed or non-EC JWK fails construction (and with it,
    /// startup).
    pub fn new(
        secret: &str,
        es256_public_jwk: Option<&Jwk>,
        jwks: JwksManager,
    ) -> Result<Self, AuthError> {
        let es256_key = es256_public_jwk.map(es256_decoding_key).transpose()?;
        Ok(Self {
            secret: DecodingKey::from_secret(secret.as_bytes()),
            es256_key,
            jwks,
        })
    }

    /// Resolve the verification key for `algorithm`.
    ///
    /// `kid` comes from the unverified header and is used only to select a
    /// key within the JWKS document (RS256).
    pub async fn resolve(
        &self,
        algorithm: TokenAlgorithm,
        kid: Option<&str>,
    ) -> Result<DecodingKey, AuthError> {
        match algorithm {
            TokenAlgorithm::Hs256 => Ok(self.secret.clone()),
            TokenAlgorithm::Es256 => self
                .es256_key
                .clone()
                .ok_or_else(|| AuthError::KeyUnavailable("ES256 public key not configured.".into())),
            TokenAlgorithm::Rs256 => {
                let kid = kid.ok_or_else(|| {
                    AuthError::KeyUnavailable(
                        "Token header missing 'kid' for RS256 verification.".into(),
                    )
                })?;
                let jwk = self.jwks.signing_key(kid).await?;
                rs256_decoding_key(&jwk)
            }
        }
    }

    /// The JWKS manager backing RS256 resolution (used by health checks).
    pub fn jwks(&self) -> &JwksManager {
        &self.jwks
    }
}

/// Convert a configured EC JWK into an ES256 decoding key.
fn es256_decoding_key(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::EllipticCurve(ec) => DecodingKey::from_ec_components(&ec.x, &ec.y)
            .map_err(|_| AuthError::KeyUnavailable("Invalid ES256 public key.".into())),
        _ => Err(AuthError::KeyUnavailable("Invalid ES256 public key.".into())),
    }
}

/// Convert a JWKS entry into an RS256 decoding key.
fn rs256_decoding_key(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map_err(|_| AuthError::KeyUnavailable("Invalid RSA key in JWKS.".into())),
        _ => Err(AuthError::KeyUnavailable("Invalid RSA key in JWKS.".into())),
    }
}
