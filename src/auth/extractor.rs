// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request-boundary authentication.
//!
//! [`Authenticator::authenticate`] is the entry point: it extracts the
//! bearer token, verifies it, and resolves the local account. A request
//! without credentials yields `Ok(None)` rather than an error, so callers
//! can apply their own must-authenticate policy.
//!
//! Handlers use the `Auth` extractor to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is the resolved local User
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::decoder::TokenDecoder;
use super::error::AuthError;
use super::identity::IdentityResolver;
use super::jwks::JwksManager;
use super::keys::KeyResolver;
use crate::config::AuthSettings;
use crate::models::User;
use crate::state::AppState;
use crate::store::UserStore;

/// Verifies Supabase access tokens and resolves them to local accounts.
pub struct Authenticator {
    decoder: TokenDecoder,
    identity: IdentityResolver,
}

impl Authenticator {
    /// Build the authenticator from validated settings.
    pub fn new(settings: &AuthSettings) -> Result<Self, AuthError> {
        let jwks = JwksManager::from_url(settings.jwks_url());
        let keys = KeyResolver::new(
            &settings.secret_key,
            settings.es256_public_jwk.as_ref(),
            jwks,
        )?;
        Ok(Self::from_parts(
            TokenDecoder::new(keys),
            IdentityResolver::new(settings.identity_policy),
        ))
    }

    /// Assemble from already-built components (tests inject fake key
    /// sources this way).
    pub fn from_parts(decoder: TokenDecoder, identity: IdentityResolver) -> Self {
        Self { decoder, identity }
    }

    /// Authenticate a request from its headers.
    ///
    /// Returns `Ok(None)` when no bearer credentials are present. On
    /// success the resolved account is returned with no extra credential
    /// object. Failures keep their kind; only the HTTP mapping is uniform.
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        store: &Arc<RwLock<UserStore>>,
    ) -> Result<Option<User>, AuthError> {
        let Some(token) = bearer_token(headers) else {
            return Ok(None);
        };
        tracing::debug!("Authenticating Supabase JWT");

        let claims = match self.decoder.decode(token).await {
            Ok(claims) => claims,
            Err(err) => {
                tracing::warn!(error_code = err.error_code(), "Token verification failed");
                return Err(err);
            }
        };

        match self.identity.resolve(&claims, store).await {
            Ok(user) => Ok(Some(user)),
            Err(err) => {
                tracing::warn!(error_code = err.error_code(), "Identity resolution failed");
                Err(err)
            }
        }
    }

    /// The token decoder (exposes the JWKS manager for health checks).
    pub fn decoder(&self) -> &TokenDecoder {
        &self.decoder
    }
}

/// Extract the token from a `Bearer <token>` Authorization header.
///
/// Anything else (missing header, other scheme, non-ASCII value) means "no
/// credentials supplied", not an error.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    Some(token)
}

/// Extractor for authenticated requests.
///
/// Rejects with 401 when no credentials are supplied; propagates the
/// decoder's and resolver's failures otherwise. Checks request extensions
/// first so middleware-authenticated requests are honored.
pub struct Auth(pub User);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>().cloned() {
            return Ok(Auth(user));
        }

        match state.auth.authenticate(&parts.headers, &state.store).await? {
            Some(user) => Ok(Auth(user)),
            None => Err(AuthError::MissingCredentials),
        }
    }
}
