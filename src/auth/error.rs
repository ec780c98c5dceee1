// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Authentication failure kinds.
///
/// Every failure inside key resolution, token decoding, and identity
/// resolution maps to one of these variants. The variant stays available to
/// logging even where the HTTP surface is a uniform 401.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credentials supplied (missing or non-Bearer Authorization header).
    #[error("Authentication credentials were not provided.")]
    MissingCredentials,
    /// Token header declares an algorithm outside the supported set.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    /// Verification key material could not be obtained.
    #[error("{0}")]
    KeyUnavailable(String),
    /// Token is malformed or carries invalid claims.
    #[error("Invalid token.")]
    InvalidToken,
    /// Signature verification failed.
    #[error("Token signature is invalid.")]
    InvalidSignature,
    /// Token `exp` is in the past.
    #[error("Token has expired.")]
    TokenExpired,
    /// Token `aud` does not match the expected audience.
    #[error("Invalid token audience.")]
    InvalidAudience,
    /// Verified subject has no local account (strict policy).
    #[error("User is not registered.")]
    UserNotRegistered,
    /// Unexpected internal failure. Never carries internal detail.
    #[error("Authentication failed.")]
    AuthenticationFailed,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            AuthError::KeyUnavailable(_) => "key_unavailable",
            AuthError::InvalidToken => "invalid_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::UserNotRegistered => "user_not_registered",
            AuthError::AuthenticationFailed => "authentication_failed",
        }
    }

    /// Get the HTTP status code for this error.
    ///
    /// `KeyUnavailable` is a retryable infrastructure failure (JWKS endpoint
    /// unreachable or key rotation in flight) and maps to 503; everything
    /// else is an authentication rejection.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::KeyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
