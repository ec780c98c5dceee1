// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! This module verifies Supabase-issued JWT access tokens and maps them to
//! local account records.
//!
//! ## Auth Flow
//!
//! 1. Frontend authenticates the user with Supabase Auth
//! 2. Frontend sends `Authorization: Bearer <access token>`
//! 3. This server:
//!    - Reads the unverified header to pick the algorithm (HS256, ES256,
//!      or RS256) and, for RS256, the `kid`
//!    - Resolves server-side key material (shared secret, configured
//!      ES256 JWK, or a key from the project JWKS endpoint)
//!    - Verifies signature, expiry, and audience (`"authenticated"`)
//!    - Resolves `sub` to a local account (strict lookup or
//!      get-or-create, per `AUTH_IDENTITY_POLICY`)
//!
//! ## Security
//!
//! - The algorithm used for verification is bound to the key family by
//!   server-side dispatch; the token header only selects the branch
//! - JWKS is fetched via HTTPS only and cached by `kid` with TTL
//! - Clock skew tolerance is 60 seconds
//! - Requests without credentials are anonymous, not errors; every other
//!   failure is rejected with its kind preserved for logging

pub mod claims;
pub mod decoder;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod jwks;
pub mod keys;

pub use claims::Claims;
pub use decoder::TokenDecoder;
pub use error::AuthError;
pub use extractor::{Auth, Authenticator};
pub use identity::{IdentityPolicy, IdentityResolver};
pub use jwks::JwksManager;
pub use keys::{KeyResolver, TokenAlgorithm};
