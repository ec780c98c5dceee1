// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verified JWT claims.

use serde::{Deserialize, Serialize};

/// Audience value Supabase stamps on access tokens.
pub const EXPECTED_AUDIENCE: &str = "authenticated";

/// Claims extracted from a Supabase access token.
///
/// Produced only after signature verification succeeds; request-scoped and
/// never persisted. `sub` is the external subject id (UUID-shaped string)
/// that keys local identity resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject - the canonical Supabase user identifier.
    pub sub: String,

    /// Email address, if the token carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Audience. Always `"authenticated"` for access tokens.
    pub aud: String,

    /// Expiration timestamp (unix seconds).
    pub exp: i64,

    /// Issued-at timestamp (unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Supabase role claim (e.g. `"authenticated"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Supabase session identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}
