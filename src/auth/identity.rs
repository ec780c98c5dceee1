// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local identity resolution for verified claims.
//!
//! Two deployment policies exist in this lineage:
//!
//! - **Strict** - the account must already exist locally (provisioning is a
//!   separate, explicit step); unknown subjects are rejected.
//! - **Provision** - first successful verification is sufficient proof of
//!   eligibility; a minimal account is created on first sight.
//!
//! The policy is selected by `AUTH_IDENTITY_POLICY` at startup.

use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::claims::Claims;
use super::error::AuthError;
use crate::models::User;
use crate::store::UserStore;

/// How verified external identities map to local accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentityPolicy {
    /// Reject subjects without a local account.
    Strict,
    /// Create a local account on first successful verification.
    #[default]
    Provision,
}

impl IdentityPolicy {
    /// Parse the configured policy name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "strict" => Some(IdentityPolicy::Strict),
            "provision" => Some(IdentityPolicy::Provision),
            _ => None,
        }
    }
}

/// Resolves verified claims to a local [`User`].
pub struct IdentityResolver {
    policy: IdentityPolicy,
}

impl IdentityResolver {
    pub fn new(policy: IdentityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> IdentityPolicy {
        self.policy
    }

    /// Resolve `claims` to a local account according to the active policy.
    ///
    /// `sub` must be a UUID; anything else fails before the store is
    /// consulted.
    pub async fn resolve(
        &self,
        claims: &Claims,
        store: &Arc<RwLock<UserStore>>,
    ) -> Result<User, AuthError> {
        let auth_id = Uuid::parse_str(&claims.sub).map_err(|_| {
            tracing::warn!(sub = %claims.sub, "Invalid UUID format in token");
            AuthError::InvalidToken
        })?;

        match self.policy {
            IdentityPolicy::Strict => {
                store.read().await.find_by_auth_id(auth_id).ok_or_else(|| {
                    tracing::warn!(
                        email = claims.email.as_deref().unwrap_or(""),
                        %auth_id,
                        "User in JWT not found in local store",
                    );
                    AuthError::UserNotRegistered
                })
            }
            IdentityPolicy::Provision => {
                // Fast path: most requests are for already-known subjects.
                if let Some(user) = store.read().await.find_by_auth_id(auth_id) {
                    tracing::debug!(email = %user.email, "Authenticated existing user");
                    return Ok(user);
                }

                // Re-checked under the write lock; a concurrent identical
                // request either finds the record or created it first.
                let mut guard = store.write().await;
                match guard.get_or_create_by_auth_id(auth_id, claims.email.as_deref()) {
                    Ok((user, true)) => {
                        tracing::info!(email = %user.email, "Created new user from Supabase token");
                        Ok(user)
                    }
                    Ok((user, false)) => Ok(user),
                    Err(err) => {
                        tracing::error!(error = %err.message, "Error syncing Supabase user to local store");
                        Err(AuthError::AuthenticationFailed)
                    }
                }
            }
        }
    }
}
