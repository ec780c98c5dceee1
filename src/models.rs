// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Account Data Models
//!
//! Request and response structures for the accounts API, plus the [`User`]
//! record itself. All API types derive `Serialize`, `Deserialize`, and
//! `ToSchema` for JSON handling and OpenAPI documentation.
//!
//! Accounts are keyed by email (no usernames). The `auth_id` field links a
//! local record to its external Supabase identity and, once set, is never
//! changed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use utoipa::ToSchema;
use uuid::Uuid;

/// A local user account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct User {
    /// Unique identifier for this account.
    pub id: Uuid,
    /// Email address (unique, normalized).
    pub email: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Staff accounts can see and manage every account.
    #[serde(default)]
    pub is_staff: bool,
    /// Inactive accounts are kept but cannot authenticate.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// External subject id (Supabase `sub`). Unique; immutable once set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_id: Option<Uuid>,
    /// When the account was created.
    pub date_joined: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{}, {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Request to create an account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    /// Email address for the new account.
    pub email: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// External subject id to link, if already known.
    #[serde(default)]
    pub auth_id: Option<Uuid>,
}

/// Request to update an account. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateAccountRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Normalize an email address: NFKC-fold the whole address and lowercase the
/// domain part (the local part is left as given).
pub fn normalize_email(email: &str) -> String {
    let normalized: String = email.trim().nfkc().collect();
    match normalized.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => normalized,
    }
}
