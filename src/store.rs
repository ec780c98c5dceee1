// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory account store.
//!
//! Enforces uniqueness on the normalized email and on `auth_id`, the
//! external-subject key. `auth_id` is written at most once per record
//! (on create or first link) and never modified afterwards, so it
//! identifies at most one account for the lifetime of the store.
//!
//! The store is shared as `Arc<RwLock<UserStore>>`; all writes are
//! linearized behind the write lock, which is what makes the auth layer's
//! get-or-create idempotent under concurrent identical requests.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{normalize_email, CreateAccountRequest, UpdateAccountRequest, User};

#[derive(Default)]
pub struct UserStore {
    users: HashMap<Uuid, User>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All accounts, newest first.
    pub fn list(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.values().cloned().collect();
        users.sort_by(|a, b| b.date_joined.cmp(&a.date_joined).then(a.id.cmp(&b.id)));
        users
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.users.get(&id).cloned()
    }

    pub fn find_by_email(&self, email: &str) -> Option<User> {
        let email = normalize_email(email);
        self.users.values().find(|u| u.email == email).cloned()
    }

    pub fn find_by_auth_id(&self, auth_id: Uuid) -> Option<User> {
        self.users
            .values()
            .find(|u| u.auth_id == Some(auth_id))
            .cloned()
    }

    /// Create an account from an API request.
    pub fn create(&mut self, request: CreateAccountRequest) -> Result<User, ApiError> {
        if request.email.trim().is_empty() {
            return Err(ApiError::bad_request("The Email field must be set"));
        }
        self.insert(
            request.email,
            request.first_name,
            request.last_name,
            false,
            request.auth_id,
        )
    }

    /// Insert an account, enforcing email and auth_id uniqueness.
    pub fn insert(
        &mut self,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        is_staff: bool,
        auth_id: Option<Uuid>,
    ) -> Result<User, ApiError> {
        let email = normalize_email(&email.into());
        if self.find_by_email(&email).is_some() {
            return Err(ApiError::bad_request(
                "A user with this email already exists.",
            ));
        }
        if let Some(auth_id) = auth_id {
            if self.find_by_auth_id(auth_id).is_some() {
                return Err(ApiError::bad_request(
                    "A user with this auth id already exists.",
                ));
            }
        }

        let user = User {
            id: Uuid::new_v4(),
            email,
            first_name: first_name.into(),
            last_name: last_name.into(),
            is_staff,
            is_active: true,
            auth_id,
            date_joined: Utc::now(),
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Look up an account by external subject id, creating a minimal record
    /// if none exists. Returns the account and whether it was created.
    ///
    /// Callers hold the write lock for the whole call, so a concurrent
    /// identical request either finds the record here or created it first;
    /// exactly one record per `auth_id` can ever result.
    pub fn get_or_create_by_auth_id(
        &mut self,
        auth_id: Uuid,
        email: Option<&str>,
    ) -> Result<(User, bool), ApiError> {
        if let Some(user) = self.find_by_auth_id(auth_id) {
            return Ok((user, false));
        }
        let user = self.insert(email.unwrap_or_default(), "", "", false, Some(auth_id))?;
        Ok((user, true))
    }

    /// Update name/email fields. `auth_id` is deliberately not updatable.
    pub fn update(&mut self, id: Uuid, request: UpdateAccountRequest) -> Result<User, ApiError> {
        if let Some(email) = &request.email {
            let email = normalize_email(email);
            if self.users.values().any(|u| u.email == email && u.id != id) {
                return Err(ApiError::bad_request(
                    "A user with this email already exists.",
                ));
            }
        }

        let Some(user) = self.users.get_mut(&id) else {
            return Err(ApiError::not_found("Account not found"));
        };

        if let Some(email) = request.email {
            user.email = normalize_email(&email);
        }
        if let Some(first_name) = request.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = request.last_name {
            user.last_name = last_name;
        }

        Ok(user.clone())
    }

    pub fn delete(&mut self, id: Uuid) -> Result<(), ApiError> {
        if self.users.remove(&id).is_some() {
            Ok(())
        } else {
            Err(ApiError::not_found("Account not found"))
        }
    }
}
