// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints.
//!
//! Permission model: staff accounts see and manage everything; regular
//! accounts see and manage only themselves. Records outside the caller's
//! visible set answer 404, not 403, so their existence is not revealed.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{normalize_email, CreateAccountRequest, UpdateAccountRequest, User};
use crate::state::AppState;

/// List accounts. Staff see all accounts; regular users only their own.
#[utoipa::path(
    get,
    path = "/api/accounts",
    tag = "Accounts",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Visible accounts", body = Vec<User>),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn list_accounts(Auth(user): Auth, State(state): State<AppState>) -> Json<Vec<User>> {
    let store = state.store.read().await;
    let accounts = if user.is_staff {
        store.list()
    } else {
        vec![user]
    };
    Json(accounts)
}

/// Retrieve an account by id (self or staff).
#[utoipa::path(
    get,
    path = "/api/accounts/{account_id}",
    tag = "Accounts",
    security(("bearer" = [])),
    params(("account_id" = Uuid, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account details", body = User),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Account not found or not visible"),
    )
)]
pub async fn get_account(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    if !user.is_staff && account_id != user.id {
        return Err(ApiError::not_found("Account not found"));
    }
    let store = state.store.read().await;
    store
        .get(account_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Account not found"))
}

/// Create an account.
///
/// Regular users may only create an account with their own (token-verified)
/// email; staff may create accounts for anyone.
#[utoipa::path(
    post,
    path = "/api/accounts",
    tag = "Accounts",
    security(("bearer" = [])),
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Invalid or duplicate email"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Email does not match the authenticated user"),
    )
)]
pub async fn create_account(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    if !user.is_staff && normalize_email(&request.email) != user.email {
        return Err(ApiError::forbidden(
            "You can only create an account with your own email.",
        ));
    }

    let mut store = state.store.write().await;
    let created = store.create(request)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an account (self or staff). Absent fields are left unchanged.
#[utoipa::path(
    patch,
    path = "/api/accounts/{account_id}",
    tag = "Accounts",
    security(("bearer" = [])),
    params(("account_id" = Uuid, Path, description = "Account ID")),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Updated account", body = User),
        (status = 400, description = "Duplicate email"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Account not found or not visible"),
    )
)]
pub async fn update_account(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<Json<User>, ApiError> {
    if !user.is_staff && account_id != user.id {
        return Err(ApiError::not_found("Account not found"));
    }
    let mut store = state.store.write().await;
    store.update(account_id, request).map(Json)
}

/// Delete an account (self or staff).
#[utoipa::path(
    delete,
    path = "/api/accounts/{account_id}",
    tag = "Accounts",
    security(("bearer" = [])),
    params(("account_id" = Uuid, Path, description = "Account ID")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Account not found or not visible"),
    )
)]
pub async fn delete_account(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !user.is_staff && account_id != user.id {
        return Err(ApiError::not_found("Account not found"));
    }
    let mut store = state.store.write().await;
    store.delete(account_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get the current authenticated user's account.
#[utoipa::path(
    get,
    path = "/api/accounts/me",
    tag = "Accounts",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current account", body = User),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn current_account(Auth(user): Auth) -> Json<User> {
    Json(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::extractor::tests::test_state;
    use crate::auth::IdentityPolicy;

    async fn seeded_state() -> (AppState, User, User) {
        let state = test_state(IdentityPolicy::Provision);
        let (staff, regular) = {
            let mut store = state.store.write().await;
            let staff = store
                .insert("admin@example.com", "", "", true, None)
                .unwrap();
            let regular = store
                .insert(
                    "user@example.com",
                    "",
                    "",
                    false,
                    Some(Uuid::new_v4()),
                )
                .unwrap();
            store
                .insert("another@example.com", "", "", false, Some(Uuid::new_v4()))
                .unwrap();
            (staff, regular)
        };
        (state, staff, regular)
    }

    #[tokio::test]
    async fn regular_user_lists_only_self() {
        let (state, _staff, regular) = seeded_state().await;
        let Json(accounts) = list_accounts(Auth(regular.clone()), State(state)).await;
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].email, regular.email);
    }

    #[tokio::test]
    async fn staff_lists_everyone() {
        let (state, staff, _regular) = seeded_state().await;
        let Json(accounts) = list_accounts(Auth(staff), State(state)).await;
        assert_eq!(accounts.len(), 3);
    }

    #[tokio::test]
    async fn retrieve_other_as_regular_is_not_found() {
        let (state, staff, regular) = seeded_state().await;
        let err = get_account(Auth(regular), State(state), Path(staff.id))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn retrieve_other_as_staff_is_allowed() {
        let (state, staff, regular) = seeded_state().await;
        let Json(found) = get_account(Auth(staff), State(state), Path(regular.id))
            .await
            .unwrap();
        assert_eq!(found.email, regular.email);
    }

    #[tokio::test]
    async fn create_with_other_email_is_forbidden() {
        let (state, _staff, regular) = seeded_state().await;
        let err = create_account(
            Auth(regular),
            State(state),
            Json(CreateAccountRequest {
                email: "fake@example.com".into(),
                first_name: "Hack".into(),
                last_name: String::new(),
                auth_id: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert!(err.message.to_lowercase().contains("own email"));
    }

    #[tokio::test]
    async fn create_duplicate_email_is_bad_request() {
        let (state, _staff, regular) = seeded_state().await;
        let err = create_account(
            Auth(regular.clone()),
            State(state),
            Json(CreateAccountRequest {
                email: regular.email.clone(),
                first_name: String::new(),
                last_name: String::new(),
                auth_id: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn staff_creates_for_other_email() {
        let (state, staff, _regular) = seeded_state().await;
        let (status, Json(created)) = create_account(
            Auth(staff),
            State(state.clone()),
            Json(CreateAccountRequest {
                email: "fresh@example.com".into(),
                first_name: "New".into(),
                last_name: String::new(),
                auth_id: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.email, "fresh@example.com");
        assert_eq!(state.store.read().await.list().len(), 4);
    }

    #[tokio::test]
    async fn update_self_is_allowed() {
        let (state, _staff, regular) = seeded_state().await;
        let Json(updated) = update_account(
            Auth(regular.clone()),
            State(state),
            Path(regular.id),
            Json(UpdateAccountRequest {
                first_name: Some("Updated".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.first_name, "Updated");
    }

    #[tokio::test]
    async fn update_other_as_regular_is_not_found() {
        let (state, staff, regular) = seeded_state().await;
        let err = update_account(
            Auth(regular),
            State(state),
            Path(staff.id),
            Json(UpdateAccountRequest::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_self_returns_no_content() {
        let (state, _staff, regular) = seeded_state().await;
        let status = delete_account(Auth(regular.clone()), State(state.clone()), Path(regular.id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state.store.read().await.get(regular.id).is_none());
    }

    #[tokio::test]
    async fn delete_other_as_staff_is_allowed() {
        let (state, staff, regular) = seeded_state().await;
        let status = delete_account(Auth(staff), State(state), Path(regular.id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn me_returns_current_account() {
        let (_state, _staff, regular) = seeded_state().await;
        let Json(me) = current_account(Auth(regular.clone())).await;
        assert_eq!(me.email, "user@example.com");
        assert_eq!(me.id, regular.id);
    }
}
