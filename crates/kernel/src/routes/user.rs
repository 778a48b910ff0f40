//! User management and self-service profile routes.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engagement::LikeSets;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthPrincipal;
use crate::models::Role;
use crate::models::User;
use crate::models::user::{UpdateProfile, UserFilter};
use crate::presence::OnlineUser;
use crate::routes::helpers::{DONE, Done, KeywordQuery, PageQuery, PageResult};
use crate::state::AppState;

/// Accepted password length, in characters.
const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 4..=20;

/// Create the user management router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/user/info", get(info))
        .route("/api/user/current", put(update_current))
        .route("/api/user/current/password", put(update_password))
        .route("/api/user/list", get(list))
        .route("/api/user", put(update_user))
        .route("/api/user/disable", put(set_disabled))
        .route("/api/user/online", get(online))
        .route("/api/user/offline/{id}", post(force_offline))
}

// -------------------------------------------------------------------------
// Request / response types
// -------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct UserInfo {
    #[serde(flatten)]
    user: User,
    roles: Vec<String>,
    #[serde(flatten)]
    likes: LikeSets,
}

#[derive(Debug, Deserialize)]
struct UpdatePasswordRequest {
    old_password: String,
    new_password: String,
}

#[derive(Debug, Deserialize)]
struct UserListQuery {
    #[serde(default)]
    page_num: i64,
    #[serde(default)]
    page_size: i64,
    username: Option<String>,
    nickname: Option<String>,
    login_type: Option<i16>,
}

impl UserListQuery {
    fn page(&self) -> PageQuery {
        PageQuery {
            page_num: self.page_num,
            page_size: self.page_size,
        }
    }

    fn filter(&self) -> UserFilter {
        UserFilter {
            username: self.username.clone(),
            nickname: self.nickname.clone(),
            login_type: self.login_type,
        }
    }
}

#[derive(Debug, Serialize)]
struct UserRow {
    #[serde(flatten)]
    user: User,
    role_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
struct UpdateUserRequest {
    id: Uuid,
    nickname: String,
    #[serde(default)]
    role_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
struct DisableRequest {
    id: Uuid,
    is_disable: bool,
}

// -------------------------------------------------------------------------
// Handlers
// -------------------------------------------------------------------------

/// Profile of the caller with role names and like sets.
pub(crate) async fn info(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> AppResult<Json<UserInfo>> {
    let user = User::find_by_id(state.db(), principal.id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    let likes = state.engagement().like_sets(principal.id).await?;

    Ok(Json(UserInfo {
        user,
        roles: principal.roles.into_iter().map(|r| r.name).collect(),
        likes,
    }))
}

/// Update the caller's own profile.
pub(crate) async fn update_current(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(input): Json<UpdateProfile>,
) -> AppResult<Json<User>> {
    if input.nickname.trim().is_empty() {
        return Err(AppError::bad_request("nickname is required"));
    }

    let user = User::update_profile(state.db(), principal.id, &input)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    Ok(Json(user))
}

async fn update_password(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(input): Json<UpdatePasswordRequest>,
) -> AppResult<Json<Done>> {
    if !PASSWORD_LEN.contains(&input.new_password.chars().count()) {
        return Err(AppError::bad_request(
            "new password must be 4 to 20 characters",
        ));
    }

    let user = User::find_by_id(state.db(), principal.id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    if !user.verify_password(&input.old_password) {
        return Err(AppError::bad_request("old password is incorrect"));
    }

    User::update_password(state.db(), user.id, &input.new_password).await?;
    tracing::info!(user_id = %user.id, "password changed");

    Ok(Json(DONE))
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<PageResult<UserRow>>> {
    let page = query.page();
    let filter = query.filter();

    let total = User::count(state.db(), &filter).await?;
    let users = User::list_paginated(state.db(), &filter, page.limit(), page.offset()).await?;

    let mut rows = Vec::with_capacity(users.len());
    for user in users {
        let role_ids = Role::user_role_ids(state.db(), user.id).await?;
        rows.push(UserRow { user, role_ids });
    }

    Ok(Json(page.result(total, rows)))
}

/// Update a user's nickname and replace their role set.
async fn update_user(
    State(state): State<AppState>,
    Json(input): Json<UpdateUserRequest>,
) -> AppResult<Json<Done>> {
    if input.nickname.trim().is_empty() {
        return Err(AppError::bad_request("nickname is required"));
    }

    if !User::update_nickname(state.db(), input.id, &input.nickname).await? {
        return Err(AppError::not_found("user not found"));
    }
    Role::set_user_roles(state.db(), input.id, &input.role_ids).await?;

    Ok(Json(DONE))
}

async fn set_disabled(
    State(state): State<AppState>,
    Json(input): Json<DisableRequest>,
) -> AppResult<Json<Done>> {
    if !User::set_disabled(state.db(), input.id, input.is_disable).await? {
        return Err(AppError::not_found("user not found"));
    }

    Ok(Json(DONE))
}

async fn online(
    State(state): State<AppState>,
    Query(query): Query<KeywordQuery>,
) -> AppResult<Json<Vec<OnlineUser>>> {
    let users = state.presence().list_online(query.keyword.as_deref()).await?;
    Ok(Json(users))
}

async fn force_offline(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Done>> {
    if id == principal.id {
        return Err(AppError::bad_request("cannot force yourself offline"));
    }

    state.presence().force_offline(id).await?;
    tracing::info!(user_id = %id, by = %principal.id, "principal forced offline");

    Ok(Json(DONE))
}
