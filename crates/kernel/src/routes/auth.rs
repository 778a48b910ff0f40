//! Login and logout.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, warn};

use crate::engagement::LikeSets;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthPrincipal;
use crate::models::{Role, User};
use crate::presence::OnlineUser;
use crate::routes::helpers::{DONE, Done, client_ip};
use crate::session::SESSION_USER_ID;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    user: User,
    token: String,
    #[serde(flatten)]
    likes: LikeSets,
}

/// POST /api/login
///
/// Verifies credentials, issues an access token and opens a session.
/// Logging in lifts any forced-offline flag.
async fn login(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let Some(user) = User::find_by_username(state.db(), &request.username).await? else {
        info!(username = %request.username, "login attempt for unknown user");
        return Err(AppError::InvalidCredentials);
    };

    if !user.verify_password(&request.password) {
        info!(user_id = %user.id, "login attempt with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    if !user.is_active() {
        info!(user_id = %user.id, "login attempt for disabled user");
        return Err(AppError::Forbidden);
    }

    let role_ids = Role::get_user_roles(state.db(), user.id)
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect();
    let token = state.tokens().issue(user.id, role_ids)?;

    let ip = client_ip(&headers);
    User::record_login(state.db(), user.id, &ip).await?;

    session
        .insert(SESSION_USER_ID, user.id)
        .await
        .map_err(|e| anyhow::anyhow!("failed to store session: {e}"))?;

    state.presence().clear_offline(user.id).await?;
    if let Err(e) = state
        .presence()
        .mark_online(&OnlineUser::from_user(&user, &ip))
        .await
    {
        warn!(user_id = %user.id, error = %e, "failed to mark user online");
    }

    let likes = state.engagement().like_sets(user.id).await?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(LoginResponse { user, token, likes }))
}

/// GET /api/logout
async fn logout(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    session: Session,
) -> AppResult<Json<Done>> {
    session
        .delete()
        .await
        .map_err(|e| anyhow::anyhow!("failed to delete session: {e}"))?;

    state.presence().remove_online(principal.id).await?;

    info!(user_id = %principal.id, "user logged out");
    Ok(Json(DONE))
}

/// Create the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/logout", get(logout))
}
