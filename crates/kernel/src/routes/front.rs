//! Front-site routes: likes, views and the reader's own profile.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::engagement::{ArticleCounters, LikeState, LikeTarget};
use crate::error::AppResult;
use crate::middleware::AuthPrincipal;
use crate::routes::user;
use crate::state::AppState;

/// Create the front router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/front/user/info",
            get(user::info).put(user::update_current),
        )
        .route("/api/front/article/{id}/like", post(like_article))
        .route("/api/front/comment/{id}/like", post(like_comment))
        .route("/api/front/article/{id}/view", post(view_article))
}

async fn like_article(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
) -> AppResult<Json<LikeState>> {
    let like = state
        .engagement()
        .toggle_like(LikeTarget::Article, principal.id, &id)
        .await?;
    Ok(Json(like))
}

async fn like_comment(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<String>,
) -> AppResult<Json<LikeState>> {
    let like = state
        .engagement()
        .toggle_like(LikeTarget::Comment, principal.id, &id)
        .await?;
    Ok(Json(like))
}

async fn view_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ArticleCounters>> {
    Ok(Json(state.engagement().record_view(&id).await?))
}
