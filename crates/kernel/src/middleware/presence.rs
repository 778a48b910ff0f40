//! Online presence middleware.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::Principal;
use crate::error::AppError;
use crate::state::AppState;

/// Reject forced-offline principals and refresh everyone else's online entry.
pub async fn listen_online(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(principal) = request.extensions().get::<Principal>().cloned() else {
        return next.run(request).await;
    };

    match state.presence().is_forced_offline(principal.id).await {
        Ok(true) => {
            tracing::info!(user_id = %principal.id, "request from forced-offline principal");
            return AppError::ForcedOffline.into_response();
        }
        Ok(false) => {}
        Err(e) => return AppError::Internal(e).into_response(),
    }

    if let Err(e) = state.presence().refresh(&principal).await {
        tracing::warn!(user_id = %principal.id, error = %e, "failed to refresh online entry");
    }

    next.run(request).await
}
