//! Bearer token authentication middleware.
//!
//! Checks `Authorization: Bearer <token>` headers, resolves the principal
//! and stores it in request extensions. Requests without the header fall
//! back to the user id stored in the session at login.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::{AuthenticationError, Principal, ResolveError};
use crate::error::AppError;
use crate::session::SESSION_USER_ID;
use crate::state::AppState;

/// Middleware to resolve bearer credentials into a [`Principal`].
///
/// If no `Authorization` header is present, uses the session's user id when
/// there is one and otherwise passes through without a principal. If the
/// header is present but does not resolve, returns 401.
pub async fn resolve_principal(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(value) = request.headers().get(header::AUTHORIZATION) else {
        let session = request.extensions().get::<Session>().cloned();
        return match session_principal(&state, session).await {
            Ok(Some(principal)) => {
                request.extensions_mut().insert(principal);
                next.run(request).await
            }
            Ok(None) => next.run(request).await,
            Err(e) => AppError::from(e).into_response(),
        };
    };

    let Ok(value) = value.to_str() else {
        return AppError::Unauthenticated(AuthenticationError::Malformed).into_response();
    };

    match state.principals().resolve(Some(value)).await {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(ResolveError::Unauthenticated(reason)) => {
            debug!(reason = %reason, "bearer credential rejected");
            AppError::Unauthenticated(reason).into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

/// Principal for the user id stored in the session, if any.
///
/// A stored id that no longer resolves is removed from the session and the
/// request continues without a principal.
async fn session_principal(
    state: &AppState,
    session: Option<Session>,
) -> Result<Option<Principal>, ResolveError> {
    let Some(session) = session else {
        return Ok(None);
    };

    let user_id = match session.get::<Uuid>(SESSION_USER_ID).await {
        Ok(Some(user_id)) => user_id,
        Ok(None) => return Ok(None),
        Err(e) => {
            warn!(error = %e, "failed to read session");
            return Ok(None);
        }
    };

    match state.principals().resolve_user(user_id).await {
        Ok(principal) => Ok(Some(principal)),
        Err(ResolveError::Unauthenticated(reason)) => {
            debug!(user_id = %user_id, reason = %reason, "session principal rejected");
            if let Err(e) = session.remove::<Uuid>(SESSION_USER_ID).await {
                warn!(error = %e, "failed to clear session user");
            }
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Extractor for the resolved principal. Rejects with 401 when absent.
#[derive(Debug, Clone)]
pub struct AuthPrincipal(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for AuthPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(AuthPrincipal)
            .ok_or(AppError::Unauthenticated(AuthenticationError::Missing))
    }
}
