//! HTTP route handlers.
//!
//! Every JSON route lives under `/api`. Management routes sit behind the
//! permission gate and the presence check; auth, front and health routes
//! do not.

pub mod auth;
pub mod front;
pub mod health;
pub mod helpers;
pub mod menu;
pub mod resource;
pub mod role;
pub mod user;

use axum::Router;
use axum::middleware::from_fn_with_state;

use crate::middleware::{check_permission, listen_online, resolve_principal};
use crate::state::AppState;

/// Management routes wrapped in the permission gate and presence check.
///
/// The gate runs first, so a denied request never refreshes presence.
pub fn gated_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(user::router())
        .merge(role::router())
        .merge(resource::router())
        .merge(menu::router())
        .route_layer(from_fn_with_state(state.clone(), listen_online))
        .route_layer(from_fn_with_state(state.clone(), check_permission))
}

/// The full application router, without session, CORS or tracing layers.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(front::router())
        .merge(gated_router(&state))
        .layer(from_fn_with_state(state.clone(), resolve_principal))
        .with_state(state)
}
