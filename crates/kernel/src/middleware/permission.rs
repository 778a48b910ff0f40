//! Permission gate for management routes.
//!
//! Looks up the resource registered for the matched route and method. Anonymous
//! resources pass without a principal; everything else needs a principal the
//! access evaluator allows.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::access::Decision;
use crate::auth::{AuthenticationError, Principal};
use crate::error::AppError;
use crate::state::AppState;

/// Prefix under which all JSON API routes are mounted.
const API_PREFIX: &str = "/api";

/// Catalog url for a matched route template.
///
/// `/api/role/list` is registered as `/role/list`.
pub fn catalog_url(matched: &str) -> &str {
    match matched.strip_prefix(API_PREFIX) {
        Some(rest) if rest.starts_with('/') => rest,
        _ => matched,
    }
}

/// Middleware applied with `route_layer` to gated routes.
pub async fn check_permission(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let matched = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let url = catalog_url(&matched).to_string();
    let method = request.method().as_str().to_string();

    let resource = match state.catalog().find_resource(&url, &method).await {
        Ok(resource) => resource,
        Err(e) => return AppError::from(e).into_response(),
    };

    if resource.as_ref().is_some_and(|r| r.is_anonymous) {
        debug!(url = %url, method = %method, "anonymous resource");
        return next.run(request).await;
    }

    let Some(principal) = request.extensions().get::<Principal>() else {
        debug!(url = %url, method = %method, "no principal for protected resource");
        return AppError::Unauthenticated(AuthenticationError::Missing).into_response();
    };

    match state.access().evaluate(principal, &url, &method).await {
        Ok(Decision::Allow) => {
            debug!(user_id = %principal.id, url = %url, method = %method, "access allowed");
            next.run(request).await
        }
        Ok(Decision::Deny) => {
            debug!(user_id = %principal.id, url = %url, method = %method, "access denied");
            AppError::Forbidden.into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_url() {
        assert_eq!(catalog_url("/api/role/list"), "/role/list");
        assert_eq!(catalog_url("/api/menu/{id}"), "/menu/{id}");
        assert_eq!(catalog_url("/role/list"), "/role/list");
        assert_eq!(catalog_url("/apiary"), "/apiary");
    }
}
