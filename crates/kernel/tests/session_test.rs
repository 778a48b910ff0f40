#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Session fallback in the bearer middleware.
//!
//! Sessions live in the in-memory store shipped with `tower-sessions`.

mod common;

use axum::Router;
use axum::body::Body;
use axum::extract::Path;
use axum::http::{Method, Request, StatusCode, header};
use axum::middleware::from_fn_with_state;
use axum::response::Response;
use axum::routing::{get, post};
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session, SessionManagerLayer};
use uuid::Uuid;

use common::{TestApp, assert_error, body_text};
use quire_kernel::middleware::{AuthPrincipal, resolve_principal};
use quire_kernel::session::SESSION_USER_ID;
use quire_test_utils::test_principal;

/// Stub sign-in and identity routes behind the real bearer middleware.
fn router(app: &TestApp, store: MemoryStore) -> Router {
    Router::new()
        .route("/api/session/{id}", post(sign_in))
        .route("/api/whoami", get(whoami))
        .layer(from_fn_with_state(app.state.clone(), resolve_principal))
        .layer(SessionManagerLayer::new(store))
        .with_state(app.state.clone())
}

async fn sign_in(session: Session, Path(id): Path<Uuid>) -> &'static str {
    session.insert(SESSION_USER_ID, id).await.unwrap();
    "ok"
}

async fn whoami(AuthPrincipal(principal): AuthPrincipal) -> String {
    principal.username
}

async fn call(router: Router, method: Method, uri: &str, cookie: Option<&str>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    router.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
}

/// Sign in and return the session cookie pair.
async fn session_cookie(router: Router, id: Uuid) -> String {
    let response = call(router, Method::POST, &format!("/api/session/{id}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn test_session_user_resolves_without_header() {
    let app = TestApp::new();
    let store = MemoryStore::default();
    let ann = test_principal("ann").build();
    app.principals.insert(ann.clone());

    let cookie = session_cookie(router(&app, store.clone()), ann.id).await;
    let response = call(router(&app, store), Method::GET, "/api/whoami", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ann");
}

#[tokio::test]
async fn test_no_session_means_no_principal() {
    let app = TestApp::new();

    let router = router(&app, MemoryStore::default());
    let response = call(router, Method::GET, "/api/whoami", None).await;

    let error = assert_error(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(error, "not authenticated: missing credential");
}

#[tokio::test]
async fn test_disabled_session_user_cleared() {
    let app = TestApp::new();
    let store = MemoryStore::default();
    let ann = test_principal("ann").build();
    app.principals.insert(ann.clone());
    let cookie = session_cookie(router(&app, store.clone()), ann.id).await;

    let mut disabled = ann.clone();
    disabled.disabled = true;
    app.principals.insert(disabled);

    let response = call(router(&app, store.clone()), Method::GET, "/api/whoami", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The stale id is gone, so re-enabling does not revive the session
    app.principals.insert(ann);
    let response = call(router(&app, store), Method::GET, "/api/whoami", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bearer_header_wins_over_session() {
    let app = TestApp::new();
    let store = MemoryStore::default();
    let ann = test_principal("ann").build();
    let bob = test_principal("bob").build();
    app.principals.insert(ann.clone());
    let token = app.login_as(&bob);
    let cookie = session_cookie(router(&app, store.clone()), ann.id).await;

    let request = Request::builder()
        .uri("/api/whoami")
        .header(header::COOKIE, &cookie)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = router(&app, store).oneshot(request).await.unwrap();

    assert_eq!(body_text(response).await, "bob");
}
