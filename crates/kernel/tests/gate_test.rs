#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Permission gate tests over the real bearer middleware.

mod common;

use axum::http::{Method, StatusCode};
use uuid::Uuid;

use common::{JWT_ISSUER, JWT_SECRET, TestApp, assert_error, body_text, send, send_with_header};
use quire_kernel::auth::TokenService;
use quire_test_utils::test_principal;

#[tokio::test]
async fn test_anonymous_resource_needs_no_token() {
    let app = TestApp::new();
    app.catalog.register_anonymous("/article/list", "GET");

    let response = send(app.gated(), Method::GET, "/api/article/list", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_protected_resource_without_token() {
    let app = TestApp::new();
    app.catalog.register("/role/list", "GET");

    let response = send(app.gated(), Method::GET, "/api/role/list", None).await;

    let error = assert_error(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(error, "not authenticated: missing credential");
}

#[tokio::test]
async fn test_malformed_header_rejected() {
    let app = TestApp::new();
    app.catalog.register_anonymous("/article/list", "GET");

    for header in ["Basic dXNlcjpwYXNz", "Bearer ", "Bearer not-a-jwt"] {
        let response = send_with_header(app.gated(), "/api/article/list", header).await;
        let error = assert_error(response, StatusCode::UNAUTHORIZED).await;
        assert_eq!(error, "not authenticated: malformed credential", "{header}");
    }
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let app = TestApp::new();
    app.catalog.register("/role/list", "GET");
    let principal = test_principal("ann").superuser().build();
    app.principals.insert(principal.clone());

    let expired = TokenService::new(JWT_SECRET, JWT_ISSUER, -3600)
        .issue(principal.id, vec![])
        .unwrap();

    let response = send(app.gated(), Method::GET, "/api/role/list", Some(&expired)).await;

    let error = assert_error(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(error, "not authenticated: credential expired");
}

#[tokio::test]
async fn test_token_from_other_issuer_rejected() {
    let app = TestApp::new();
    let principal = test_principal("ann").superuser().build();
    app.principals.insert(principal.clone());

    let foreign = TokenService::new(JWT_SECRET, "elsewhere", 3600)
        .issue(principal.id, vec![])
        .unwrap();

    let response = send(app.gated(), Method::GET, "/api/role/list", Some(&foreign)).await;

    assert_error(response, StatusCode::UNAUTHORIZED).await;
}

#[tokio::test]
async fn test_unknown_principal_rejected() {
    let app = TestApp::new();
    let token = app.state.tokens().issue(Uuid::now_v7(), vec![]).unwrap();

    let response = send(app.gated(), Method::GET, "/api/role/list", Some(&token)).await;

    let error = assert_error(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(error, "not authenticated: unknown principal");
}

#[tokio::test]
async fn test_disabled_principal_rejected() {
    let app = TestApp::new();
    let principal = test_principal("ann").superuser().disabled().build();
    let token = app.login_as(&principal);

    let response = send(app.gated(), Method::GET, "/api/role/list", Some(&token)).await;

    let error = assert_error(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(error, "not authenticated: principal disabled");
}

#[tokio::test]
async fn test_disabled_principal_rejected_even_on_anonymous_resource() {
    let app = TestApp::new();
    app.catalog.register_anonymous("/article/list", "GET");
    let token = app.login_as(&test_principal("ann").disabled().build());

    let response = send(app.gated(), Method::GET, "/api/article/list", Some(&token)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_superuser_passes_unregistered_route() {
    let app = TestApp::new();
    let token = app.login_as(&test_principal("root").superuser().build());

    let response = send(app.gated(), Method::GET, "/api/unregistered", Some(&token)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.catalog.grant_lookups(), 0);
}

#[tokio::test]
async fn test_principal_without_roles_forbidden() {
    let app = TestApp::new();
    app.catalog.register("/role/list", "GET");
    let token = app.login_as(&test_principal("ann").build());

    let response = send(app.gated(), Method::GET, "/api/role/list", Some(&token)).await;

    let error = assert_error(response, StatusCode::FORBIDDEN).await;
    assert_eq!(error, "forbidden");
}

#[tokio::test]
async fn test_unregistered_route_forbidden_for_regular_user() {
    let app = TestApp::new();
    let role = Uuid::now_v7();
    app.catalog.grant(role, "/role/list", "GET");
    let token = app.login_as(&test_principal("ann").with_role(role, "editor").build());

    let response = send(app.gated(), Method::GET, "/api/unregistered", Some(&token)).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_grant_is_per_method() {
    let app = TestApp::new();
    app.catalog.register("/role", "POST");
    app.catalog.register("/role", "DELETE");
    let role = Uuid::now_v7();
    app.catalog.grant(role, "/role", "POST");
    let token = app.login_as(&test_principal("ann").with_role(role, "editor").build());

    let response = send(app.gated(), Method::POST, "/api/role", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(app.gated(), Method::DELETE, "/api/role", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_revoked_grant_takes_effect_on_next_request() {
    let app = TestApp::new();
    app.catalog.register("/role/list", "GET");
    let role = Uuid::now_v7();
    app.catalog.grant(role, "/role/list", "GET");
    let token = app.login_as(&test_principal("ann").with_role(role, "editor").build());

    let response = send(app.gated(), Method::GET, "/api/role/list", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    app.catalog.revoke_all(role);

    let response = send(app.gated(), Method::GET, "/api/role/list", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_any_role_grants_access() {
    let app = TestApp::new();
    app.catalog.register("/role/list", "GET");
    let (reader, editor) = (Uuid::now_v7(), Uuid::now_v7());
    app.catalog.grant(editor, "/role/list", "GET");
    let token = app.login_as(
        &test_principal("ann")
            .with_role(reader, "reader")
            .with_role(editor, "editor")
            .build(),
    );

    let response = send(app.gated(), Method::GET, "/api/role/list", Some(&token)).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_grant_matches_route_template() {
    let app = TestApp::new();
    app.catalog.register("/menu/{id}", "DELETE");
    let role = Uuid::now_v7();
    app.catalog.grant(role, "/menu/{id}", "DELETE");
    let token = app.login_as(&test_principal("ann").with_role(role, "editor").build());

    let uri = format!("/api/menu/{}", Uuid::now_v7());
    let response = send(app.gated(), Method::DELETE, &uri, Some(&token)).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_catalog_failure_is_server_error() {
    let app = TestApp::new();
    let role = Uuid::now_v7();
    app.catalog.grant(role, "/role/list", "GET");
    let token = app.login_as(&test_principal("ann").with_role(role, "editor").build());
    app.catalog.set_failing(true);

    let response = send(app.gated(), Method::GET, "/api/role/list", Some(&token)).await;

    let error = assert_error(response, StatusCode::INTERNAL_SERVER_ERROR).await;
    assert_eq!(error, "internal server error");
}

#[tokio::test]
async fn test_role_changes_apply_without_new_token() {
    let app = TestApp::new();
    app.catalog.register("/role/list", "GET");
    let role = Uuid::now_v7();
    app.catalog.grant(role, "/role/list", "GET");

    let principal = test_principal("ann").build();
    let token = app.login_as(&principal);

    let response = send(app.gated(), Method::GET, "/api/role/list", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Roles come from the store, not the token
    let mut promoted = principal.clone();
    promoted.roles = test_principal("ann").with_role(role, "editor").build().roles;
    app.principals.insert(promoted);

    let response = send(app.gated(), Method::GET, "/api/role/list", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}
