#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Access evaluator tests against the in-memory catalog.

use std::sync::Arc;

use uuid::Uuid;

use quire_kernel::access::{AccessError, AccessEvaluator, Decision};
use quire_test_utils::{MemoryCatalog, test_principal};

fn evaluator() -> (Arc<MemoryCatalog>, AccessEvaluator) {
    let catalog = Arc::new(MemoryCatalog::new());
    let evaluator = AccessEvaluator::new(catalog.clone());
    (catalog, evaluator)
}

#[tokio::test]
async fn test_superuser_allowed_everywhere_without_lookup() {
    let (catalog, evaluator) = evaluator();
    let root = test_principal("root").superuser().build();

    for (url, method) in [("/role", "DELETE"), ("/nowhere", "PATCH"), ("", "")] {
        let decision = evaluator.evaluate(&root, url, method).await.unwrap();
        assert_eq!(decision, Decision::Allow);
    }

    assert_eq!(catalog.grant_lookups(), 0);
}

#[tokio::test]
async fn test_superuser_allowed_while_catalog_down() {
    let (catalog, evaluator) = evaluator();
    catalog.set_failing(true);
    let root = test_principal("root").superuser().build();

    let decision = evaluator.evaluate(&root, "/role", "GET").await.unwrap();

    assert_eq!(decision, Decision::Allow);
}

#[tokio::test]
async fn test_no_roles_denied() {
    let (catalog, evaluator) = evaluator();
    let ann = test_principal("ann").build();

    let decision = evaluator.evaluate(&ann, "/role", "GET").await.unwrap();

    assert_eq!(decision, Decision::Deny);
    assert_eq!(catalog.grant_lookups(), 0);
}

#[tokio::test]
async fn test_allow_iff_some_role_grants_exact_pair() {
    let (catalog, evaluator) = evaluator();
    let (reader, editor) = (Uuid::now_v7(), Uuid::now_v7());
    catalog.grant(reader, "/article/list", "GET");
    catalog.grant(editor, "/article", "POST");

    let ann = test_principal("ann")
        .with_role(reader, "reader")
        .with_role(editor, "editor")
        .build();

    let cases = [
        ("/article/list", "GET", Decision::Allow),
        ("/article", "POST", Decision::Allow),
        ("/article", "GET", Decision::Deny),
        ("/article/list", "get", Decision::Deny),
        ("/Article/list", "GET", Decision::Deny),
        ("/article/list/", "GET", Decision::Deny),
    ];

    for (url, method, expected) in cases {
        let decision = evaluator.evaluate(&ann, url, method).await.unwrap();
        assert_eq!(decision, expected, "{method} {url}");
    }
}

#[tokio::test]
async fn test_first_granting_role_short_circuits() {
    let (catalog, evaluator) = evaluator();
    let (first, second) = (Uuid::now_v7(), Uuid::now_v7());
    catalog.grant(first, "/role", "GET");
    catalog.grant(second, "/role", "GET");

    let ann = test_principal("ann")
        .with_role(first, "first")
        .with_role(second, "second")
        .build();

    assert!(evaluator.evaluate(&ann, "/role", "GET").await.unwrap().is_allowed());
    assert_eq!(catalog.grant_lookups(), 1);
}

#[tokio::test]
async fn test_catalog_failure_is_not_a_denial() {
    let (catalog, evaluator) = evaluator();
    let role = Uuid::now_v7();
    catalog.grant(role, "/role", "GET");
    catalog.set_failing(true);

    let ann = test_principal("ann").with_role(role, "editor").build();
    let result = evaluator.evaluate(&ann, "/role", "GET").await;

    assert!(matches!(result, Err(AccessError::CatalogUnavailable(_))));
}

#[tokio::test]
async fn test_evaluation_reflects_current_grants() {
    let (catalog, evaluator) = evaluator();
    let role = Uuid::now_v7();
    let ann = test_principal("ann").with_role(role, "editor").build();

    assert_eq!(
        evaluator.evaluate(&ann, "/menu", "POST").await.unwrap(),
        Decision::Deny
    );

    catalog.grant(role, "/menu", "POST");
    assert_eq!(
        evaluator.evaluate(&ann, "/menu", "POST").await.unwrap(),
        Decision::Allow
    );

    catalog.revoke_all(role);
    assert_eq!(
        evaluator.evaluate(&ann, "/menu", "POST").await.unwrap(),
        Decision::Deny
    );
}
