#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Menu and resource tree tests over real model records.

use quire_kernel::access::{Branch, build_tree, to_options};
use quire_kernel::models::{Menu, Resource};
use quire_test_utils::{test_child_menu, test_child_resource, test_menu, test_resource};

fn names(menus: &[Branch<Menu>]) -> Vec<&str> {
    menus.iter().map(|b| b.node.name.as_str()).collect()
}

#[test]
fn test_menu_tree_ordered_by_order_num() {
    let system = test_menu("System", 2);
    let dashboard = test_menu("Dashboard", 1);
    let users = test_child_menu(&system, "Users", 2);
    let roles = test_child_menu(&system, "Roles", 1);

    let tree = build_tree(
        vec![users, system, roles, dashboard],
        Menu::order_key,
    );

    assert_eq!(names(&tree), ["Dashboard", "System"]);
    assert!(tree[0].children.is_empty());
    assert_eq!(names(&tree[1].children), ["Roles", "Users"]);
}

#[test]
fn test_menu_ties_keep_input_order() {
    let a = test_menu("A", 1);
    let b = test_menu("B", 1);
    let c = test_menu("C", 0);

    let tree = build_tree(vec![a, b, c], Menu::order_key);

    assert_eq!(names(&tree), ["C", "A", "B"]);
}

#[test]
fn test_menu_orphans_and_grandchildren_dropped() {
    let system = test_menu("System", 1);
    let users = test_child_menu(&system, "Users", 1);
    let detail = test_child_menu(&users, "Detail", 1);
    let ghost_parent = test_menu("Ghost", 9);
    let orphan = test_child_menu(&ghost_parent, "Orphan", 1);

    let tree = build_tree(vec![system, users, detail, orphan], Menu::order_key);

    assert_eq!(names(&tree), ["System"]);
    assert_eq!(names(&tree[0].children), ["Users"]);
    assert!(tree[0].children[0].children.is_empty());
}

#[test]
fn test_resource_tree_ordered_by_creation() {
    let articles = test_resource("", "");
    let later = test_child_resource(&articles, "/article", "POST", 20);
    let earlier = test_child_resource(&articles, "/article/list", "GET", 10);

    let tree = build_tree(vec![later, articles, earlier], |r: &Resource| r.created);

    assert_eq!(tree.len(), 1);
    let urls: Vec<_> = tree[0].children.iter().map(|b| b.node.url.as_str()).collect();
    assert_eq!(urls, ["/article/list", "/article"]);
}

#[test]
fn test_menu_branch_json_shape() {
    let system = test_menu("System", 1);
    let users = test_child_menu(&system, "Users", 1);
    let system_id = system.id;

    let tree = build_tree(vec![system, users], Menu::order_key);
    let json = serde_json::to_value(&tree).unwrap();

    let root = &json[0];
    assert_eq!(root["name"], "System");
    assert_eq!(root["path"], "/system");
    assert_eq!(root["order_num"], 1);
    assert!(root["parent_id"].is_null());

    let child = &root["children"][0];
    assert_eq!(child["name"], "Users");
    assert_eq!(child["parent_id"], system_id.to_string());
    assert_eq!(child["children"], serde_json::json!([]));
}

#[test]
fn test_resource_branch_uses_request_method() {
    let resource = test_resource("/role", "DELETE");

    let tree = build_tree(vec![resource], |r: &Resource| r.created);
    let json = serde_json::to_value(&tree).unwrap();

    assert_eq!(json[0]["request_method"], "DELETE");
    assert_eq!(json[0]["children"], serde_json::json!([]));
}

#[test]
fn test_menu_options() {
    let system = test_menu("System", 1);
    let users = test_child_menu(&system, "Users", 1);
    let (system_id, users_id) = (system.id, users.id);

    let tree = build_tree(vec![users, system], Menu::order_key);
    let options = to_options(&tree, |m: &Menu| m.name.clone());

    assert_eq!(options.len(), 1);
    assert_eq!(options[0].key, system_id);
    assert_eq!(options[0].label, "System");
    assert_eq!(options[0].children[0].key, users_id);
    assert_eq!(options[0].children[0].label, "Users");
    assert!(options[0].children[0].children.is_empty());
}

#[test]
fn test_menu_tree_round_trips_through_json() {
    let system = test_menu("System", 2);
    let dashboard = test_menu("Dashboard", 1);
    let users = test_child_menu(&system, "Users", 2);
    let roles = test_child_menu(&system, "Roles", 1);

    let tree = build_tree(vec![users, system, roles, dashboard], Menu::order_key);
    let encoded = serde_json::to_string(&tree).unwrap();
    let decoded: Vec<Branch<Menu>> = serde_json::from_str(&encoded).unwrap();

    assert_eq!(decoded, tree);
    assert_eq!(names(&decoded[1].children), ["Roles", "Users"]);
}

#[test]
fn test_resource_tree_round_trips_through_json() {
    let articles = test_resource("", "");
    let list = test_child_resource(&articles, "/article/list", "GET", 10);

    let tree = build_tree(vec![list, articles], |r: &Resource| r.created);
    let encoded = serde_json::to_string(&tree).unwrap();
    let decoded: Vec<Branch<Resource>> = serde_json::from_str(&encoded).unwrap();

    assert_eq!(decoded, tree);
    assert_eq!(decoded[0].children[0].node.method, "GET");
}

#[test]
fn test_empty_tree_decodes() {
    let decoded: Vec<Branch<Menu>> = serde_json::from_str("[]").unwrap();
    assert!(decoded.is_empty());
}
