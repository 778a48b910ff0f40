//! Menu management routes and the caller's navigation tree.

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::access::{Branch, TreeOption, build_tree, to_options};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthPrincipal;
use crate::models::Menu;
use crate::models::menu::SaveMenu;
use crate::routes::helpers::{DONE, Done, KeywordQuery, check_placement, check_removal};
use crate::state::AppState;

/// Create the menu router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/menu/user/list", get(user_menus))
        .route("/api/menu/list", get(list))
        .route("/api/menu", post(save))
        .route("/api/menu/{id}", delete(remove))
        .route("/api/menu/option", get(options))
}

fn menu_tree(menus: Vec<Menu>) -> Vec<Branch<Menu>> {
    build_tree(menus, Menu::order_key)
}

/// Menu tree of the caller: every menu for superusers, otherwise the union
/// of menus granted to their enabled roles.
async fn user_menus(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> AppResult<Json<Vec<Branch<Menu>>>> {
    let menus = if principal.superuser {
        Menu::list_all(state.db()).await?
    } else {
        Menu::list_for_user(state.db(), principal.id).await?
    };

    Ok(Json(menu_tree(menus)))
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<KeywordQuery>,
) -> AppResult<Json<Vec<Branch<Menu>>>> {
    let menus = Menu::list(state.db(), query.keyword.as_deref()).await?;
    Ok(Json(menu_tree(menus)))
}

async fn save(State(state): State<AppState>, Json(input): Json<SaveMenu>) -> AppResult<Json<Menu>> {
    if input.name.trim().is_empty() || input.path.trim().is_empty() {
        return Err(AppError::bad_request("menu name and path are required"));
    }

    let parent = match input.parent_id {
        Some(parent_id) => Some(Menu::find_by_id(state.db(), parent_id).await?),
        None => None,
    };
    let has_children = match (input.id, input.parent_id) {
        (Some(id), Some(_)) => Menu::has_children(state.db(), id).await?,
        _ => false,
    };
    check_placement("menu", input.id, parent.as_ref().map(Option::as_ref), has_children)?;

    if Menu::path_taken(state.db(), &input.name, &input.path, input.id).await? {
        return Err(AppError::conflict("menu with this name and path already exists"));
    }

    let menu = match input.id {
        None => Menu::create(state.db(), &input).await?,
        Some(id) => Menu::update(state.db(), id, &input)
            .await?
            .ok_or_else(|| AppError::not_found("menu not found"))?,
    };

    tracing::info!(menu_id = %menu.id, path = %menu.path, "menu saved");
    Ok(Json(menu))
}

async fn remove(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Done>> {
    let in_use = Menu::is_in_use(state.db(), id).await?;
    let exists = Menu::find_by_id(state.db(), id).await?.is_some();
    let has_children = Menu::has_children(state.db(), id).await?;
    check_removal("menu", in_use, exists, has_children)?;

    Menu::delete(state.db(), id).await?;
    tracing::info!(menu_id = %id, "menu deleted");

    Ok(Json(DONE))
}

async fn options(State(state): State<AppState>) -> AppResult<Json<Vec<TreeOption<Uuid>>>> {
    let tree = menu_tree(Menu::list_all(state.db()).await?);
    Ok(Json(to_options(&tree, |m| m.name.clone())))
}
