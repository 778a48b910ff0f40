//! Role management routes.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Role;
use crate::models::role::{RoleOption, UpdateRole, well_known};
use crate::routes::helpers::{PageQuery, PageResult};
use crate::state::AppState;

/// Create the role router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/role/list", get(list))
        .route("/api/role", post(save).delete(delete))
        .route("/api/role/option", get(options))
}

#[derive(Debug, Deserialize)]
struct RoleListQuery {
    #[serde(default)]
    page_num: i64,
    #[serde(default)]
    page_size: i64,
    keyword: Option<String>,
}

#[derive(Debug, Serialize)]
struct RoleRow {
    #[serde(flatten)]
    role: Role,
    resource_ids: Vec<Uuid>,
    menu_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
struct SaveRole {
    id: Option<Uuid>,
    #[serde(flatten)]
    role: UpdateRole,
}

#[derive(Debug, Serialize)]
struct Deleted {
    deleted: u64,
}

fn check_names(input: &UpdateRole) -> AppResult<()> {
    if input.name.trim().is_empty() || input.label.trim().is_empty() {
        return Err(AppError::bad_request("role name and label are required"));
    }
    Ok(())
}

/// `conflicting` is another role already holding the name or label.
fn check_unique(input: &UpdateRole, conflicting: Option<&Role>) -> AppResult<()> {
    match conflicting {
        None => Ok(()),
        Some(role) if role.name == input.name => {
            Err(AppError::conflict("role name already exists"))
        }
        Some(_) => Err(AppError::conflict("role label already exists")),
    }
}

fn check_deletable(ids: &[Uuid]) -> AppResult<()> {
    if ids.iter().any(|id| well_known::is_builtin(*id)) {
        return Err(AppError::bad_request("built-in roles cannot be deleted"));
    }
    Ok(())
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<RoleListQuery>,
) -> AppResult<Json<PageResult<RoleRow>>> {
    let page = PageQuery {
        page_num: query.page_num,
        page_size: query.page_size,
    };
    let keyword = query.keyword.as_deref();

    let total = Role::count(state.db(), keyword).await?;
    let roles = Role::list_paginated(state.db(), keyword, page.limit(), page.offset()).await?;

    let mut rows = Vec::with_capacity(roles.len());
    for role in roles {
        let resource_ids = Role::resource_ids(state.db(), role.id).await?;
        let menu_ids = Role::menu_ids(state.db(), role.id).await?;
        rows.push(RoleRow {
            role,
            resource_ids,
            menu_ids,
        });
    }

    Ok(Json(page.result(total, rows)))
}

/// Create a role, or update one and replace its grants.
async fn save(
    State(state): State<AppState>,
    Json(input): Json<SaveRole>,
) -> AppResult<Json<Role>> {
    let SaveRole { id, role: input } = input;

    check_names(&input)?;
    let conflicting = Role::find_conflicting(state.db(), &input.name, &input.label, id).await?;
    check_unique(&input, conflicting.as_ref())?;

    let role = match id {
        None => {
            let role = Role::create(state.db(), &input.name, &input.label).await?;
            tracing::info!(role_id = %role.id, name = %role.name, "role created");
            role
        }
        Some(id) => {
            let role = Role::update(state.db(), id, &input)
                .await?
                .ok_or_else(|| AppError::not_found("role not found"))?;
            tracing::info!(
                role_id = %role.id,
                resources = input.resource_ids.len(),
                menus = input.menu_ids.len(),
                "role updated"
            );
            role
        }
    };

    Ok(Json(role))
}

async fn delete(
    State(state): State<AppState>,
    Json(ids): Json<Vec<Uuid>>,
) -> AppResult<Json<Deleted>> {
    check_deletable(&ids)?;

    let deleted = Role::delete_many(state.db(), &ids).await?;
    tracing::info!(count = deleted, "roles deleted");

    Ok(Json(Deleted { deleted }))
}

async fn options(State(state): State<AppState>) -> AppResult<Json<Vec<RoleOption>>> {
    Ok(Json(Role::options(state.db()).await?))
}
