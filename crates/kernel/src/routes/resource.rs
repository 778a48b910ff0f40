//! Resource catalog management routes.

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::access::{Branch, TreeOption, build_tree, to_options};
use crate::error::{AppError, AppResult};
use crate::models::Resource;
use crate::models::resource::SaveResource;
use crate::routes::helpers::{DONE, Done, KeywordQuery, check_placement, check_removal};
use crate::state::AppState;

/// Create the resource router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/resource/list", get(list))
        .route("/api/resource", post(save))
        .route("/api/resource/{id}", delete(remove))
        .route("/api/resource/anonymous", put(set_anonymous))
        .route("/api/resource/option", get(options))
}

#[derive(Debug, Deserialize)]
struct AnonymousRequest {
    id: Uuid,
    is_anonymous: bool,
}

/// Resources carry no explicit order; creation time keeps the tree stable.
fn resource_tree(resources: Vec<Resource>) -> Vec<Branch<Resource>> {
    build_tree(resources, |r| r.created)
}

/// Names are unique, and so is every non-empty (url, method) pair.
fn check_unique(name_taken: bool, endpoint_taken: bool) -> AppResult<()> {
    if name_taken {
        return Err(AppError::conflict("resource name already exists"));
    }
    if endpoint_taken {
        return Err(AppError::conflict(
            "a resource for this url and method already exists",
        ));
    }
    Ok(())
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<KeywordQuery>,
) -> AppResult<Json<Vec<Branch<Resource>>>> {
    let resources = Resource::list(state.db(), query.keyword.as_deref()).await?;
    Ok(Json(resource_tree(resources)))
}

async fn save(
    State(state): State<AppState>,
    Json(input): Json<SaveResource>,
) -> AppResult<Json<Resource>> {
    if input.name.trim().is_empty() {
        return Err(AppError::bad_request("resource name is required"));
    }

    let parent = match input.parent_id {
        Some(parent_id) => Some(Resource::find_by_id(state.db(), parent_id).await?),
        None => None,
    };
    let has_children = match (input.id, input.parent_id) {
        (Some(id), Some(_)) => Resource::has_children(state.db(), id).await?,
        _ => false,
    };
    check_placement("resource", input.id, parent.as_ref().map(Option::as_ref), has_children)?;

    let name_taken = Resource::name_taken(state.db(), &input.name, input.id).await?;
    let endpoint_taken = !input.url.is_empty()
        && Resource::endpoint_taken(state.db(), &input.url, &input.method, input.id).await?;
    check_unique(name_taken, endpoint_taken)?;

    let resource = match input.id {
        None => Resource::create(state.db(), &input).await?,
        Some(id) => Resource::update(state.db(), id, &input)
            .await?
            .ok_or_else(|| AppError::not_found("resource not found"))?,
    };

    tracing::info!(
        resource_id = %resource.id,
        url = %resource.url,
        method = %resource.method,
        "resource saved"
    );
    Ok(Json(resource))
}

async fn remove(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Done>> {
    let in_use = Resource::is_in_use(state.db(), id).await?;
    let exists = Resource::find_by_id(state.db(), id).await?.is_some();
    let has_children = Resource::has_children(state.db(), id).await?;
    check_removal("resource", in_use, exists, has_children)?;

    Resource::delete(state.db(), id).await?;
    tracing::info!(resource_id = %id, "resource deleted");

    Ok(Json(DONE))
}

async fn set_anonymous(
    State(state): State<AppState>,
    Json(input): Json<AnonymousRequest>,
) -> AppResult<Json<Done>> {
    if !Resource::set_anonymous(state.db(), input.id, input.is_anonymous).await? {
        return Err(AppError::not_found("resource not found"));
    }

    Ok(Json(DONE))
}

async fn options(State(state): State<AppState>) -> AppResult<Json<Vec<TreeOption<Uuid>>>> {
    let resources = Resource::list(state.db(), None).await?;
    let tree = resource_tree(resources);

    Ok(Json(to_options(&tree, |r| r.name.clone())))
}
