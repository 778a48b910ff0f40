//! Resource model: the (url, method) catalog guarded by the permission gate.
//!
//! Resources form a two-level tree: a module (no url) groups the endpoints
//! that belong to it.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::user::like_pattern;
use crate::access::{Endpoint, TreeNode};

/// Resource record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Resource {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub url: String,
    #[serde(rename = "request_method")]
    pub method: String,
    pub is_anonymous: bool,
    pub created: DateTime<Utc>,
    pub changed: DateTime<Utc>,
}

impl TreeNode for Resource {
    type Id = Uuid;

    fn node_id(&self) -> Uuid {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }
}

/// Input for creating or updating a resource.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveResource {
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "request_method")]
    pub method: String,
    pub parent_id: Option<Uuid>,
}

impl Resource {
    /// The endpoint this resource guards.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(&self.url, &self.method)
    }

    /// Find a resource by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let resource = sqlx::query_as::<_, Resource>("SELECT * FROM resources WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch resource by id")?;

        Ok(resource)
    }

    /// Find the resource registered for an exact (url, method) pair.
    pub async fn find_by_endpoint(pool: &PgPool, url: &str, method: &str) -> Result<Option<Self>> {
        let resource = sqlx::query_as::<_, Resource>(
            "SELECT * FROM resources WHERE url = $1 AND method = $2 ORDER BY created LIMIT 1",
        )
        .bind(url)
        .bind(method)
        .fetch_optional(pool)
        .await
        .context("failed to fetch resource by endpoint")?;

        Ok(resource)
    }

    /// Check whether another resource already uses `name`.
    pub async fn name_taken(pool: &PgPool, name: &str, exclude: Option<Uuid>) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM resources WHERE name = $1 AND ($2::UUID IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(pool)
        .await
        .context("failed to check resource name")?;

        Ok(exists)
    }

    /// Check whether another resource already guards `(url, method)`.
    pub async fn endpoint_taken(
        pool: &PgPool,
        url: &str,
        method: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM resources
                WHERE url = $1 AND method = $2 AND ($3::UUID IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(url)
        .bind(method)
        .bind(exclude)
        .fetch_one(pool)
        .await
        .context("failed to check resource endpoint")?;

        Ok(exists)
    }

    /// List resources whose name matches a keyword.
    pub async fn list(pool: &PgPool, keyword: Option<&str>) -> Result<Vec<Self>> {
        let resources = sqlx::query_as::<_, Resource>(
            r#"
            SELECT * FROM resources
            WHERE ($1::TEXT IS NULL OR name ILIKE $1)
            ORDER BY created, name
            "#,
        )
        .bind(like_pattern(keyword))
        .fetch_all(pool)
        .await
        .context("failed to list resources")?;

        Ok(resources)
    }

    /// Create a resource.
    pub async fn create(pool: &PgPool, input: &SaveResource) -> Result<Self> {
        let id = Uuid::now_v7();

        let resource = sqlx::query_as::<_, Resource>(
            r#"
            INSERT INTO resources (id, parent_id, name, url, method)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.parent_id)
        .bind(&input.name)
        .bind(&input.url)
        .bind(&input.method)
        .fetch_one(pool)
        .await
        .context("failed to create resource")?;

        Ok(resource)
    }

    /// Update a resource's name, endpoint and parent.
    pub async fn update(pool: &PgPool, id: Uuid, input: &SaveResource) -> Result<Option<Self>> {
        let resource = sqlx::query_as::<_, Resource>(
            r#"
            UPDATE resources
            SET parent_id = $1, name = $2, url = $3, method = $4, changed = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(input.parent_id)
        .bind(&input.name)
        .bind(&input.url)
        .bind(&input.method)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to update resource")?;

        Ok(resource)
    }

    /// Toggle the anonymous flag.
    pub async fn set_anonymous(pool: &PgPool, id: Uuid, anonymous: bool) -> Result<bool> {
        let result =
            sqlx::query("UPDATE resources SET is_anonymous = $1, changed = NOW() WHERE id = $2")
                .bind(anonymous)
                .bind(id)
                .execute(pool)
                .await
                .context("failed to update resource anonymous flag")?;

        Ok(result.rows_affected() > 0)
    }

    /// Check whether any resource names this one as parent.
    pub async fn has_children(pool: &PgPool, id: Uuid) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM resources WHERE parent_id = $1)")
                .bind(id)
                .fetch_one(pool)
                .await
                .context("failed to check resource children")?;

        Ok(exists)
    }

    /// Check whether any role is granted this resource.
    pub async fn is_in_use(pool: &PgPool, id: Uuid) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM role_resources WHERE resource_id = $1)")
                .bind(id)
                .fetch_one(pool)
                .await
                .context("failed to check resource grants")?;

        Ok(exists)
    }

    /// Delete a resource.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete resource")?;

        Ok(result.rows_affected() > 0)
    }

    /// Endpoints granted to a role. Disabled roles grant nothing.
    pub async fn endpoints_for_role(pool: &PgPool, role_id: Uuid) -> Result<HashSet<Endpoint>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT r.url, r.method FROM resources r
            JOIN role_resources rr ON r.id = rr.resource_id
            JOIN roles ro ON ro.id = rr.role_id
            WHERE rr.role_id = $1 AND NOT ro.is_disable
            "#,
        )
        .bind(role_id)
        .fetch_all(pool)
        .await
        .context("failed to get role endpoints")?;

        Ok(rows
            .into_iter()
            .map(|(url, method)| Endpoint { url, method })
            .collect())
    }
}
