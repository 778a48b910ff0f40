//! Role model and grant management.
//!
//! Roles carry two grant sets: resources (checked by the access evaluator)
//! and menus (used to build a user's navigation tree). Grants have no
//! lifecycle of their own; they are replaced wholesale when a role is saved.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::user::like_pattern;

/// Well-known role IDs.
pub mod well_known {
    use uuid::Uuid;

    /// Administrator role.
    pub const ADMIN_ROLE_ID: Uuid = Uuid::from_u128(1);

    /// Guest role (assigned to newly created users).
    pub const GUEST_ROLE_ID: Uuid = Uuid::from_u128(2);

    /// Check whether a role is built in and must not be deleted.
    pub fn is_builtin(id: Uuid) -> bool {
        id == ADMIN_ROLE_ID || id == GUEST_ROLE_ID
    }
}

/// Role record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub label: String,
    pub is_disable: bool,
    pub created: DateTime<Utc>,
    pub changed: DateTime<Utc>,
}

/// Input for updating a role together with its grants.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRole {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub is_disable: bool,
    #[serde(default)]
    pub resource_ids: Vec<Uuid>,
    #[serde(default)]
    pub menu_ids: Vec<Uuid>,
}

/// `{ value, name }` pair used by selector widgets.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoleOption {
    #[serde(rename = "value")]
    pub id: Uuid,
    pub name: String,
}

impl Role {
    /// Find a role by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch role by id")?;

        Ok(role)
    }

    /// Find a role whose name or label collides with the given values.
    ///
    /// `exclude` skips the role being edited.
    pub async fn find_conflicting(
        pool: &PgPool,
        name: &str,
        label: &str,
        exclude: Option<Uuid>,
    ) -> Result<Option<Self>> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT * FROM roles
            WHERE (name = $1 OR label = $2)
              AND ($3::UUID IS NULL OR id <> $3)
            LIMIT 1
            "#,
        )
        .bind(name)
        .bind(label)
        .bind(exclude)
        .fetch_optional(pool)
        .await
        .context("failed to check role uniqueness")?;

        Ok(role)
    }

    /// List roles matching a keyword, paginated.
    pub async fn list_paginated(
        pool: &PgPool,
        keyword: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT * FROM roles
            WHERE ($1::TEXT IS NULL OR name ILIKE $1)
            ORDER BY created, name
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(like_pattern(keyword))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("failed to list roles")?;

        Ok(roles)
    }

    /// Count roles matching a keyword.
    pub async fn count(pool: &PgPool, keyword: Option<&str>) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM roles WHERE ($1::TEXT IS NULL OR name ILIKE $1)")
                .bind(like_pattern(keyword))
                .fetch_one(pool)
                .await
                .context("failed to count roles")?;

        Ok(count)
    }

    /// List all roles as selector options.
    pub async fn options(pool: &PgPool) -> Result<Vec<RoleOption>> {
        let options =
            sqlx::query_as::<_, RoleOption>("SELECT id, name FROM roles ORDER BY created, name")
                .fetch_all(pool)
                .await
                .context("failed to list role options")?;

        Ok(options)
    }

    /// Create a new role with no grants.
    pub async fn create(pool: &PgPool, name: &str, label: &str) -> Result<Self> {
        let id = Uuid::now_v7();

        let role = sqlx::query_as::<_, Role>(
            "INSERT INTO roles (id, name, label) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(id)
        .bind(name)
        .bind(label)
        .fetch_one(pool)
        .await
        .context("failed to create role")?;

        Ok(role)
    }

    /// Update a role and replace its resource and menu grants.
    ///
    /// Runs in a single transaction so a reader never sees a half-applied
    /// grant set.
    pub async fn update(pool: &PgPool, id: Uuid, input: &UpdateRole) -> Result<Option<Self>> {
        let mut tx = pool.begin().await.context("failed to begin transaction")?;

        let role = sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles SET name = $1, label = $2, is_disable = $3, changed = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.label)
        .bind(input.is_disable)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("failed to update role")?;

        let Some(role) = role else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM role_resources WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("failed to clear role resources")?;

        if !input.resource_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO role_resources (role_id, resource_id)
                SELECT $1, UNNEST($2::UUID[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(id)
            .bind(&input.resource_ids)
            .execute(&mut *tx)
            .await
            .context("failed to grant role resources")?;
        }

        sqlx::query("DELETE FROM role_menus WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("failed to clear role menus")?;

        if !input.menu_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO role_menus (role_id, menu_id)
                SELECT $1, UNNEST($2::UUID[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(id)
            .bind(&input.menu_ids)
            .execute(&mut *tx)
            .await
            .context("failed to grant role menus")?;
        }

        tx.commit().await.context("failed to commit role update")?;

        Ok(Some(role))
    }

    /// Delete roles by ID. Grants and user assignments cascade.
    pub async fn delete_many(pool: &PgPool, ids: &[Uuid]) -> Result<u64> {
        if ids.iter().any(|id| well_known::is_builtin(*id)) {
            anyhow::bail!("cannot delete built-in role");
        }

        let result = sqlx::query("DELETE FROM roles WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await
            .context("failed to delete roles")?;

        Ok(result.rows_affected())
    }

    /// Get the IDs of resources granted to a role.
    pub async fn resource_ids(pool: &PgPool, role_id: Uuid) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT resource_id FROM role_resources WHERE role_id = $1",
        )
        .bind(role_id)
        .fetch_all(pool)
        .await
        .context("failed to get role resource ids")?;

        Ok(ids)
    }

    /// Get the IDs of menus granted to a role.
    pub async fn menu_ids(pool: &PgPool, role_id: Uuid) -> Result<Vec<Uuid>> {
        let ids =
            sqlx::query_scalar::<_, Uuid>("SELECT menu_id FROM role_menus WHERE role_id = $1")
                .bind(role_id)
                .fetch_all(pool)
                .await
                .context("failed to get role menu ids")?;

        Ok(ids)
    }

    /// Get the enabled roles of a user, ordered by name.
    pub async fn get_user_roles(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT r.* FROM roles r
            JOIN user_roles ur ON r.id = ur.role_id
            WHERE ur.user_id = $1 AND r.is_disable = FALSE
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("failed to get user roles")?;

        Ok(roles)
    }

    /// Get the IDs of all roles assigned to a user, including disabled ones.
    pub async fn user_role_ids(pool: &PgPool, user_id: Uuid) -> Result<Vec<Uuid>> {
        let ids =
            sqlx::query_scalar::<_, Uuid>("SELECT role_id FROM user_roles WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(pool)
                .await
                .context("failed to get user role ids")?;

        Ok(ids)
    }

    /// Assign a role to a user.
    pub async fn assign_to_user(pool: &PgPool, user_id: Uuid, role_id: Uuid) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(pool)
        .await
        .context("failed to assign role to user")?;

        Ok(())
    }

    /// Replace the full role set of a user.
    pub async fn set_user_roles(pool: &PgPool, user_id: Uuid, role_ids: &[Uuid]) -> Result<()> {
        let mut tx = pool.begin().await.context("failed to begin transaction")?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("failed to clear user roles")?;

        if !role_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_id)
                SELECT $1, UNNEST($2::UUID[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(role_ids)
            .execute(&mut *tx)
            .await
            .context("failed to assign user roles")?;
        }

        tx.commit().await.context("failed to commit user roles")?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_roles() {
        assert!(well_known::is_builtin(well_known::ADMIN_ROLE_ID));
        assert!(well_known::is_builtin(well_known::GUEST_ROLE_ID));
        assert!(!well_known::is_builtin(Uuid::now_v7()));
    }

    #[test]
    fn test_update_role_defaults() {
        let input: UpdateRole =
            serde_json::from_str(r#"{"name": "editor", "label": "Editor"}"#).unwrap();
        assert!(!input.is_disable);
        assert!(input.resource_ids.is_empty());
        assert!(input.menu_ids.is_empty());
    }

    #[test]
    fn test_role_option_serializes_value() {
        let option = RoleOption {
            id: well_known::GUEST_ROLE_ID,
            name: "guest".to_string(),
        };
        let json = serde_json::to_value(&option).unwrap();
        assert_eq!(json["value"], well_known::GUEST_ROLE_ID.to_string());
        assert_eq!(json["name"], "guest");
    }
}
