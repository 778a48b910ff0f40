//! Admin navigation menus.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::user::like_pattern;
use crate::access::TreeNode;

/// Menu record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Menu {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub path: String,
    pub component: String,
    pub icon: String,
    pub order_num: i16,
    pub redirect: String,
    pub is_catalogue: bool,
    pub is_hidden: bool,
    pub keep_alive: bool,
    pub is_external: bool,
    pub external_link: String,
    pub created: DateTime<Utc>,
    pub changed: DateTime<Utc>,
}

impl TreeNode for Menu {
    type Id = Uuid;

    fn node_id(&self) -> Uuid {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }
}

/// Input for creating or updating a menu.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveMenu {
    pub id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub order_num: i16,
    #[serde(default)]
    pub redirect: String,
    #[serde(default)]
    pub is_catalogue: bool,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub keep_alive: bool,
    #[serde(default)]
    pub is_external: bool,
    #[serde(default)]
    pub external_link: String,
}

impl Menu {
    /// Tree ordering key.
    pub fn order_key(&self) -> i16 {
        self.order_num
    }

    /// Find a menu by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let menu = sqlx::query_as::<_, Menu>("SELECT * FROM menus WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch menu by id")?;

        Ok(menu)
    }

    /// Check whether another menu already uses the (name, path) pair.
    pub async fn path_taken(
        pool: &PgPool,
        name: &str,
        path: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM menus
                WHERE name = $1 AND path = $2 AND ($3::UUID IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(name)
        .bind(path)
        .bind(exclude)
        .fetch_one(pool)
        .await
        .context("failed to check menu uniqueness")?;

        Ok(exists)
    }

    /// List menus whose name matches a keyword.
    pub async fn list(pool: &PgPool, keyword: Option<&str>) -> Result<Vec<Self>> {
        let menus = sqlx::query_as::<_, Menu>(
            r#"
            SELECT * FROM menus
            WHERE ($1::TEXT IS NULL OR name ILIKE $1)
            ORDER BY created
            "#,
        )
        .bind(like_pattern(keyword))
        .fetch_all(pool)
        .await
        .context("failed to list menus")?;

        Ok(menus)
    }

    /// List every menu.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>> {
        Self::list(pool, None).await
    }

    /// Menus granted to any enabled role of a user, without duplicates.
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>> {
        let menus = sqlx::query_as::<_, Menu>(
            r#"
            SELECT DISTINCT m.* FROM menus m
            JOIN role_menus rm ON m.id = rm.menu_id
            JOIN roles r ON r.id = rm.role_id
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1 AND r.is_disable = FALSE
            ORDER BY m.created
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("failed to list user menus")?;

        Ok(menus)
    }

    /// Create a menu.
    pub async fn create(pool: &PgPool, input: &SaveMenu) -> Result<Self> {
        let id = Uuid::now_v7();

        let menu = sqlx::query_as::<_, Menu>(
            r#"
            INSERT INTO menus (
                id, parent_id, name, path, component, icon, order_num, redirect,
                is_catalogue, is_hidden, keep_alive, is_external, external_link
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.parent_id)
        .bind(&input.name)
        .bind(&input.path)
        .bind(&input.component)
        .bind(&input.icon)
        .bind(input.order_num)
        .bind(&input.redirect)
        .bind(input.is_catalogue)
        .bind(input.is_hidden)
        .bind(input.keep_alive)
        .bind(input.is_external)
        .bind(&input.external_link)
        .fetch_one(pool)
        .await
        .context("failed to create menu")?;

        Ok(menu)
    }

    /// Update a menu.
    pub async fn update(pool: &PgPool, id: Uuid, input: &SaveMenu) -> Result<Option<Self>> {
        let menu = sqlx::query_as::<_, Menu>(
            r#"
            UPDATE menus SET
                parent_id = $1, name = $2, path = $3, component = $4, icon = $5,
                order_num = $6, redirect = $7, is_catalogue = $8, is_hidden = $9,
                keep_alive = $10, is_external = $11, external_link = $12, changed = NOW()
            WHERE id = $13
            RETURNING *
            "#,
        )
        .bind(input.parent_id)
        .bind(&input.name)
        .bind(&input.path)
        .bind(&input.component)
        .bind(&input.icon)
        .bind(input.order_num)
        .bind(&input.redirect)
        .bind(input.is_catalogue)
        .bind(input.is_hidden)
        .bind(input.keep_alive)
        .bind(input.is_external)
        .bind(&input.external_link)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to update menu")?;

        Ok(menu)
    }

    /// Check whether any menu names this one as parent.
    pub async fn has_children(pool: &PgPool, id: Uuid) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM menus WHERE parent_id = $1)")
                .bind(id)
                .fetch_one(pool)
                .await
                .context("failed to check menu children")?;

        Ok(exists)
    }

    /// Check whether any role is granted this menu.
    pub async fn is_in_use(pool: &PgPool, id: Uuid) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM role_menus WHERE menu_id = $1)")
                .bind(id)
                .fetch_one(pool)
                .await
                .context("failed to check menu grants")?;

        Ok(exists)
    }

    /// Delete a menu.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete menu")?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_save_menu_defaults() {
        let input: SaveMenu =
            serde_json::from_str(r#"{"name": "Articles", "path": "/article"}"#).unwrap();
        assert!(input.id.is_none());
        assert_eq!(input.order_num, 0);
        assert!(!input.is_hidden);
        assert!(input.component.is_empty());
    }
}
