//! User (principal) model and CRUD operations.

use anyhow::{Context, Result};
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Login type for accounts created with a username and password.
pub const LOGIN_TYPE_PASSWORD: i16 = 1;

/// Default avatar for new accounts.
const DEFAULT_AVATAR: &str = "/static/avatar/default.png";

/// User record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub pass: String,
    pub login_type: i16,
    pub ip_address: String,
    pub last_login: Option<DateTime<Utc>>,
    pub is_disable: bool,
    pub is_super: bool,
    pub nickname: String,
    pub email: String,
    pub avatar: String,
    pub intro: String,
    pub website: String,
    pub created: DateTime<Utc>,
    pub changed: DateTime<Utc>,
}

/// Input for creating a new user.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub nickname: Option<String>,
    pub is_super: bool,
}

/// Profile fields a user may edit on their own account.
#[derive(Debug, Deserialize)]
pub struct UpdateProfile {
    pub nickname: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub email: String,
}

/// Filters for the paginated admin user list.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct UserFilter {
    pub username: Option<String>,
    pub nickname: Option<String>,
    pub login_type: Option<i16>,
}

impl UserFilter {
    fn username_pattern(&self) -> Option<String> {
        like_pattern(self.username.as_deref())
    }

    fn nickname_pattern(&self) -> Option<String> {
        like_pattern(self.nickname.as_deref())
    }
}

/// Build a `%keyword%` pattern, ignoring blank keywords.
pub(crate) fn like_pattern(keyword: Option<&str>) -> Option<String> {
    keyword
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| format!("%{k}%"))
}

impl User {
    /// Check if this user may log in.
    pub fn is_active(&self) -> bool {
        !self.is_disable
    }

    /// Find a user by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch user by id")?;

        Ok(user)
    }

    /// Find a user by username.
    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(pool)
            .await
            .context("failed to fetch user by username")?;

        Ok(user)
    }

    /// Create a new user.
    ///
    /// The nickname defaults to the username when not given.
    pub async fn create(pool: &PgPool, input: CreateUser) -> Result<Self> {
        let id = Uuid::now_v7();
        let pass = hash_password(&input.password)?;
        let nickname = input
            .nickname
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| input.username.clone());

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, pass, login_type, is_super, nickname, avatar)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.username)
        .bind(&pass)
        .bind(LOGIN_TYPE_PASSWORD)
        .bind(input.is_super)
        .bind(&nickname)
        .bind(DEFAULT_AVATAR)
        .fetch_one(pool)
        .await
        .context("failed to create user")?;

        Ok(user)
    }

    /// Update the profile fields of a user.
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        input: &UpdateProfile,
    ) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET nickname = $1, avatar = $2, intro = $3, website = $4, email = $5, changed = NOW()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(&input.nickname)
        .bind(&input.avatar)
        .bind(&input.intro)
        .bind(&input.website)
        .bind(&input.email)
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to update user profile")?;

        Ok(user)
    }

    /// Update only the nickname of a user.
    pub async fn update_nickname(pool: &PgPool, id: Uuid, nickname: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET nickname = $1, changed = NOW() WHERE id = $2")
            .bind(nickname)
            .bind(id)
            .execute(pool)
            .await
            .context("failed to update nickname")?;

        Ok(result.rows_affected() > 0)
    }

    /// Update the user's password.
    pub async fn update_password(pool: &PgPool, id: Uuid, new_password: &str) -> Result<bool> {
        let pass = hash_password(new_password)?;

        let result = sqlx::query("UPDATE users SET pass = $1, changed = NOW() WHERE id = $2")
            .bind(&pass)
            .bind(id)
            .execute(pool)
            .await
            .context("failed to update password")?;

        Ok(result.rows_affected() > 0)
    }

    /// Soft-disable or re-enable a user.
    pub async fn set_disabled(pool: &PgPool, id: Uuid, disabled: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET is_disable = $1, changed = NOW() WHERE id = $2")
            .bind(disabled)
            .bind(id)
            .execute(pool)
            .await
            .context("failed to update user disabled flag")?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a successful login.
    pub async fn record_login(pool: &PgPool, id: Uuid, ip_address: &str) -> Result<()> {
        sqlx::query("UPDATE users SET ip_address = $1, last_login = NOW() WHERE id = $2")
            .bind(ip_address)
            .bind(id)
            .execute(pool)
            .await
            .context("failed to record login")?;

        Ok(())
    }

    /// List users with filters and pagination, most recently created first.
    pub async fn list_paginated(
        pool: &PgPool,
        filter: &UserFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::TEXT IS NULL OR username ILIKE $1)
              AND ($2::TEXT IS NULL OR nickname ILIKE $2)
              AND ($3::SMALLINT IS NULL OR login_type = $3)
            ORDER BY created DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.username_pattern())
        .bind(filter.nickname_pattern())
        .bind(filter.login_type)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .context("failed to list users")?;

        Ok(users)
    }

    /// Count users matching the filters.
    pub async fn count(pool: &PgPool, filter: &UserFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::TEXT IS NULL OR username ILIKE $1)
              AND ($2::TEXT IS NULL OR nickname ILIKE $2)
              AND ($3::SMALLINT IS NULL OR login_type = $3)
            "#,
        )
        .bind(filter.username_pattern())
        .bind(filter.nickname_pattern())
        .bind(filter.login_type)
        .fetch_one(pool)
        .await
        .context("failed to count users")?;

        Ok(count)
    }

    /// Verify a password against this user's hash.
    pub fn verify_password(&self, password: &str) -> bool {
        if self.pass.is_empty() {
            return false;
        }

        let Ok(parsed_hash) = PasswordHash::new(&self.pass) else {
            return false;
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

/// Hash a password using Argon2id.
pub(crate) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn user_with_pass(pass: String) -> User {
        let now = Utc::now();
        User {
            id: Uuid::now_v7(),
            username: "writer".to_string(),
            pass,
            login_type: LOGIN_TYPE_PASSWORD,
            ip_address: String::new(),
            last_login: None,
            is_disable: false,
            is_super: false,
            nickname: "writer".to_string(),
            email: String::new(),
            avatar: String::new(),
            intro: String::new(),
            website: String::new(),
            created: now,
            changed: now,
        }
    }

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));

        let user = user_with_pass(hash);
        assert!(user.verify_password("correct horse"));
        assert!(!user.verify_password("battery staple"));
    }

    #[test]
    fn test_empty_hash_never_verifies() {
        let user = user_with_pass(String::new());
        assert!(!user.verify_password(""));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = user_with_pass("secret-hash".to_string());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("pass").is_none());
        assert_eq!(json["username"], "writer");
    }

    #[test]
    fn test_like_pattern_ignores_blank() {
        assert_eq!(like_pattern(None), None);
        assert_eq!(like_pattern(Some("  ")), None);
        assert_eq!(like_pattern(Some("ann")), Some("%ann%".to_string()));
    }
}
