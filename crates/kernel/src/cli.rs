//! Operator commands that run without starting the server.

use anyhow::{Result, bail};
use sqlx::PgPool;

use crate::models::role::well_known;
use crate::models::user::CreateUser;
use crate::models::{Role, User};

/// Create a user from the command line.
///
/// Non-superusers are given the guest role.
pub async fn cmd_create_user(
    pool: &PgPool,
    username: &str,
    password: &str,
    superuser: bool,
) -> Result<User> {
    if username.trim().is_empty() {
        bail!("username must not be empty");
    }
    if !(4..=20).contains(&password.chars().count()) {
        bail!("password must be 4 to 20 characters");
    }
    if User::find_by_username(pool, username).await?.is_some() {
        bail!("user '{username}' already exists");
    }

    let user = User::create(
        pool,
        CreateUser {
            username: username.to_string(),
            password: password.to_string(),
            nickname: None,
            is_super: superuser,
        },
    )
    .await?;

    if !superuser {
        Role::assign_to_user(pool, user.id, well_known::GUEST_ROLE_ID).await?;
    }

    tracing::info!(user_id = %user.id, username = %user.username, superuser, "user created");
    Ok(user)
}
