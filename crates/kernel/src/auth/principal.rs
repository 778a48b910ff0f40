//! Resolved principals and the store that loads them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Role, User};

/// Reference to a role held by a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: Uuid,
    pub name: String,
}

/// An authenticated caller.
///
/// Holds its own copy of the role set; changing it never touches stored
/// grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub nickname: String,
    pub superuser: bool,
    pub disabled: bool,
    pub roles: Vec<RoleRef>,
}

impl Principal {
    /// Build a principal from a user row and its roles.
    pub fn from_user(user: &User, roles: &[Role]) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            nickname: user.nickname.clone(),
            superuser: user.is_super,
            disabled: user.is_disable,
            roles: roles
                .iter()
                .map(|r| RoleRef {
                    id: r.id,
                    name: r.name.clone(),
                })
                .collect(),
        }
    }

    pub fn role_ids(&self) -> Vec<Uuid> {
        self.roles.iter().map(|r| r.id).collect()
    }
}

/// Loads principals by ID.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Load a principal, or `None` if the user does not exist.
    async fn load_principal(&self, id: Uuid) -> anyhow::Result<Option<Principal>>;
}

/// Store backed by the `users`, `user_roles` and `roles` tables.
///
/// Disabled roles are left out of the principal's role set.
#[derive(Clone)]
pub struct PgPrincipalStore {
    pool: PgPool,
}

impl PgPrincipalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrincipalStore for PgPrincipalStore {
    async fn load_principal(&self, id: Uuid) -> anyhow::Result<Option<Principal>> {
        let Some(user) = User::find_by_id(&self.pool, id).await? else {
            return Ok(None);
        };
        let roles = Role::get_user_roles(&self.pool, id).await?;

        Ok(Some(Principal::from_user(&user, &roles)))
    }
}
