//! Online presence tracking.
//!
//! Each authenticated admin request refreshes a short-lived online entry.
//! An operator can force a principal offline, which blocks further admin
//! requests until the flag expires or the principal logs in again. The
//! production store keeps both in Redis.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use redis::Client as RedisClient;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Principal;
use crate::models::User;

/// Snapshot of an online principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineUser {
    pub id: Uuid,
    pub username: String,
    pub nickname: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub ip_address: String,
    pub last_login: DateTime<Utc>,
}

impl OnlineUser {
    /// Snapshot taken at login.
    pub fn from_user(user: &User, ip_address: &str) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            nickname: user.nickname.clone(),
            avatar: user.avatar.clone(),
            ip_address: ip_address.to_string(),
            last_login: Utc::now(),
        }
    }

    /// Snapshot for a principal seen without a login record.
    pub fn from_principal(principal: &Principal) -> Self {
        Self {
            id: principal.id,
            username: principal.username.clone(),
            nickname: principal.nickname.clone(),
            avatar: String::new(),
            ip_address: String::new(),
            last_login: Utc::now(),
        }
    }
}

/// Online entries and forced-offline flags.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Store an online snapshot.
    async fn mark_online(&self, user: &OnlineUser) -> Result<()>;

    /// Extend the online window for a principal, creating the entry if absent.
    async fn refresh(&self, principal: &Principal) -> Result<()>;

    /// Check whether a principal has been forced offline.
    async fn is_forced_offline(&self, id: Uuid) -> Result<bool>;

    /// Remove a principal's online entry and flag it offline.
    async fn force_offline(&self, id: Uuid) -> Result<()>;

    /// Clear the offline flag (on login).
    async fn clear_offline(&self, id: Uuid) -> Result<()>;

    /// Remove the online entry (on logout).
    async fn remove_online(&self, id: Uuid) -> Result<()>;

    /// List online principals, most recent login first.
    async fn list_online(&self, keyword: Option<&str>) -> Result<Vec<OnlineUser>>;
}

/// Presence kept in Redis with expiring keys.
#[derive(Clone)]
pub struct RedisPresence {
    redis: RedisClient,
    online_ttl_secs: u64,
    offline_ttl_secs: u64,
}

impl RedisPresence {
    pub fn new(redis: RedisClient, online_ttl_secs: u64, offline_ttl_secs: u64) -> Self {
        Self {
            redis,
            online_ttl_secs,
            offline_ttl_secs,
        }
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.redis
            .get_multiplexed_async_connection()
            .await
            .context("failed to get Redis connection")
    }
}

#[async_trait]
impl PresenceStore for RedisPresence {
    async fn mark_online(&self, user: &OnlineUser) -> Result<()> {
        let payload = serde_json::to_string(user).context("failed to encode online user")?;
        let mut conn = self.conn().await?;

        conn.set_ex::<_, _, ()>(online_key(user.id), payload, self.online_ttl_secs)
            .await
            .context("failed to set online entry")?;

        Ok(())
    }

    async fn refresh(&self, principal: &Principal) -> Result<()> {
        let mut conn = self.conn().await?;

        let extended: bool = conn
            .expire(online_key(principal.id), self.online_ttl_secs as i64)
            .await
            .context("failed to refresh online entry")?;

        if !extended {
            drop(conn);
            self.mark_online(&OnlineUser::from_principal(principal))
                .await?;
        }

        Ok(())
    }

    async fn is_forced_offline(&self, id: Uuid) -> Result<bool> {
        let mut conn = self.conn().await?;

        let flagged: bool = conn
            .exists(offline_key(id))
            .await
            .context("failed to check offline flag")?;

        Ok(flagged)
    }

    async fn force_offline(&self, id: Uuid) -> Result<()> {
        let mut conn = self.conn().await?;

        conn.del::<_, ()>(online_key(id))
            .await
            .context("failed to remove online entry")?;
        conn.set_ex::<_, _, ()>(offline_key(id), "1", self.offline_ttl_secs)
            .await
            .context("failed to set offline flag")?;

        Ok(())
    }

    async fn clear_offline(&self, id: Uuid) -> Result<()> {
        let mut conn = self.conn().await?;

        conn.del::<_, ()>(offline_key(id))
            .await
            .context("failed to clear offline flag")?;

        Ok(())
    }

    async fn remove_online(&self, id: Uuid) -> Result<()> {
        let mut conn = self.conn().await?;

        conn.del::<_, ()>(online_key(id))
            .await
            .context("failed to remove online entry")?;

        Ok(())
    }

    async fn list_online(&self, keyword: Option<&str>) -> Result<Vec<OnlineUser>> {
        let mut conn = self.conn().await?;

        let keys: Vec<String> = {
            let mut iter = conn
                .scan_match::<_, String>(ONLINE_PATTERN)
                .await
                .context("failed to scan online entries")?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };

        let mut users = Vec::with_capacity(keys.len());
        for key in keys {
            let payload: Option<String> = conn
                .get(&key)
                .await
                .context("failed to read online entry")?;
            // Entries can expire between SCAN and GET.
            let Some(payload) = payload else { continue };
            match serde_json::from_str::<OnlineUser>(&payload) {
                Ok(user) => users.push(user),
                Err(e) => tracing::warn!(key = %key, error = %e, "skipping bad online entry"),
            }
        }

        Ok(filter_online(users, keyword))
    }
}

const ONLINE_PATTERN: &str = "online_user:*";

fn online_key(id: Uuid) -> String {
    format!("online_user:{id}")
}

fn offline_key(id: Uuid) -> String {
    format!("offline_user:{id}")
}

/// Keep users whose username or nickname contains `keyword`, newest login first.
pub fn filter_online(mut users: Vec<OnlineUser>, keyword: Option<&str>) -> Vec<OnlineUser> {
    if let Some(keyword) = keyword.map(str::trim).filter(|k| !k.is_empty()) {
        users.retain(|u| u.username.contains(keyword) || u.nickname.contains(keyword));
    }
    users.sort_by(|a, b| b.last_login.cmp(&a.last_login));
    users
}
