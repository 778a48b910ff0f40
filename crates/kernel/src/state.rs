//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::access::{AccessEvaluator, PgResourceCatalog, ResourceCatalog};
use crate::auth::{PgPrincipalStore, PrincipalResolver, PrincipalStore, TokenService};
use crate::config::Config;
use crate::db;
use crate::engagement::EngagementService;
use crate::presence::{PresenceStore, RedisPresence};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PostgreSQL connection pool.
    db: PgPool,

    /// Redis client.
    redis: RedisClient,

    /// Bearer credential to principal resolution.
    principals: PrincipalResolver,

    /// Access control evaluator over the resource catalog.
    access: AccessEvaluator,

    /// Online / forced-offline tracking.
    presence: Arc<dyn PresenceStore>,

    /// Like and view counters.
    engagement: EngagementService,
}

impl AppState {
    /// Connect to PostgreSQL and Redis, apply migrations, and wire services.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        db::run_migrations(&db)
            .await
            .context("failed to run migrations")?;

        let redis = RedisClient::open(config.redis_url.as_str())
            .context("failed to create Redis client")?;

        let mut conn = redis
            .get_multiplexed_async_connection()
            .await
            .context("failed to connect to Redis")?;

        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .context("Redis PING failed")?;

        let tokens = TokenService::new(
            config.jwt_secret.as_bytes(),
            config.jwt_issuer.clone(),
            config.jwt_lifetime_secs(),
        );
        let presence = RedisPresence::new(
            redis.clone(),
            config.online_ttl_secs,
            config.offline_ttl_secs,
        );

        Ok(Self::from_parts(
            db.clone(),
            redis,
            tokens,
            Arc::new(PgResourceCatalog::new(db.clone())),
            Arc::new(PgPrincipalStore::new(db)),
            Arc::new(presence),
        ))
    }

    /// Assemble state from already-built parts.
    ///
    /// Does no I/O, so integration tests can pass a lazy pool, an
    /// unconnected Redis client and in-memory stores.
    pub fn from_parts(
        db: PgPool,
        redis: RedisClient,
        tokens: TokenService,
        catalog: Arc<dyn ResourceCatalog>,
        principals: Arc<dyn PrincipalStore>,
        presence: Arc<dyn PresenceStore>,
    ) -> Self {
        let engagement = EngagementService::new(redis.clone());

        Self {
            inner: Arc::new(AppStateInner {
                db,
                redis,
                principals: PrincipalResolver::new(tokens, principals),
                access: AccessEvaluator::new(catalog),
                presence,
                engagement,
            }),
        }
    }

    /// Get the database pool.
    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    /// Get the Redis client.
    pub fn redis(&self) -> &RedisClient {
        &self.inner.redis
    }

    /// Get the token service.
    pub fn tokens(&self) -> &TokenService {
        self.inner.principals.tokens()
    }

    /// Get the principal resolver.
    pub fn principals(&self) -> &PrincipalResolver {
        &self.inner.principals
    }

    /// Get the access evaluator.
    pub fn access(&self) -> &AccessEvaluator {
        &self.inner.access
    }

    /// Get the resource catalog.
    pub fn catalog(&self) -> &Arc<dyn ResourceCatalog> {
        self.inner.access.catalog()
    }

    /// Get the presence store.
    pub fn presence(&self) -> &Arc<dyn PresenceStore> {
        &self.inner.presence
    }

    /// Get the engagement service.
    pub fn engagement(&self) -> &EngagementService {
        &self.inner.engagement
    }

    /// Check if PostgreSQL is healthy.
    pub async fn postgres_healthy(&self) -> bool {
        db::check_health(&self.inner.db).await
    }

    /// Check if Redis is healthy.
    pub async fn redis_healthy(&self) -> bool {
        let Ok(mut conn) = self.inner.redis.get_multiplexed_async_connection().await else {
            return false;
        };

        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok()
    }
}
