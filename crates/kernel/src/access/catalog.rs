//! Resource catalog: the read side of the role → resource mapping.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{AccessError, Endpoint};
use crate::models::Resource;

/// Read-only view of registered resources and role grants.
#[async_trait]
pub trait ResourceCatalog: Send + Sync {
    /// Endpoints granted to a role. Unknown roles grant nothing.
    async fn granted_endpoints(&self, role_id: Uuid) -> Result<HashSet<Endpoint>, AccessError>;

    /// The resource registered for an exact (url, method) pair.
    async fn find_resource(&self, url: &str, method: &str)
    -> Result<Option<Resource>, AccessError>;
}

/// Catalog backed by the `resources` and `role_resources` tables.
#[derive(Clone)]
pub struct PgResourceCatalog {
    pool: PgPool,
}

impl PgResourceCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResourceCatalog for PgResourceCatalog {
    async fn granted_endpoints(&self, role_id: Uuid) -> Result<HashSet<Endpoint>, AccessError> {
        Resource::endpoints_for_role(&self.pool, role_id)
            .await
            .map_err(AccessError::CatalogUnavailable)
    }

    async fn find_resource(
        &self,
        url: &str,
        method: &str,
    ) -> Result<Option<Resource>, AccessError> {
        Resource::find_by_endpoint(&self.pool, url, method)
            .await
            .map_err(AccessError::CatalogUnavailable)
    }
}
