//! Access control evaluator.

use std::sync::Arc;

use super::{AccessError, Decision, Endpoint, ResourceCatalog};
use crate::auth::Principal;

/// Decides whether a principal may call an endpoint.
///
/// The evaluator has no side effects: it does not log, cache or retry.
#[derive(Clone)]
pub struct AccessEvaluator {
    catalog: Arc<dyn ResourceCatalog>,
}

impl AccessEvaluator {
    pub fn new(catalog: Arc<dyn ResourceCatalog>) -> Self {
        Self { catalog }
    }

    /// The catalog this evaluator reads grants from.
    pub fn catalog(&self) -> &Arc<dyn ResourceCatalog> {
        &self.catalog
    }

    /// Evaluate access for `principal` to `(url, method)`.
    ///
    /// - Superusers are allowed without a catalog lookup.
    /// - Otherwise the first role granting the exact pair allows.
    /// - A principal whose roles grant nothing matching is denied.
    pub async fn evaluate(
        &self,
        principal: &Principal,
        url: &str,
        method: &str,
    ) -> Result<Decision, AccessError> {
        if principal.superuser {
            return Ok(Decision::Allow);
        }

        let wanted = Endpoint::new(url, method);
        for role in &principal.roles {
            let granted = self.catalog.granted_endpoints(role.id).await?;
            if granted.contains(&wanted) {
                return Ok(Decision::Allow);
            }
        }

        Ok(Decision::Deny)
    }
}
