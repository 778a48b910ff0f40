//! Principal resolution from bearer credentials and session user ids.

pub mod principal;
pub mod token;

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

pub use principal::{PgPrincipalStore, Principal, PrincipalStore, RoleRef};
pub use token::{TokenClaims, TokenService, parse_bearer};

/// Why a credential did not resolve to a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthenticationError {
    #[error("missing credential")]
    Missing,

    #[error("malformed credential")]
    Malformed,

    #[error("credential expired")]
    Expired,

    #[error("unknown principal")]
    NotFound,

    #[error("principal disabled")]
    Disabled,
}

/// Failure of [`PrincipalResolver::resolve`].
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Unauthenticated(#[from] AuthenticationError),

    #[error("principal store unavailable")]
    Store(#[source] anyhow::Error),
}

/// Turns an `Authorization` header or a user id into a [`Principal`].
#[derive(Clone)]
pub struct PrincipalResolver {
    tokens: TokenService,
    store: Arc<dyn PrincipalStore>,
}

impl PrincipalResolver {
    pub fn new(tokens: TokenService, store: Arc<dyn PrincipalStore>) -> Self {
        Self { tokens, store }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn store(&self) -> &Arc<dyn PrincipalStore> {
        &self.store
    }

    /// Resolve a header value into an enabled principal.
    pub async fn resolve(&self, header: Option<&str>) -> Result<Principal, ResolveError> {
        let header = header.ok_or(AuthenticationError::Missing)?;
        let token = parse_bearer(header)?;
        let claims = self.tokens.verify(token)?;
        let user_id = claims.user_id()?;

        self.resolve_user(user_id).await
    }

    /// Load an enabled principal by user id.
    pub async fn resolve_user(&self, user_id: Uuid) -> Result<Principal, ResolveError> {
        let principal = self
            .store
            .load_principal(user_id)
            .await
            .map_err(ResolveError::Store)?
            .ok_or(AuthenticationError::NotFound)?;

        if principal.disabled {
            return Err(AuthenticationError::Disabled.into());
        }

        Ok(principal)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;

    struct MapStore(HashMap<Uuid, Principal>);

    #[async_trait]
    impl PrincipalStore for MapStore {
        async fn load_principal(&self, id: Uuid) -> anyhow::Result<Option<Principal>> {
            Ok(self.0.get(&id).cloned())
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl PrincipalStore for BrokenStore {
        async fn load_principal(&self, _id: Uuid) -> anyhow::Result<Option<Principal>> {
            anyhow::bail!("pool timed out")
        }
    }

    fn tokens() -> TokenService {
        TokenService::new(b"an-hmac-secret-of-at-least-32-bytes!", "quire", 3600)
    }

    fn principal(disabled: bool) -> Principal {
        Principal {
            id: Uuid::now_v7(),
            username: "ann".to_string(),
            nickname: "Ann".to_string(),
            superuser: false,
            disabled,
            roles: vec![RoleRef {
                id: Uuid::now_v7(),
                name: "editor".to_string(),
            }],
        }
    }

    fn resolver(principals: &[Principal]) -> PrincipalResolver {
        let map = principals.iter().map(|p| (p.id, p.clone())).collect();
        PrincipalResolver::new(tokens(), Arc::new(MapStore(map)))
    }

    fn header_for(id: Uuid) -> String {
        format!("Bearer {}", tokens().issue(id, vec![]).unwrap())
    }

    fn auth_err(result: Result<Principal, ResolveError>) -> AuthenticationError {
        match result {
            Err(ResolveError::Unauthenticated(e)) => e,
            other => panic!("expected authentication error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn resolves_known_principal() {
        let p = principal(false);
        let resolved = resolver(std::slice::from_ref(&p))
            .resolve(Some(&header_for(p.id)))
            .await
            .unwrap();
        assert_eq!(resolved, p);
    }

    #[tokio::test]
    async fn missing_header() {
        let result = resolver(&[]).resolve(None).await;
        assert_eq!(auth_err(result), AuthenticationError::Missing);
    }

    #[tokio::test]
    async fn malformed_header() {
        let result = resolver(&[]).resolve(Some("Basic dXNlcjpwYXNz")).await;
        assert_eq!(auth_err(result), AuthenticationError::Malformed);
    }

    #[tokio::test]
    async fn unknown_principal() {
        let result = resolver(&[]).resolve(Some(&header_for(Uuid::now_v7()))).await;
        assert_eq!(auth_err(result), AuthenticationError::NotFound);
    }

    #[tokio::test]
    async fn disabled_principal() {
        let p = principal(true);
        let result = resolver(std::slice::from_ref(&p))
            .resolve(Some(&header_for(p.id)))
            .await;
        assert_eq!(auth_err(result), AuthenticationError::Disabled);
    }

    #[tokio::test]
    async fn store_failure_is_not_authentication_error() {
        let r = PrincipalResolver::new(tokens(), Arc::new(BrokenStore));
        let result = r.resolve(Some(&header_for(Uuid::now_v7()))).await;
        assert!(matches!(result, Err(ResolveError::Store(_))));
    }

    #[tokio::test]
    async fn resolves_user_by_id() {
        let p = principal(false);
        let r = resolver(std::slice::from_ref(&p));
        assert_eq!(r.resolve_user(p.id).await.unwrap(), p);
    }

    #[tokio::test]
    async fn user_by_id_applies_same_checks() {
        let p = principal(true);
        let r = resolver(std::slice::from_ref(&p));
        assert_eq!(auth_err(r.resolve_user(p.id).await), AuthenticationError::Disabled);
        assert_eq!(
            auth_err(r.resolve_user(Uuid::now_v7()).await),
            AuthenticationError::NotFound
        );

        let broken = PrincipalResolver::new(tokens(), Arc::new(BrokenStore));
        assert!(matches!(
            broken.resolve_user(p.id).await,
            Err(ResolveError::Store(_))
        ));
    }
}
