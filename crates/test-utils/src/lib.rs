//! Quire test utilities.
//!
//! In-memory stand-ins for the resource catalog, principal store and
//! presence store, plus fixture builders for principals, resources and menus. Integration tests
//! use them to drive the real router without PostgreSQL.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use quire_kernel::access::{AccessError, Endpoint, ResourceCatalog};
use quire_kernel::auth::{Principal, PrincipalStore, RoleRef};
use quire_kernel::models::{Menu, Resource};
use quire_kernel::presence::{OnlineUser, PresenceStore, filter_online};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// -------------------------------------------------------------------------
// Principals
// -------------------------------------------------------------------------

/// Start building a principal.
pub fn test_principal(username: &str) -> TestPrincipal {
    TestPrincipal {
        principal: Principal {
            id: Uuid::now_v7(),
            username: username.to_string(),
            nickname: username.to_string(),
            superuser: false,
            disabled: false,
            roles: Vec::new(),
        },
    }
}

/// Principal builder.
#[derive(Debug, Clone)]
pub struct TestPrincipal {
    principal: Principal,
}

impl TestPrincipal {
    /// Give the principal a role.
    pub fn with_role(mut self, id: Uuid, name: &str) -> Self {
        self.principal.roles.push(RoleRef {
            id,
            name: name.to_string(),
        });
        self
    }

    /// Mark as superuser.
    pub fn superuser(mut self) -> Self {
        self.principal.superuser = true;
        self
    }

    /// Mark as disabled.
    pub fn disabled(mut self) -> Self {
        self.principal.disabled = true;
        self
    }

    pub fn build(self) -> Principal {
        self.principal
    }
}

/// Principal store kept in memory.
#[derive(Default)]
pub struct MemoryPrincipalStore {
    principals: Mutex<HashMap<Uuid, Principal>>,
}

impl MemoryPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, principal: Principal) {
        lock(&self.principals).insert(principal.id, principal);
    }

    pub fn remove(&self, id: Uuid) {
        lock(&self.principals).remove(&id);
    }
}

#[async_trait]
impl PrincipalStore for MemoryPrincipalStore {
    async fn load_principal(&self, id: Uuid) -> anyhow::Result<Option<Principal>> {
        Ok(lock(&self.principals).get(&id).cloned())
    }
}

// -------------------------------------------------------------------------
// Catalog
// -------------------------------------------------------------------------

/// Resource catalog kept in memory.
///
/// `set_failing(true)` makes every lookup fail as if the database were down.
#[derive(Default)]
pub struct MemoryCatalog {
    resources: Mutex<Vec<Resource>>,
    grants: Mutex<HashMap<Uuid, HashSet<Endpoint>>>,
    failing: AtomicBool,
    grant_lookups: AtomicUsize,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a protected resource.
    pub fn register(&self, url: &str, method: &str) -> Resource {
        let resource = test_resource(url, method);
        lock(&self.resources).push(resource.clone());
        resource
    }

    /// Register a resource reachable without authentication.
    pub fn register_anonymous(&self, url: &str, method: &str) -> Resource {
        let mut resource = test_resource(url, method);
        resource.is_anonymous = true;
        lock(&self.resources).push(resource.clone());
        resource
    }

    /// Grant `(url, method)` to a role.
    pub fn grant(&self, role_id: Uuid, url: &str, method: &str) {
        lock(&self.grants)
            .entry(role_id)
            .or_default()
            .insert(Endpoint::new(url, method));
    }

    /// Remove every grant of a role.
    pub fn revoke_all(&self, role_id: Uuid) {
        lock(&self.grants).remove(&role_id);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of grant lookups served so far.
    pub fn grant_lookups(&self) -> usize {
        self.grant_lookups.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), AccessError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AccessError::CatalogUnavailable(anyhow::anyhow!(
                "catalog offline"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceCatalog for MemoryCatalog {
    async fn granted_endpoints(&self, role_id: Uuid) -> Result<HashSet<Endpoint>, AccessError> {
        self.grant_lookups.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(lock(&self.grants).get(&role_id).cloned().unwrap_or_default())
    }

    async fn find_resource(
        &self,
        url: &str,
        method: &str,
    ) -> Result<Option<Resource>, AccessError> {
        self.check()?;
        Ok(lock(&self.resources)
            .iter()
            .find(|r| r.url == url && r.method == method)
            .cloned())
    }
}

// -------------------------------------------------------------------------
// Presence
// -------------------------------------------------------------------------

/// Presence store kept in memory. Entries never expire.
#[derive(Default)]
pub struct MemoryPresence {
    online: Mutex<HashMap<Uuid, OnlineUser>>,
    offline: Mutex<HashSet<Uuid>>,
}

impl MemoryPresence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_online(&self, id: Uuid) -> bool {
        lock(&self.online).contains_key(&id)
    }
}

#[async_trait]
impl PresenceStore for MemoryPresence {
    async fn mark_online(&self, user: &OnlineUser) -> anyhow::Result<()> {
        lock(&self.online).insert(user.id, user.clone());
        Ok(())
    }

    async fn refresh(&self, principal: &Principal) -> anyhow::Result<()> {
        lock(&self.online)
            .entry(principal.id)
            .or_insert_with(|| OnlineUser::from_principal(principal));
        Ok(())
    }

    async fn is_forced_offline(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(lock(&self.offline).contains(&id))
    }

    async fn force_offline(&self, id: Uuid) -> anyhow::Result<()> {
        lock(&self.online).remove(&id);
        lock(&self.offline).insert(id);
        Ok(())
    }

    async fn clear_offline(&self, id: Uuid) -> anyhow::Result<()> {
        lock(&self.offline).remove(&id);
        Ok(())
    }

    async fn remove_online(&self, id: Uuid) -> anyhow::Result<()> {
        lock(&self.online).remove(&id);
        Ok(())
    }

    async fn list_online(&self, keyword: Option<&str>) -> anyhow::Result<Vec<OnlineUser>> {
        let users = lock(&self.online).values().cloned().collect();
        Ok(filter_online(users, keyword))
    }
}

// -------------------------------------------------------------------------
// Records
// -------------------------------------------------------------------------

/// A top-level resource guarding `(url, method)`.
pub fn test_resource(url: &str, method: &str) -> Resource {
    let now = Utc::now();
    Resource {
        id: Uuid::now_v7(),
        parent_id: None,
        name: format!("{method} {url}"),
        url: url.to_string(),
        method: method.to_string(),
        is_anonymous: false,
        created: now,
        changed: now,
    }
}

/// A top-level menu with an order key.
pub fn test_menu(name: &str, order_num: i16) -> Menu {
    let now = Utc::now();
    Menu {
        id: Uuid::now_v7(),
        parent_id: None,
        name: name.to_string(),
        path: format!("/{}", name.to_lowercase()),
        component: String::new(),
        icon: String::new(),
        order_num,
        redirect: String::new(),
        is_catalogue: false,
        is_hidden: false,
        keep_alive: false,
        is_external: false,
        external_link: String::new(),
        created: now,
        changed: now,
    }
}

/// A menu placed under `parent`.
pub fn test_child_menu(parent: &Menu, name: &str, order_num: i16) -> Menu {
    let mut menu = test_menu(name, order_num);
    menu.parent_id = Some(parent.id);
    menu.path = format!("{}/{}", parent.path, name.to_lowercase());
    menu
}

/// A resource placed under `parent`, created `offset_secs` after it.
pub fn test_child_resource(parent: &Resource, url: &str, method: &str, offset_secs: i64) -> Resource {
    let mut resource = test_resource(url, method);
    resource.parent_id = Some(parent.id);
    resource.created = parent.created + Duration::seconds(offset_secs);
    resource.changed = resource.created;
    resource
}
