//! HTTP middleware components.
//!
//! Request processing for the JSON API: bearer principal resolution, the
//! permission gate, and online presence tracking.

pub mod bearer_auth;
pub mod permission;
pub mod presence;

pub use bearer_auth::{AuthPrincipal, resolve_principal};
pub use permission::{catalog_url, check_permission};
pub use presence::listen_online;
