//! Quire blog kernel library.
//!
//! Exposes the kernel internals used by the `quire` binary and by the
//! integration tests.

pub mod access;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod engagement;
pub mod error;
pub mod middleware;
pub mod models;
pub mod presence;
pub mod routes;
pub mod session;
pub mod state;
