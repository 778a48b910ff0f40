//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result};

/// Minimum length of the JWT signing secret in bytes.
const MIN_JWT_SECRET_LEN: usize = 32;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Redis connection URL.
    pub redis_url: String,

    /// HMAC-SHA256 secret for access tokens.
    pub jwt_secret: String,

    /// Issuer claim written to and required on tokens (default: "quire").
    pub jwt_issuer: String,

    /// Access token lifetime in hours (default: 24).
    pub jwt_expire_hours: i64,

    /// How long an online entry lives without activity (default: 600).
    pub online_ttl_secs: u64,

    /// How long a forced-offline flag blocks a principal (default: 3600).
    pub offline_ttl_secs: u64,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,

    /// Cookie SameSite policy: "strict", "lax", or "none" (default: "strict").
    pub cookie_same_site: String,

    /// Whether the session cookie is marked Secure (default: true).
    pub cookie_secure: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let jwt_secret =
            env::var("JWT_SECRET").context("JWT_SECRET environment variable is required")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!("JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} bytes");
        }

        let jwt_issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "quire".to_string());

        let jwt_expire_hours = env::var("JWT_EXPIRE_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .context("JWT_EXPIRE_HOURS must be a valid integer")?;

        let online_ttl_secs = env::var("ONLINE_TTL_SECS")
            .unwrap_or_else(|_| "600".to_string())
            .parse()
            .context("ONLINE_TTL_SECS must be a valid u64")?;

        let offline_ttl_secs = env::var("OFFLINE_TTL_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .context("OFFLINE_TTL_SECS must be a valid u64")?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        let cookie_same_site = env::var("COOKIE_SAME_SITE")
            .unwrap_or_else(|_| "strict".to_string())
            .to_lowercase();

        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "no"))
            .unwrap_or(true);

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            redis_url,
            jwt_secret,
            jwt_issuer,
            jwt_expire_hours,
            online_ttl_secs,
            offline_ttl_secs,
            cors_allowed_origins,
            cookie_same_site,
            cookie_secure,
        })
    }

    /// Access token lifetime in seconds.
    pub fn jwt_lifetime_secs(&self) -> i64 {
        self.jwt_expire_hours * 3600
    }
}
