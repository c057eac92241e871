use std::time::Duration;

use crate::auth::confirmation::ConfirmationConfig;
use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development except
/// `JWT_SECRET`, which must always be provided.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Time allowed for background jobs to stop after the server drains (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Upper bound on any single store call (default: `5`).
    pub store_timeout_secs: u64,
    /// How often expired revocation entries are reaped (default: `3600`).
    pub revocation_reap_interval_secs: u64,
    /// Public base URL used to build confirmation links (default: `http://localhost:3000`).
    pub app_base_url: String,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Confirmation code lifetime, grace period and purge schedule.
    pub confirmation: ConfirmationConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default                    |
    /// |---------------------------------|----------------------------|
    /// | `HOST`                          | `0.0.0.0`                  |
    /// | `PORT`                          | `3000`                     |
    /// | `CORS_ORIGINS`                  | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`          | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`         | `30`                       |
    /// | `STORE_TIMEOUT_SECS`            | `5`                        |
    /// | `REVOCATION_REAP_INTERVAL_SECS` | `3600`                     |
    /// | `APP_BASE_URL`                  | `http://localhost:3000`    |
    ///
    /// JWT and confirmation settings are read by [`JwtConfig::from_env`] and
    /// [`ConfirmationConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = env_u64("REQUEST_TIMEOUT_SECS", 30);
        let shutdown_timeout_secs = env_u64("SHUTDOWN_TIMEOUT_SECS", 30);
        let store_timeout_secs = env_u64("STORE_TIMEOUT_SECS", 5);
        let revocation_reap_interval_secs = env_u64("REVOCATION_REAP_INTERVAL_SECS", 3600);

        let app_base_url = std::env::var("APP_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        let config = Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            store_timeout_secs,
            revocation_reap_interval_secs,
            app_base_url,
            jwt: JwtConfig::from_env(),
            confirmation: ConfirmationConfig::from_env(),
        };
        config
            .validate()
            .unwrap_or_else(|msg| panic!("Invalid server configuration: {msg}"));
        config
    }

    /// Reject intervals and timeouts that cannot drive a timer.
    pub fn validate(&self) -> Result<(), String> {
        let positive = [
            ("REQUEST_TIMEOUT_SECS", self.request_timeout_secs),
            ("STORE_TIMEOUT_SECS", self.store_timeout_secs),
            ("REVOCATION_REAP_INTERVAL_SECS", self.revocation_reap_interval_secs),
        ];
        match positive.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(format!("{name} must be greater than 0")),
            None => Ok(()),
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    /// Link sent by email for redeeming confirmation code `code`.
    pub fn confirmation_url(&self, code: &uuid::Uuid) -> String {
        format!("{}/api/v1/email/validate/{code}", self.app_base_url)
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(v) => v
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid u64")),
        Err(_) => default,
    }
}
