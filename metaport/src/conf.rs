use serde::{Deserialize, Serialize};

use crate::deferred::DrainMode;
use crate::errors::{MigrateError, MigrateResult};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MigrateConf {
    /// Database holding the legacy metadata tables.
    pub legacy_database: String,

    /// Database receiving the migrated entities.
    pub target_database: String,

    /// Actions of one deferred queue allowed in flight; 1 drains sequentially.
    pub drain_concurrency: usize,

    pub max_connections: u32,

    pub log_init: bool,
}

impl Default for MigrateConf {
    fn default() -> Self {
        Self {
            legacy_database: "".to_string(),
            target_database: "".to_string(),
            drain_concurrency: 1,
            max_connections: 5,
            log_init: true,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl MigrateConf {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        #[cfg(test)]
        {
            dotenvy::from_filename_override(".env.test").ok();
        }

        #[cfg(all(debug_assertions, not(test)))]
        {
            dotenvy::from_filename_override(".env.dev").ok();
        }

        #[cfg(not(any(debug_assertions, test)))]
        {
            dotenvy::from_filename_override(".env.prod").ok();
        }

        let defaults = Self::default();
        Self {
            legacy_database: std::env::var("LEGACY_DATABASE_URL").unwrap_or_default(),
            target_database: std::env::var("TARGET_DATABASE_URL").unwrap_or_default(),
            drain_concurrency: env_or("METAPORT_DRAIN_CONCURRENCY", defaults.drain_concurrency),
            max_connections: env_or("METAPORT_MAX_CONNECTIONS", defaults.max_connections),
            log_init: env_or("METAPORT_LOG_INIT", defaults.log_init),
        }
    }

    pub fn drain_mode(&self) -> DrainMode {
        DrainMode::from_concurrency(self.drain_concurrency)
    }

    pub fn legacy_url(&self) -> MigrateResult<&str> {
        required("LEGACY_DATABASE_URL", &self.legacy_database)
    }

    pub fn target_url(&self) -> MigrateResult<&str> {
        required("TARGET_DATABASE_URL", &self.target_database)
    }
}

fn required<'a>(key: &str, value: &'a str) -> MigrateResult<&'a str> {
    if value.trim().is_empty() {
        return Err(MigrateError::ConfigError(format!("{key} is not set")));
    }
    Ok(value)
}
