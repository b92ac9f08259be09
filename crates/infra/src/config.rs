//! Storage configuration loaded from the environment.
//!
//! | variable                      | default           |
//! |-------------------------------|-------------------|
//! | `DATABASE_URL`                | `sqlite::memory:` |
//! | `FINTRACK_DB_MAX_CONNECTIONS` | `5`               |
//! | `FINTRACK_DB_CREATE_SCHEMA`   | `true`            |

use std::time::Duration;

use anyhow::{Context, bail};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use crate::repository::create_schema;

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const MAX_CONNECTIONS: &str = "FINTRACK_DB_MAX_CONNECTIONS";
pub const CREATE_SCHEMA: &str = "FINTRACK_DB_CREATE_SCHEMA";

const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// Run the idempotent schema bootstrap after connecting.
    pub create_schema: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            create_schema: true,
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let max_connections = match get(MAX_CONNECTIONS) {
            Some(raw) => raw.trim().parse::<u32>().with_context(|| {
                format!("{MAX_CONNECTIONS} must be a positive integer, got '{raw}'")
            })?,
            None => defaults.max_connections,
        };
        if max_connections == 0 {
            bail!("{MAX_CONNECTIONS} must be at least 1");
        }

        let create_schema = match get(CREATE_SCHEMA) {
            Some(raw) => parse_flag(&raw)
                .with_context(|| format!("{CREATE_SCHEMA} must be a boolean, got '{raw}'"))?,
            None => defaults.create_schema,
        };

        Ok(Self {
            database_url: get(DATABASE_URL).unwrap_or(defaults.database_url),
            max_connections,
            create_schema,
        })
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }

    /// Open the pool and, if enabled, create the schema.
    ///
    /// Every connection to an in-memory database sees its own empty database,
    /// so those pools are pinned to one connection that never expires.
    pub async fn connect(&self) -> anyhow::Result<SqlitePool> {
        let options = if self.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(self.max_connections)
        };
        let pool = options
            .connect(&self.database_url)
            .await
            .with_context(|| format!("failed to connect to {}", self.database_url))?;

        if self.create_schema {
            create_schema(&pool).await.context("failed to create schema")?;
        }
        tracing::info!(
            database_url = %self.database_url,
            in_memory = self.is_in_memory(),
            "storage connected"
        );
        Ok(pool)
    }
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("unrecognized flag '{other}'"),
    }
}
