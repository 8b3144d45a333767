//! Database configuration module.
//!
//! Provides configuration structures for database connection management.

use crate::config::{ConfigError, parse_env_or};

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string (required)
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 20)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 5)
    /// - `DB_CONNECTION_TIMEOUT`: Connection timeout in seconds (default: 10)
    /// - `DB_IDLE_TIMEOUT`: Idle timeout in seconds (default: 600)
    /// - `DB_MAX_LIFETIME`: Max lifetime in seconds (default: 1800)
    ///
    /// # Returns
    ///
    /// * `Result<DatabaseConfig, ConfigError>` - Configuration, or the first
    ///   missing or malformed variable
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingRequired {
                var: "DATABASE_URL".to_string(),
            })?;

        let config = Self {
            database_url,
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", 20)?,
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", 5)?,
            connection_timeout_secs: parse_env_or("DB_CONNECTION_TIMEOUT", 10)?,
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT", 600)?,
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME", 1800)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration for development
    ///
    /// Uses `postgres://postgres@localhost/bracket_db` as the database URL
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/bracket_db".to_string(),
            max_connections: 20,
            min_connections: 5,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 || self.min_connections > self.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "pool bounds {}..{} are impossible",
                    self.min_connections, self.max_connections
                ),
            });
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}
