//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use bracket_engine::{config::EngineConfig, db::DatabaseConfig};
use std::{fmt, net::SocketAddr, str::FromStr};

/// Default bind address when neither `--bind` nor `SERVER_BIND` is given
pub const DEFAULT_BIND: &str = "127.0.0.1:6969";

/// Where matches are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process memory; everything is lost on restart
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            other => Err(ConfigError::Invalid {
                var: "BRACKET_STORAGE".to_string(),
                reason: format!("unknown backend '{other}', expected memory or postgres"),
            }),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => f.write_str("memory"),
            StorageBackend::Postgres => f.write_str("postgres"),
        }
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Storage backend
    pub storage: StorageBackend,
    /// Database configuration, present for the Postgres backend
    pub database: Option<DatabaseConfig>,
    /// Bracket engine configuration
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `storage_override` - Optional storage backend override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        storage_override: Option<StorageBackend>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => {
                let raw = std::env::var("SERVER_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
                raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "SERVER_BIND".to_string(),
                    reason: format!("'{raw}' is not a socket address"),
                })?
            }
        };

        let storage = match storage_override {
            Some(storage) => storage,
            None => std::env::var("BRACKET_STORAGE")
                .map(|raw| raw.parse())
                .unwrap_or(Ok(StorageBackend::Memory))?,
        };

        let database = match storage {
            StorageBackend::Postgres => Some(DatabaseConfig::from_env().map_err(|e| {
                ConfigError::Engine {
                    source: e,
                    hint: "The postgres backend needs DATABASE_URL".to_string(),
                }
            })?),
            StorageBackend::Memory => None,
        };

        let engine = EngineConfig::from_env().map_err(|e| ConfigError::Engine {
            source: e,
            hint: "See BRACKET_MIN_ENTRANTS and BRACKET_DRAW_SEED".to_string(),
        })?;

        Ok(ServerConfig {
            bind,
            storage,
            database,
            engine,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage == StorageBackend::Postgres && self.database.is_none() {
            return Err(ConfigError::MissingRequired {
                var: "DATABASE_URL".to_string(),
                hint: "Required with --storage postgres".to_string(),
            });
        }

        if let Some(database) = &self.database {
            database.validate().map_err(|e| ConfigError::Engine {
                source: e,
                hint: "Check the DB_* pool settings".to_string(),
            })?;
        }

        self.engine.validate().map_err(|e| ConfigError::Engine {
            source: e,
            hint: "See BRACKET_MIN_ENTRANTS".to_string(),
        })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error("{source}\nHint: {hint}")]
    Engine {
        source: bracket_engine::config::ConfigError,
        hint: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:8080".parse().unwrap(),
            storage: StorageBackend::Memory,
            database: None,
            engine: EngineConfig::default(),
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "DATABASE_URL".to_string(),
            hint: "Use postgres".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DATABASE_URL"));
        assert!(msg.contains("Use postgres"));
    }

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!(
            "PostgreSQL".parse::<StorageBackend>().unwrap(),
            StorageBackend::Postgres
        );
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_config_validation_memory() {
        assert!(memory_config().validate().is_ok());
    }

    #[test]
    fn test_config_validation_postgres_without_database() {
        let config = ServerConfig {
            storage: StorageBackend::Postgres,
            ..memory_config()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { .. }));
    }

    #[test]
    fn test_config_validation_min_entrants() {
        let config = ServerConfig {
            engine: EngineConfig {
                min_entrants: 1,
                draw_seed: None,
            },
            ..memory_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Engine { .. })
        ));
    }

    #[test]
    fn test_config_validation_pool_bounds() {
        let config = ServerConfig {
            storage: StorageBackend::Postgres,
            database: Some(DatabaseConfig {
                min_connections: 50,
                max_connections: 10,
                ..DatabaseConfig::development()
            }),
            ..memory_config()
        };
        assert!(config.validate().is_err());
    }
}
