//! Engine configuration.
//!
//! Consolidates the environment variables the bracket engine reads.

use std::str::FromStr;

/// Minimum entrants a bracket can be generated for
pub const DEFAULT_MIN_ENTRANTS: usize = 2;

/// Bracket engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Entrants required before a bracket can be generated (at least 2)
    pub min_entrants: usize,

    /// Fixed seed for random draws; `None` draws from OS entropy
    pub draw_seed: Option<u64>,
}

impl EngineConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `BRACKET_MIN_ENTRANTS`: Entrants required to generate (default: 2)
    /// - `BRACKET_DRAW_SEED`: Fixed random draw seed (default: unset)
    ///
    /// # Returns
    ///
    /// * `Result<EngineConfig, ConfigError>` - Configuration from environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            min_entrants: parse_env_or("BRACKET_MIN_ENTRANTS", DEFAULT_MIN_ENTRANTS)?,
            draw_seed: parse_env("BRACKET_DRAW_SEED")?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values no bracket can satisfy
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_entrants < DEFAULT_MIN_ENTRANTS {
            return Err(ConfigError::Invalid {
                var: "BRACKET_MIN_ENTRANTS".to_string(),
                reason: format!("Must be at least {DEFAULT_MIN_ENTRANTS}"),
            });
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_entrants: DEFAULT_MIN_ENTRANTS,
            draw_seed: None,
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}")]
    MissingRequired { var: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse an environment variable, falling back to `default` when unset.
///
/// A set but unparsable value is an error rather than a silent default.
pub fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
{
    Ok(parse_env(key)?.unwrap_or(default))
}

/// Parse an optional environment variable
pub fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(value) => value.trim().parse().map(Some).map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("'{value}' is not a valid value"),
        }),
        Err(_) => Ok(None),
    }
}
