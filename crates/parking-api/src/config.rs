//! Configuration management for the Parking API
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use parking_core::{fee, FeeSchedule, LotConfig, OccupyPolicy};
use std::env;
use std::str::FromStr;

/// Where lot state is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-process, lost on restart
    Memory,
    /// Redis at `REDIS_URL`
    Redis,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub api_host: String,

    /// API server port
    pub api_port: u16,

    /// Storage backend
    pub storage: StorageBackend,

    /// Redis connection URL (redis backend only)
    pub redis_url: String,

    /// Space count, fee tiers and double-entry policy
    pub lot: LotConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let fees = FeeSchedule {
            base_fee: get("BASE_FEE", &fee::DEFAULT_BASE_FEE.to_string())
                .parse()
                .context("Invalid BASE_FEE")?,
            hourly_rate: get("HOURLY_RATE", &fee::DEFAULT_HOURLY_RATE.to_string())
                .parse()
                .context("Invalid HOURLY_RATE")?,
            max_fee: get("MAX_FEE", &fee::DEFAULT_MAX_FEE.to_string())
                .parse()
                .context("Invalid MAX_FEE")?,
        };

        let config = Config {
            api_host: get("API_HOST", "0.0.0.0"),

            api_port: get("API_PORT", "8000")
                .parse()
                .context("Invalid API_PORT")?,

            storage: get("STORAGE_BACKEND", "memory")
                .parse()
                .map_err(anyhow::Error::msg)
                .context("Invalid STORAGE_BACKEND (expected memory/redis)")?,

            redis_url: get("REDIS_URL", "redis://127.0.0.1:6379"),

            lot: LotConfig {
                spot_count: get("SPOT_COUNT", "8")
                    .parse()
                    .context("Invalid SPOT_COUNT")?,
                fees,
                occupy_policy: get("OCCUPY_POLICY", "reject")
                    .parse::<OccupyPolicy>()
                    .map_err(anyhow::Error::msg)
                    .context("Invalid OCCUPY_POLICY (expected reject/overwrite)")?,
            },
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("API_PORT must be greater than 0");
        }

        if self.lot.spot_count == 0 {
            anyhow::bail!("SPOT_COUNT must be greater than 0");
        }

        if self.lot.fees.max_fee < self.lot.fees.base_fee {
            anyhow::bail!("MAX_FEE must not be lower than BASE_FEE");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}
