use core::fmt::{Debug, Display};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

pub const CONFIG_FILE: &str = "builder-desk.toml";
pub const ENV_PREFIX: &str = "BUILDER_DESK_";

/// Exclusive upper bound for `slot_tolerance_ms`: half a 30 minute desk slot,
/// so two distinct slot starts never match each other.
pub const MAX_SLOT_TOLERANCE_MS: i64 = 15 * 60 * 1000;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// `memory://` or a `postgres://` url.
    pub database_url: String,
    /// Rows per insert statement when allocations are saved.
    #[serde(default = "default_allocation_batch_size")]
    pub allocation_batch_size: usize,
    #[serde(default = "default_slot_tolerance_ms")]
    pub slot_tolerance_ms: i64,
}

const fn default_listen() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 3000))
}

const fn default_allocation_batch_size() -> usize {
    100
}

const fn default_slot_tolerance_ms() -> i64 {
    1000
}

#[derive(thiserror::Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Extract(#[from] figment::Error),
    #[error("config error: allocation_batch_size must be at least 1")]
    EmptyBatch,
    #[error("config error: slot_tolerance_ms must be positive")]
    NonPositiveTolerance,
    #[error("config error: slot_tolerance_ms must be below {}", MAX_SLOT_TOLERANCE_MS)]
    ToleranceTooWide,
}

impl Debug for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

pub fn get_config() -> Result<Config, ConfigError> {
    from_figment(
        &Figment::new()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX)),
    )
}

fn from_figment(figment: &Figment) -> Result<Config, ConfigError> {
    let config: Config = figment.extract()?;
    if config.allocation_batch_size == 0 {
        return Err(ConfigError::EmptyBatch);
    }
    if config.slot_tolerance_ms <= 0 {
        return Err(ConfigError::NonPositiveTolerance);
    }
    if config.slot_tolerance_ms >= MAX_SLOT_TOLERANCE_MS {
        return Err(ConfigError::ToleranceTooWide);
    }
    Ok(config)
}
