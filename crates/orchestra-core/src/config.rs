//! Configuration system for Orchestra.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $ORCHESTRA_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/orchestra/config.toml
//!   3. ~/.config/orchestra/config.toml
//!
//! The defaults are the wire contract from `wire.rs`, so a musician and an
//! auditor started without any config file interoperate.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use crate::wire::{
    ANNOUNCE_INTERVAL_MS, API_PORT, MULTICAST_ADDR, MULTICAST_PORT, QUERY_PORT, STALENESS_SECS,
};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestraConfig {
    pub network: NetworkConfig,
    pub auditor: AuditorConfig,
    pub musician: MusicianConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// IPv4 multicast group for announcements.
    pub multicast_group: Ipv4Addr,
    /// UDP port for announcements.
    pub multicast_port: u16,
    /// Local interface address used to join/send. 0.0.0.0 = let the OS pick.
    pub interface: Ipv4Addr,
    /// Multicast TTL for outgoing announcements.
    pub multicast_ttl: u32,
    /// TCP port for roster snapshots.
    pub query_port: u16,
    /// TCP port for the HTTP status API. 0 = disabled.
    pub api_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditorConfig {
    /// Seconds of silence after which a musician is pruned.
    pub staleness_secs: u64,
    /// Periodic sweep interval. 0 = prune only when a snapshot is requested.
    pub sweep_interval_secs: u64,
    /// Ignore announcements older than the one already recorded.
    pub reject_out_of_order: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicianConfig {
    /// Milliseconds between two announcements.
    pub announce_interval_ms: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            multicast_group: MULTICAST_ADDR,
            multicast_port: MULTICAST_PORT,
            interface: Ipv4Addr::UNSPECIFIED,
            multicast_ttl: 1,
            query_port: QUERY_PORT,
            api_port: API_PORT,
        }
    }
}

impl Default for AuditorConfig {
    fn default() -> Self {
        Self {
            staleness_secs: STALENESS_SECS,
            sweep_interval_secs: 0,
            reject_out_of_order: false,
        }
    }
}

impl Default for MusicianConfig {
    fn default() -> Self {
        Self {
            announce_interval_ms: ANNOUNCE_INTERVAL_MS,
        }
    }
}

impl AuditorConfig {
    /// Staleness threshold as a signed duration, comparable with timestamp deltas.
    pub fn staleness(&self) -> chrono::Duration {
        // Clamp to a century so the conversion cannot overflow.
        chrono::Duration::seconds(self.staleness_secs.min(100 * 365 * 86_400) as i64)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

impl MusicianConfig {
    pub fn announce_interval(&self) -> Duration {
        // tokio::time::interval panics on a zero period
        Duration::from_millis(self.announce_interval_ms.max(1))
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("orchestra")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl OrchestraConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_file(&Self::file_path())?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a config file, or return defaults if it does not exist.
    pub fn load_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(OrchestraConfig::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("ORCHESTRA_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&OrchestraConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply ORCHESTRA_* overrides. `lookup` is `std::env::var` in production.
    /// Values that fail to parse are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn set<T: std::str::FromStr>(slot: &mut T, value: Option<String>) {
            if let Some(v) = value.and_then(|v| v.trim().parse().ok()) {
                *slot = v;
            }
        }

        set(
            &mut self.network.multicast_group,
            lookup("ORCHESTRA_NETWORK__MULTICAST_GROUP"),
        );
        set(
            &mut self.network.multicast_port,
            lookup("ORCHESTRA_NETWORK__MULTICAST_PORT"),
        );
        set(&mut self.network.query_port, lookup("ORCHESTRA_NETWORK__QUERY_PORT"));
        set(&mut self.network.api_port, lookup("ORCHESTRA_NETWORK__API_PORT"));
        set(
            &mut self.auditor.staleness_secs,
            lookup("ORCHESTRA_AUDITOR__STALENESS_SECS"),
        );
        set(
            &mut self.auditor.sweep_interval_secs,
            lookup("ORCHESTRA_AUDITOR__SWEEP_INTERVAL_SECS"),
        );
        if let Some(v) = lookup("ORCHESTRA_AUDITOR__REJECT_OUT_OF_ORDER") {
            self.auditor.reject_out_of_order = v == "true" || v == "1";
        }
        set(
            &mut self.musician.announce_interval_ms,
            lookup("ORCHESTRA_MUSICIAN__ANNOUNCE_INTERVAL_MS"),
        );
    }
}
