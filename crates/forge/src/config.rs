//! Server-level configuration: bind address plus the tunables each
//! layer below exposes as a `Default`-able config struct. Builder-style
//! overrides on top of sane defaults, no config-file framework.

use std::time::Duration;

use forge_conversion::ConversionConfig;
use forge_room::RuntimeConfig;

/// Top-level configuration for a running [`crate::ForgeServer`].
#[derive(Debug, Clone)]
pub struct ForgeConfig {
    pub bind_addr: String,
    pub runtime: RuntimeConfig,
    pub conversion: ConversionConfig,
    /// Deadline applied to the initial handshake/auth exchange before a
    /// connection is dropped.
    pub handshake_timeout: Duration,
    /// Largest single frame a connection will accept before the
    /// transport rejects it and the connection is closed.
    pub max_payload_bytes: usize,
    /// How often a connection sends a heartbeat ping to its peer.
    pub heartbeat_interval: Duration,
    /// How long a connection may go without any frame (data, ping, or
    /// pong) from its peer before it's considered dead and closed.
    pub heartbeat_timeout: Duration,
    /// How often `RoomManager`'s background sweep checks disconnected
    /// players against `runtime.reconnect_grace`.
    pub reconnect_sweep_interval: Duration,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            runtime: RuntimeConfig::default(),
            conversion: ConversionConfig::default(),
            handshake_timeout: Duration::from_secs(5),
            max_payload_bytes: forge_transport::DEFAULT_MAX_PAYLOAD_BYTES,
            heartbeat_interval: Duration::from_secs(15),
            heartbeat_timeout: Duration::from_secs(45),
            reconnect_sweep_interval: Duration::from_secs(10),
        }
    }
}

impl ForgeConfig {
    /// Reads overrides from environment variables, falling back to
    /// [`Default`] for anything unset: `FORGE_BIND_ADDR`,
    /// `FORGE_MAX_CONCURRENT_CONVERSIONS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("FORGE_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(max) = std::env::var("FORGE_MAX_CONCURRENT_CONVERSIONS") {
            if let Ok(max) = max.parse() {
                config.conversion.max_concurrent = max;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binds_to_localhost() {
        assert_eq!(ForgeConfig::default().bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn from_env_falls_back_to_defaults_when_unset() {
        std::env::remove_var("FORGE_BIND_ADDR");
        std::env::remove_var("FORGE_MAX_CONCURRENT_CONVERSIONS");
        let config = ForgeConfig::from_env();
        assert_eq!(config.bind_addr, ForgeConfig::default().bind_addr);
    }
}
