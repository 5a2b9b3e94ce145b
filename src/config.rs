//! Configuration surface (spec §3, §6).
//!
//! Grounded on the teacher's `P2pConfig`/`RelayConfig` constructor-with-
//! defaults style (`P2pConfig::new` takes the required fields and fills the
//! rest with sensible defaults). Validation is a fallible step performed
//! once, at node construction, returning `GossipError::Config` — there is no
//! file or environment loading here; the spec explicitly keeps that out of
//! the core.

use std::time::Duration;

use crate::error::GossipError;
use crate::peer::PeerIdentity;

/// Default UDP port used when `self_port` is not overridden.
pub const DEFAULT_SELF_PORT: u16 = 9055;

/// Default message TTL (spec §4.5 / §6: 600 seconds).
pub const DEFAULT_MESSAGE_TTL_SECONDS: u64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    Static,
    Dns,
}

impl Default for DiscoveryMode {
    fn default() -> Self {
        DiscoveryMode::Static
    }
}

/// Programmatic configuration for a node. Constructed by the application
/// and held immutable for the node's life (spec §3).
#[derive(Debug, Clone)]
pub struct Config {
    pub self_host: String,
    pub self_port: u16,
    pub discovery_mode: DiscoveryMode,
    pub static_peers: Vec<PeerIdentity>,
    pub message_ttl_seconds: u64,
}

impl Config {
    pub fn new(self_host: impl Into<String>) -> Self {
        Self {
            self_host: self_host.into(),
            self_port: DEFAULT_SELF_PORT,
            discovery_mode: DiscoveryMode::default(),
            static_peers: Vec::new(),
            message_ttl_seconds: DEFAULT_MESSAGE_TTL_SECONDS,
        }
    }

    pub fn with_self_port(mut self, port: u16) -> Self {
        self.self_port = port;
        self
    }

    pub fn with_discovery_mode(mut self, mode: DiscoveryMode) -> Self {
        self.discovery_mode = mode;
        self
    }

    pub fn with_static_peers(mut self, peers: Vec<PeerIdentity>) -> Self {
        self.static_peers = peers;
        self
    }

    pub fn with_message_ttl_seconds(mut self, seconds: u64) -> Self {
        self.message_ttl_seconds = seconds;
        self
    }

    pub fn message_ttl(&self) -> Duration {
        Duration::from_secs(self.message_ttl_seconds)
    }

    pub fn self_identity(&self) -> PeerIdentity {
        PeerIdentity::new(self.self_host.clone(), self.self_port)
    }

    /// Rejects: an empty `self_host`, `self_port == 0`, and
    /// `message_ttl_seconds == 0` (spec §4.5, §6).
    pub fn validate(&self) -> Result<(), GossipError> {
        if self.self_host.is_empty() {
            return Err(GossipError::Config("selfHost must not be empty".into()));
        }
        if self.self_port == 0 {
            return Err(GossipError::Config("selfPort must not be zero".into()));
        }
        if self.message_ttl_seconds == 0 {
            return Err(GossipError::Config(
                "messageTtlSeconds must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_spec_defaults() {
        let cfg = Config::new("node-a");
        assert_eq!(cfg.self_port, DEFAULT_SELF_PORT);
        assert_eq!(cfg.message_ttl_seconds, DEFAULT_MESSAGE_TTL_SECONDS);
        assert_eq!(cfg.discovery_mode, DiscoveryMode::Static);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_host_rejected() {
        assert!(Config::new("").validate().is_err());
    }

    #[test]
    fn zero_port_rejected() {
        assert!(Config::new("node-a").with_self_port(0).validate().is_err());
    }

    #[test]
    fn zero_ttl_rejected() {
        assert!(Config::new("node-a")
            .with_message_ttl_seconds(0)
            .validate()
            .is_err());
    }
}
