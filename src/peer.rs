//! Peer identity — a plain `{host, port}` value type.
//!
//! Equality and ordering are literal: the host is compared byte-for-byte as
//! supplied, with no canonicalization or resolution. Two nodes configured
//! with `"node-a"` and `"node-a."` are distinct peers as far as this type is
//! concerned; operators are expected to configure peers consistently (spec
//! open question: peer-identity comparison).

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A peer's network address: hostname (or numeric literal) plus UDP port.
///
/// Immutable after construction. `port == 0` is reserved as invalid and is
/// rejected wherever a `PeerIdentity` is constructed from caller-supplied
/// configuration (see `Config::validate`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerIdentity {
    #[serde(rename = "hostname")]
    pub host: String,
    pub port: u16,
}

impl PeerIdentity {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Render as `"host:port"`.
    pub fn render(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl PartialEq for PeerIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host && self.port == other.port
    }
}

impl Eq for PeerIdentity {}

impl std::hash::Hash for PeerIdentity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.host.hash(state);
        self.port.hash(state);
    }
}

impl PartialOrd for PeerIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PeerIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.host.cmp(&other.host).then(self.port.cmp(&other.port))
    }
}
