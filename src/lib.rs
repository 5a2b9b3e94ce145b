//! Epidemic (gossip) message dissemination over UDP for a fixed or
//! dynamically resolved set of peers.
//!
//! See `Node` for the lifecycle and `Config` for how a node is configured.

pub mod cache;
pub mod config;
pub mod discovery;
pub mod envelope;
pub mod error;
pub mod hub;
pub mod log_layer;
pub mod node;
pub mod peer;
pub mod transport;

pub use cache::ExpiringMessageCache;
pub use config::{Config, DiscoveryMode};
pub use discovery::static_list::StaticDiscovery;
pub use discovery::Discovery;
#[cfg(feature = "dns-discovery")]
pub use discovery::dns::DnsDiscovery;
pub use envelope::{Codec, Envelope, JsonCodec};
pub use error::GossipError;
pub use hub::{SubscriberId, Subscription, SubscriptionHub};
pub use node::{Node, NodeState};
pub use peer::PeerIdentity;
pub use transport::{DatagramEndpoint, InMemoryEndpoint, InMemoryNetwork, UdpEndpoint};
