//! Peer-discovery abstraction (spec §4.3).
//!
//! `Discovery` is the seam between the node runtime and wherever the current
//! candidate-peer set comes from. Grounded on the teacher's
//! `DiscoveryProvider` trait: a synchronous, `Send + Sync + 'static` trait
//! run on a blocking thread from the async event loop (`spawn_blocking`),
//! rather than an async trait — discovery here is either pure in-memory
//! (static) or a single blocking resolver call (dns), neither of which
//! benefits from being `async fn`.

pub mod static_list;

#[cfg(feature = "dns-discovery")]
pub mod dns;

use crate::error::GossipError;
use crate::peer::PeerIdentity;

/// Stateless resolver: given configuration captured at construction, returns
/// the current set of candidate peers. Re-evaluated on every forward; there
/// is no persistent membership table (spec §4.3).
pub trait Discovery: Send + Sync + 'static {
    fn enumerate(&self) -> Result<Vec<PeerIdentity>, GossipError>;
}
