//! Shared test helpers: an in-memory node builder plus a send-recording
//! `DatagramEndpoint` wrapper so tests can observe exactly what a node put
//! on the wire without inspecting bytes on the receiving side.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gossip_node::{
    Config, DatagramEndpoint, Discovery, GossipError, InMemoryNetwork, JsonCodec, Node,
    PeerIdentity, StaticDiscovery,
};

pub fn config(host: &str, port: u16, peers: Vec<PeerIdentity>, ttl_secs: u64) -> Config {
    Config::new(host)
        .with_self_port(port)
        .with_static_peers(peers)
        .with_message_ttl_seconds(ttl_secs)
}

/// Builds (but does not start) a node wired into `net` at `(host, port)`
/// with a static peer list and the reference JSON codec.
pub fn node(
    net: &InMemoryNetwork,
    host: &str,
    port: u16,
    peers: Vec<PeerIdentity>,
    ttl_secs: u64,
) -> Node<String, JsonCodec> {
    let cfg = config(host, port, peers, ttl_secs);
    let discovery: Arc<dyn Discovery> = Arc::new(StaticDiscovery::new(cfg.static_peers.clone()));
    let endpoint: Arc<dyn DatagramEndpoint> = Arc::new(net.endpoint(host, port));
    Node::new(&cfg, discovery, endpoint, JsonCodec).expect("valid config")
}

/// Wraps a `DatagramEndpoint` and records every `(host, port, bytes)` handed
/// to `send`, so a test can assert on what actually went out — e.g. that a
/// node never forwards back to a peer already in the notified-set (P3).
pub struct RecordingEndpoint<E> {
    inner: E,
    sent: Arc<Mutex<Vec<(String, u16, Vec<u8>)>>>,
}

impl<E> RecordingEndpoint<E> {
    pub fn new(inner: E) -> (Self, Arc<Mutex<Vec<(String, u16, Vec<u8>)>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                inner,
                sent: Arc::clone(&sent),
            },
            sent,
        )
    }
}

#[async_trait]
impl<E: DatagramEndpoint> DatagramEndpoint for RecordingEndpoint<E> {
    async fn send(&self, bytes: &[u8], host: &str, port: u16) -> Result<usize, GossipError> {
        self.sent
            .lock()
            .unwrap()
            .push((host.to_string(), port, bytes.to_vec()));
        self.inner.send(bytes, host, port).await
    }

    async fn receive(&self) -> Result<(Vec<u8>, PeerIdentity), GossipError> {
        self.inner.receive().await
    }

    async fn close(&self) {
        self.inner.close().await
    }
}
