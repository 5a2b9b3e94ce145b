//! Discovery integration tests: `StaticDiscovery` wired through a live node's
//! forward step, and a custom `Discovery` implementation proving discovery is
//! re-evaluated on every forward rather than cached once at construction
//! (spec §4.3: "there is no persistent membership table").

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use gossip_node::{Codec, DatagramEndpoint, Discovery, GossipError, InMemoryNetwork, JsonCodec, Node, PeerIdentity};
use tokio::time::timeout;

/// A `Discovery` whose answer can be changed between calls, standing in for
/// a resolver backed by changing external state (e.g. DNS).
struct DynamicDiscovery {
    peers: Mutex<Vec<PeerIdentity>>,
}

impl DynamicDiscovery {
    fn empty() -> Self {
        Self {
            peers: Mutex::new(Vec::new()),
        }
    }

    fn set(&self, peers: Vec<PeerIdentity>) {
        *self.peers.lock().unwrap() = peers;
    }
}

impl Discovery for DynamicDiscovery {
    fn enumerate(&self) -> Result<Vec<PeerIdentity>, GossipError> {
        Ok(self.peers.lock().unwrap().clone())
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn discovery_is_reevaluated_on_every_forward_not_cached_at_construction() {
    let net = InMemoryNetwork::new();
    let b = net.endpoint("b-dyn", 2);

    let cfg = common::config("origin-dyn", 1, vec![], 600);
    let discovery = Arc::new(DynamicDiscovery::empty());
    let endpoint = Arc::new(net.endpoint("origin-dyn", 1));
    let node = Node::new(
        &cfg,
        Arc::clone(&discovery) as Arc<dyn Discovery>,
        endpoint,
        JsonCodec,
    )
    .unwrap();
    node.start().unwrap();

    // First originate: discovery returns nothing yet.
    let sent_before = node.originate("first".to_string()).await.unwrap();
    assert_eq!(sent_before, 0);
    assert!(
        timeout(Duration::from_millis(200), b.receive()).await.is_err(),
        "b must not receive anything before it is discoverable"
    );

    // Discovery now reports b as a candidate peer.
    discovery.set(vec![PeerIdentity::new("b-dyn", 2)]);

    let sent_after = node.originate("second".to_string()).await.unwrap();
    assert_eq!(sent_after, 1);

    let (bytes, _from) = timeout(Duration::from_secs(2), b.receive())
        .await
        .expect("b must receive the second message")
        .unwrap();
    let decoded: gossip_node::Envelope<String> = JsonCodec.decode(&bytes).unwrap();
    assert_eq!(decoded.payload, "second");

    node.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn discovery_failure_is_treated_as_empty_set_this_cycle() {
    struct FailingDiscovery;
    impl Discovery for FailingDiscovery {
        fn enumerate(&self) -> Result<Vec<PeerIdentity>, GossipError> {
            Err(GossipError::Discovery("resolver unreachable".into()))
        }
    }

    let net = InMemoryNetwork::new();
    let cfg = common::config("origin-fail", 1, vec![], 600);
    let endpoint: Arc<dyn DatagramEndpoint> = Arc::new(net.endpoint("origin-fail", 1));
    let node = Node::new(
        &cfg,
        Arc::new(FailingDiscovery) as Arc<dyn Discovery>,
        endpoint,
        JsonCodec,
    )
    .unwrap();
    node.start().unwrap();

    // originate() must not propagate the discovery error to the caller; it
    // is absorbed internally per spec §4.3/§7, and the send count is 0.
    let sent = node.originate("x".to_string()).await.unwrap();
    assert_eq!(sent, 0);

    node.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn static_discovery_set_is_returned_verbatim_through_a_live_node() {
    let net = InMemoryNetwork::new();
    let peers = vec![PeerIdentity::new("p1", 2), PeerIdentity::new("p2", 3)];
    let p1 = net.endpoint("p1", 2);
    let p2 = net.endpoint("p2", 3);

    let node = common::node(&net, "origin-static", 1, peers, 600);
    node.start().unwrap();

    let sent = node.originate("static".to_string()).await.unwrap();
    assert_eq!(sent, 2);

    for p in [&p1, &p2] {
        let (bytes, _) = timeout(Duration::from_secs(2), p.receive())
            .await
            .unwrap()
            .unwrap();
        let decoded: gossip_node::Envelope<String> = JsonCodec.decode(&bytes).unwrap();
        assert_eq!(decoded.payload, "static");
    }

    node.stop().await.unwrap();
}
