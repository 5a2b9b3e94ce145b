//! Illustrative standalone binary: bind one node to a UDP port with a static
//! peer list, originate one message, and log propagation as it arrives.
//!
//! Not part of the library's public surface — the library itself has no CLI.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use gossip_node::{Config, DiscoveryMode, JsonCodec, Node, PeerIdentity, StaticDiscovery, UdpEndpoint};
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

/// Start a gossip node, optionally originate one message, and log whatever
/// arrives.
#[derive(Parser, Debug)]
#[command(name = "gossip-demo")]
struct Args {
    /// Hostname this node advertises to peers (e.g. the address others dial).
    #[arg(long, default_value = "127.0.0.1")]
    self_host: String,

    /// UDP port to bind.
    #[arg(long)]
    self_port: u16,

    /// Static peer list as "host:port" pairs, comma-separated.
    #[arg(long, value_delimiter = ',')]
    peer: Vec<String>,

    /// Payload text to originate on startup. If omitted, the node only
    /// listens and relays.
    #[arg(long)]
    originate: Option<String>,

    /// Message TTL in seconds.
    #[arg(long, default_value_t = 600)]
    message_ttl_seconds: u64,
}

fn parse_peer(spec: &str) -> PeerIdentity {
    let (host, port) = spec
        .rsplit_once(':')
        .unwrap_or_else(|| panic!("peer {spec:?} is not in host:port form"));
    PeerIdentity::new(host.to_string(), port.parse().expect("peer port must be numeric"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let peers: Vec<PeerIdentity> = args.peer.iter().map(|s| parse_peer(s)).collect();

    let config = Config::new(args.self_host)
        .with_self_port(args.self_port)
        .with_discovery_mode(DiscoveryMode::Static)
        .with_static_peers(peers)
        .with_message_ttl_seconds(args.message_ttl_seconds);

    let endpoint = Arc::new(UdpEndpoint::bind(config.self_port).await?);
    let discovery = Arc::new(StaticDiscovery::new(config.static_peers.clone()));
    let node = Node::new(&config, discovery, endpoint, JsonCodec)?;

    node.start()?;
    tracing::info!(self_peer = %node.self_identity(), "demo node listening");

    let mut incoming = node.subscribe();
    tokio::spawn(async move {
        while let Some(envelope) = incoming.next().await {
            tracing::info!(
                id = %envelope.id(),
                notified = envelope.notified().len(),
                payload = %envelope.payload,
                "message delivered"
            );
        }
    });

    if let Some(text) = args.originate {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let sent = node.originate(text).await?;
        tracing::info!(peers_sent = sent, "originated message");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    node.stop().await?;
    node.close().await?;
    Ok(())
}
