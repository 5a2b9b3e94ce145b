//! Datagram endpoint abstraction (spec §4.4) and two implementations: a real
//! UDP socket and an in-memory stand-in for tests.
//!
//! Grounded on the teacher's `DiscoveryProvider`-as-seam idiom (a trait the
//! node depends on abstractly, with a concrete and an in-memory
//! implementation living side by side) and on `node.rs`'s pattern of closing
//! a resource to unblock a blocked async wait on shutdown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Notify};

use crate::error::GossipError;
use crate::peer::PeerIdentity;

/// Safe unicast MTU the library documents as a caller constraint (spec
/// §4.4). Datagrams are not fragmented above this layer.
pub const RECOMMENDED_MAX_DATAGRAM_BYTES: usize = 1200;

/// Receive buffer size. Any datagram larger than this is truncated by the OS
/// before this layer ever sees it; the codec then reports the garbled bytes
/// as a `DecodeError`, per spec §4.4.
const RECV_BUFFER_BYTES: usize = 2048;

/// Send-to-address and receive-one-datagram over an unreliable unicast
/// channel; closeable. `send` is internally serialized so that concurrent
/// callers never interleave partial datagrams (spec §5's single-outstanding-
/// send discipline); `receive` has a single logical consumer, the node's
/// worker.
#[async_trait]
pub trait DatagramEndpoint: Send + Sync + 'static {
    async fn send(&self, bytes: &[u8], host: &str, port: u16) -> Result<usize, GossipError>;

    /// Blocks until a datagram is available or the endpoint is closed, in
    /// which case it returns `GossipError::Closed`.
    async fn receive(&self) -> Result<(Vec<u8>, PeerIdentity), GossipError>;

    /// Idempotent.
    async fn close(&self);
}

// ── UDP ───────────────────────────────────────────────────────────────────────

/// Binds a UDP socket to `selfPort` on all local interfaces, with broadcast
/// permitted.
pub struct UdpEndpoint {
    socket: UdpSocket,
    send_lock: tokio::sync::Mutex<()>,
    closed: AtomicBool,
    close_notify: Notify,
}

impl UdpEndpoint {
    pub async fn bind(port: u16) -> Result<Self, GossipError> {
        let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
        socket.set_broadcast(true)?;
        Ok(Self {
            socket,
            send_lock: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
            close_notify: Notify::new(),
        })
    }

    pub fn local_port(&self) -> Result<u16, GossipError> {
        Ok(self.socket.local_addr()?.port())
    }
}

#[async_trait]
impl DatagramEndpoint for UdpEndpoint {
    async fn send(&self, bytes: &[u8], host: &str, port: u16) -> Result<usize, GossipError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(GossipError::Closed);
        }
        let _guard = self.send_lock.lock().await;
        self.socket
            .send_to(bytes, (host, port))
            .await
            .map_err(|e| GossipError::Send(e.to_string()))
    }

    async fn receive(&self) -> Result<(Vec<u8>, PeerIdentity), GossipError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(GossipError::Closed);
        }
        let mut buf = vec![0u8; RECV_BUFFER_BYTES];
        tokio::select! {
            res = self.socket.recv_from(&mut buf) => {
                let (n, addr) = res.map_err(|e| GossipError::Receive(e.to_string()))?;
                buf.truncate(n);
                Ok((buf, PeerIdentity::new(addr.ip().to_string(), addr.port())))
            }
            _ = self.close_notify.notified() => Err(GossipError::Closed),
        }
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.close_notify.notify_waiters();
        }
    }
}

// ── In-memory stand-in ───────────────────────────────────────────────────────

type Registry = Arc<Mutex<HashMap<(String, u16), mpsc::UnboundedSender<(Vec<u8>, PeerIdentity)>>>>;

/// A process-local network of `InMemoryEndpoint`s addressed by
/// `(host, port)`, so tests can build multi-node topologies without binding
/// real sockets.
#[derive(Clone, Default)]
pub struct InMemoryNetwork {
    registry: Registry,
}

impl InMemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register and return a new endpoint bound to `(host, port)` in this
    /// network. Replaces any previous endpoint registered at the same
    /// address.
    pub fn endpoint(&self, host: impl Into<String>, port: u16) -> InMemoryEndpoint {
        let host = host.into();
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry
            .lock()
            .unwrap()
            .insert((host.clone(), port), tx);
        InMemoryEndpoint {
            self_peer: PeerIdentity::new(host, port),
            registry: Arc::clone(&self.registry),
            rx: tokio::sync::Mutex::new(rx),
            closed: AtomicBool::new(false),
        }
    }
}

pub struct InMemoryEndpoint {
    self_peer: PeerIdentity,
    registry: Registry,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<(Vec<u8>, PeerIdentity)>>,
    closed: AtomicBool,
}

#[async_trait]
impl DatagramEndpoint for InMemoryEndpoint {
    async fn send(&self, bytes: &[u8], host: &str, port: u16) -> Result<usize, GossipError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(GossipError::Closed);
        }
        let target = self
            .registry
            .lock()
            .unwrap()
            .get(&(host.to_string(), port))
            .cloned();
        match target {
            Some(tx) => {
                let len = bytes.len();
                tx.send((bytes.to_vec(), self.self_peer.clone()))
                    .map_err(|_| GossipError::Send(format!("peer {host}:{port} gone")))?;
                Ok(len)
            }
            None => Err(GossipError::Send(format!("no such peer: {host}:{port}"))),
        }
    }

    async fn receive(&self) -> Result<(Vec<u8>, PeerIdentity), GossipError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(GossipError::Closed);
        }
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or(GossipError::Closed)
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.registry
                .lock()
                .unwrap()
                .remove(&(self.self_peer.host.clone(), self.self_peer.port));
            self.rx.lock().await.close();
        }
    }
}
