//! Node runtime — the core of the library (spec §4.7).
//!
//! Grounded directly on the teacher's `P2pNode`/`P2pHandle`/`NodeState`/
//! `event_loop` architecture: a single `tokio::select!`-driven worker task
//! owned by a moved-in state struct, a oneshot/command channel for
//! shutdown, and the "closing the transport unblocks the blocked receive"
//! idiom the teacher uses to tear down its swarm. The subscriber fan-out is
//! the hub (`hub.rs`) rather than a `broadcast::Sender`, for the reasons
//! documented there.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::cache::{ExpiringMessageCache, DEFAULT_SWEEP_INTERVAL};
use crate::config::Config;
use crate::discovery::Discovery;
use crate::envelope::{Codec, Envelope};
use crate::error::GossipError;
use crate::hub::{Subscription, SubscriptionHub, SubscriberId};
use crate::peer::PeerIdentity;
use crate::transport::DatagramEndpoint;

/// Grace period `stop()` waits for the worker to exit cleanly before closing
/// the endpoint forcibly (spec §5: "default 5 s").
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// A receive-error burst this long causes the worker to exit `Stopping` on
/// its own (spec §4.7: "implementation-defined, e.g. 100").
const MAX_CONSECUTIVE_RECEIVE_ERRORS: u32 = 100;

/// Lifecycle states (spec §4.7). `Closed` is a terminal sink reachable from
/// any other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Created,
    Running,
    Stopping,
    Stopped,
    Closed,
}

struct Shared<P, C> {
    self_peer: PeerIdentity,
    discovery: Arc<dyn Discovery>,
    endpoint: Arc<dyn DatagramEndpoint>,
    cache: ExpiringMessageCache<P>,
    hub: SubscriptionHub<P>,
    codec: Arc<C>,
    sweep_interval: Duration,
    grace_period: Duration,
    state: Mutex<NodeState>,
    stopped_tx: watch::Sender<bool>,
}

struct WorkerHandles {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// A gossip node: owns its datagram endpoint, cache, subscription hub, and
/// background worker exclusively (spec §3 Ownership). Cheap to clone in the
/// sense that the application is expected to hold one `Node` and call its
/// methods from multiple contexts concurrently — `originate`, `subscribe`,
/// and the worker all share the same underlying state via `Arc`.
pub struct Node<P, C>
where
    P: Clone + Send + Sync + 'static,
    C: Codec<P>,
{
    shared: Arc<Shared<P, C>>,
    worker: Mutex<Option<WorkerHandles>>,
}

impl<P, C> Node<P, C>
where
    P: Clone + Send + Sync + 'static,
    C: Codec<P>,
{
    pub fn new(
        config: &Config,
        discovery: Arc<dyn Discovery>,
        endpoint: Arc<dyn DatagramEndpoint>,
        codec: C,
    ) -> Result<Self, GossipError> {
        config.validate()?;
        let cache = ExpiringMessageCache::new(config.message_ttl())?;
        let (stopped_tx, _) = watch::channel(false);
        Ok(Self {
            shared: Arc::new(Shared {
                self_peer: config.self_identity(),
                discovery,
                endpoint,
                cache,
                hub: SubscriptionHub::new(),
                codec: Arc::new(codec),
                sweep_interval: DEFAULT_SWEEP_INTERVAL,
                grace_period: DEFAULT_GRACE_PERIOD,
                state: Mutex::new(NodeState::Created),
                stopped_tx,
            }),
            worker: Mutex::new(None),
        })
    }

    pub fn state(&self) -> NodeState {
        *self.shared.state.lock().unwrap()
    }

    /// `Created → Running`. Fails with `LifecycleError` from any other
    /// state (idempotent refusal, spec §4.7).
    pub fn start(&self) -> Result<(), GossipError> {
        {
            let mut state = self.shared.state.lock().unwrap();
            if *state != NodeState::Created {
                return Err(GossipError::Lifecycle(format!(
                    "cannot start node from state {:?}",
                    *state
                )));
            }
            *state = NodeState::Running;
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let join = tokio::spawn(run_worker(shared, stop_rx));
        *self.worker.lock().unwrap() = Some(WorkerHandles { stop_tx, join });
        tracing::info!(self_peer = %self.shared.self_peer, "node started");
        Ok(())
    }

    /// `Running → Stopping → Stopped`. Cancels the receive loop, drains
    /// in-flight processing, completes all subscriber sequences, then
    /// returns. Idempotent once `Stopped` (spec §4.7).
    pub async fn stop(&self) -> Result<(), GossipError> {
        {
            let mut state = self.shared.state.lock().unwrap();
            match *state {
                NodeState::Created => {
                    return Err(GossipError::Lifecycle(
                        "cannot stop a node that was never started".into(),
                    ))
                }
                NodeState::Closed => {
                    return Err(GossipError::Lifecycle("node is closed".into()))
                }
                NodeState::Stopped => return Ok(()),
                NodeState::Running => *state = NodeState::Stopping,
                NodeState::Stopping => {}
            }
        }

        let worker = self.worker.lock().unwrap().take();
        match worker {
            Some(WorkerHandles { stop_tx, join }) => {
                let _ = stop_tx.send(());
                if tokio::time::timeout(self.shared.grace_period, join)
                    .await
                    .is_err()
                {
                    tracing::warn!("stop(): grace period elapsed; closing endpoint forcibly");
                    self.shared.endpoint.close().await;
                }
            }
            None => {
                // A concurrent stop() call already took the worker handle;
                // wait for it to finish rather than driving shutdown twice.
                let mut rx = self.shared.stopped_tx.subscribe();
                if !*rx.borrow() {
                    let _ = rx.changed().await;
                }
            }
        }
        Ok(())
    }

    /// Releases the endpoint and cache. Callable from `Created`, `Stopped`,
    /// or (as a safety net) `Running`/`Stopping`, which implies `stop()`
    /// first. Reuse after close is disallowed.
    pub async fn close(&self) -> Result<(), GossipError> {
        let needs_stop = {
            let state = *self.shared.state.lock().unwrap();
            match state {
                NodeState::Closed => {
                    return Err(GossipError::Lifecycle("node already closed".into()))
                }
                NodeState::Running | NodeState::Stopping => true,
                NodeState::Created | NodeState::Stopped => false,
            }
        };
        if needs_stop {
            self.stop().await?;
        }
        self.shared.endpoint.close().await;
        *self.shared.state.lock().unwrap() = NodeState::Closed;
        Ok(())
    }

    /// Builds an envelope with a fresh id and the current UTC timestamp,
    /// admits it to the cache, adds self to the notified-set, and forwards
    /// to every discovered peer not already notified. Does NOT publish to
    /// local subscribers — the originator already holds the payload (spec
    /// §4.7, and the Open Question decision in DESIGN.md). Returns the
    /// number of peers the endpoint accepted for send.
    pub async fn originate(&self, payload: P) -> Result<usize, GossipError> {
        if self.state() == NodeState::Closed {
            return Err(GossipError::Lifecycle("node is closed".into()));
        }
        let mut envelope = Envelope::originate(payload);
        envelope.mark_notified(self.shared.self_peer.clone());
        if !self.shared.cache.try_admit(&envelope) {
            tracing::warn!(id = %envelope.id(), "originated id collided in cache; forwarding anyway");
        }
        Ok(forward(&self.shared, &envelope).await)
    }

    pub fn subscribe(&self) -> Subscription<P> {
        self.shared.hub.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.shared.hub.unsubscribe(id)
    }

    /// Live (non-expired) duplicate-suppression cache entries. Exposed for
    /// observability/testing, not part of the spec's external surface.
    pub fn cache_size(&self) -> usize {
        self.shared.cache.size()
    }

    pub fn self_identity(&self) -> &PeerIdentity {
        &self.shared.self_peer
    }
}

/// The single-worker receive/process/forward pipeline (spec §4.7).
async fn run_worker<P, C>(shared: Arc<Shared<P, C>>, mut stop_rx: oneshot::Receiver<()>)
where
    P: Clone + Send + Sync + 'static,
    C: Codec<P>,
{
    let mut sweep = tokio::time::interval(shared.sweep_interval);
    sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut consecutive_errors = 0u32;

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => {
                tracing::info!("stop requested; worker exiting");
                break;
            }
            _ = sweep.tick() => {
                shared.cache.sweep();
            }
            received = shared.endpoint.receive() => {
                match received {
                    Ok((bytes, from)) => {
                        consecutive_errors = 0;
                        process_datagram(&shared, bytes, from).await;
                    }
                    Err(GossipError::Closed) => {
                        tracing::info!("endpoint closed; worker exiting");
                        break;
                    }
                    Err(e) => {
                        consecutive_errors += 1;
                        tracing::warn!("receive error: {e}");
                        if consecutive_errors >= MAX_CONSECUTIVE_RECEIVE_ERRORS {
                            tracing::error!(
                                count = consecutive_errors,
                                "too many consecutive receive errors; stopping"
                            );
                            break;
                        }
                    }
                }
            }
        }
    }

    shared.hub.shutdown();
    *shared.state.lock().unwrap() = NodeState::Stopped;
    let _ = shared.stopped_tx.send(true);
}

async fn process_datagram<P, C>(shared: &Arc<Shared<P, C>>, bytes: Vec<u8>, from: PeerIdentity)
where
    P: Clone + Send + Sync + 'static,
    C: Codec<P>,
{
    let mut envelope = match shared.codec.decode(&bytes) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(%from, "decode error: {e}");
            return;
        }
    };

    if !shared.cache.try_admit(&envelope) {
        tracing::trace!(id = %envelope.id(), %from, "duplicate message dropped");
        return;
    }

    // Step 4: append self to the notified-set if not already present. This
    // mutation happens after admission so the cached copy reflects the
    // datagram as received; the published/forwarded copy carries self.
    envelope.mark_notified(shared.self_peer.clone());

    let item = Arc::new(envelope);
    shared.hub.publish(Arc::clone(&item));
    forward(shared, &item).await;
}

/// Enumerates discovery and sends the (already self-marked) envelope to
/// every candidate peer not yet in its notified-set. A peer syntactically
/// equal to self is always excluded (spec §4.7 tie-break). Per-peer
/// encode/send failures are logged and do not abort the cycle. Returns the
/// number of peers the endpoint accepted the send for.
async fn forward<P, C>(shared: &Arc<Shared<P, C>>, envelope: &Envelope<P>) -> usize
where
    C: Codec<P>,
{
    let discovery = Arc::clone(&shared.discovery);
    let peers = match tokio::task::spawn_blocking(move || discovery.enumerate()).await {
        Ok(Ok(peers)) => peers,
        Ok(Err(e)) => {
            tracing::warn!("discovery failed: {e}; treating as empty neighbour set this cycle");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!("discovery task failed: {e}");
            Vec::new()
        }
    };

    let mut accepted = 0usize;
    for peer in peers {
        if peer == shared.self_peer || envelope.is_notified(&peer) {
            continue;
        }
        let bytes = match shared.codec.encode(envelope) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(%peer, "encode failed while forwarding: {e}");
                continue;
            }
        };
        match shared.endpoint.send(&bytes, &peer.host, peer.port).await {
            Ok(_) => accepted += 1,
            Err(e) => tracing::warn!(%peer, "send failed: {e}"),
        }
    }
    accepted
}
