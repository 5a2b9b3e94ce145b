//! Expiring message cache — duplicate suppression with time-based expiry
//! (spec §4.5).
//!
//! Grounded on the `Arc<Mutex<HashMap<...>>>` shared-state idiom used
//! throughout the teacher's `node.rs` (its `roster`, `pending_inbound`, and
//! `pending_outbound` maps), generalized here to carry a per-entry
//! `expires_at` and a periodic sweep instead of being driven purely by
//! connection/task lifetimes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::envelope::Envelope;
use crate::error::GossipError;

struct CachedEntry<P> {
    envelope: Arc<Envelope<P>>,
    expires_at: Instant,
}

/// Bounded-lifetime set of recently observed message identifiers.
///
/// `tryAdmit`/`contains`/`lookup` are linearizable with respect to each
/// other: all three take the same internal mutex. Expiry is lazy — an
/// expired entry is treated as absent by every read, and is only physically
/// removed by `sweep()` (called periodically by the node runtime) or by a
/// subsequent `tryAdmit` for the same key.
pub struct ExpiringMessageCache<P> {
    ttl: Duration,
    entries: Mutex<HashMap<Uuid, CachedEntry<P>>>,
}

impl<P> ExpiringMessageCache<P> {
    /// `ttl` of zero is rejected — spec §4.5: "TTL of zero is rejected at
    /// construction."
    pub fn new(ttl: Duration) -> Result<Self, GossipError> {
        if ttl.is_zero() {
            return Err(GossipError::Config(
                "messageTtl must be greater than zero".into(),
            ));
        }
        Ok(Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        })
    }

    pub fn contains(&self, id: Uuid) -> bool {
        let now = Instant::now();
        let guard = self.entries.lock().unwrap();
        guard.get(&id).is_some_and(|e| e.expires_at > now)
    }

    /// Live entry for `id`, or `None` if absent or expired.
    pub fn lookup(&self, id: Uuid) -> Option<Arc<Envelope<P>>> {
        let now = Instant::now();
        let guard = self.entries.lock().unwrap();
        guard.get(&id).filter(|e| e.expires_at > now).map(|e| Arc::clone(&e.envelope))
    }

    /// Count of live (non-expired) entries.
    pub fn size(&self) -> usize {
        let now = Instant::now();
        let guard = self.entries.lock().unwrap();
        guard.values().filter(|e| e.expires_at > now).count()
    }

    /// Opportunistic cleanup of expired entries. Correctness never depends
    /// on sweep timeliness — only on the lazy-expiry checks above.
    pub fn sweep(&self) {
        let now = Instant::now();
        let mut guard = self.entries.lock().unwrap();
        guard.retain(|_, e| e.expires_at > now);
    }
}

impl<P: Clone> ExpiringMessageCache<P> {
    /// Returns `true` iff no live entry exists for `envelope.id()`; on
    /// `true`, installs a clone of `envelope` expiring `ttl` from now. On
    /// `false`, no state change — this is a compare-and-set.
    pub fn try_admit(&self, envelope: &Envelope<P>) -> bool {
        let now = Instant::now();
        let mut guard = self.entries.lock().unwrap();
        if let Some(existing) = guard.get(&envelope.id()) {
            if existing.expires_at > now {
                return false;
            }
        }
        guard.insert(
            envelope.id(),
            CachedEntry {
                envelope: Arc::new(envelope.clone()),
                expires_at: now + self.ttl,
            },
        );
        true
    }
}

/// How often the node runtime calls `sweep()` by default (spec §4.5: "once
/// per minute").
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
