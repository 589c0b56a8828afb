//! An ordered tier of peers, plus an optional link to a backup tier.

use std::sync::{Arc, Mutex};

use crate::clock::Clock;
use crate::peer::{Peer, PeerRuntime, PeerState};

/// One tier (primary or backup) of upstream peers.
///
/// Mutable per-peer counters live behind a single mutex covering the whole
/// pool (see §5 of the design notes): every `choose` sweep and every
/// `release` update takes this lock for its whole critical section and
/// never holds it across I/O, matching the commented-out
/// `ngx_lock_mutex`/`ngx_unlock_mutex` pairs in the reference source.
#[derive(Debug)]
pub struct PeerPool {
    pub name: String,
    pub(crate) peers: Vec<Peer>,
    pub(crate) runtime: Mutex<Vec<PeerRuntime>>,
    pub total_weight: u64,
    pub single: bool,
    pub weighted: bool,
    /// True when this pool was materialized from a one-shot dynamic
    /// resolution rather than a static server list; `set_session`/
    /// `save_session` are no-ops for such pools (there is no long-lived
    /// peer to cache a TLS session against).
    pub dynamic: bool,
    pub next: Option<Arc<PeerPool>>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl PeerPool {
    pub(crate) fn new(peers: Vec<Peer>, dynamic: bool, name: String, clock: Arc<dyn Clock>) -> Self {
        let total_weight: u64 = peers.iter().map(|p| p.weight as u64).sum();
        let single = peers.len() == 1;
        let weighted = total_weight != peers.len() as u64;
        let runtime = peers.iter().map(|p| PeerRuntime::fresh(p.weight)).collect();
        Self {
            name,
            peers,
            runtime: Mutex::new(runtime),
            total_weight,
            single,
            weighted,
            dynamic,
            next: None,
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn peer(&self, index: usize) -> &Peer {
        &self.peers[index]
    }

    /// Current derived eligibility state of peer `index`. For diagnostics
    /// and tests; `choose` re-derives this inline under the lock rather
    /// than calling this method, to avoid taking the mutex twice.
    pub fn peer_state(&self, index: usize) -> PeerState {
        let peer = &self.peers[index];
        if peer.down {
            return PeerState::Down;
        }
        let runtime = self.runtime.lock().unwrap();
        let rt = &runtime[index];
        let now = self.clock.now();
        if peer.max_fails > 0 && rt.fails >= peer.max_fails && now.saturating_sub(rt.checked) <= peer.fail_timeout {
            PeerState::Penalised
        } else {
            PeerState::Eligible
        }
    }
}
