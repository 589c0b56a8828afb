//! Per-request selection scratch: the pool currently being searched, the
//! tried-index bitset, and the last chosen peer.

use std::sync::Arc;

use crate::bitset::TriedSet;
use crate::peer::Peer;
use crate::pool::PeerPool;

/// Created at request start, dropped at request completion. Never shared
/// across requests.
#[derive(Debug)]
pub struct AttemptState {
    pub(crate) pool: Arc<PeerPool>,
    pub(crate) tried: TriedSet,
    pub(crate) current: Option<usize>,
    pub tries_remaining: usize,
}

impl AttemptState {
    /// Peer most recently returned by `choose`, valid only between
    /// `choose` and `release`.
    pub fn current_peer(&self) -> Option<&Peer> {
        self.current.map(|i| self.pool.peer(i))
    }

    pub fn pool_name(&self) -> &str {
        &self.pool.name
    }

    /// Index of the peer most recently returned by `choose`, within the
    /// pool currently being searched (valid only between `choose` and
    /// `release`).
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }
}
