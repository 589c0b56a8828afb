//! A single upstream endpoint and its runtime counters.

use std::fmt::{self, Display, Formatter};
use std::net::SocketAddr;

/// Opaque cached TLS session handle. Contents are never inspected here;
/// they are carried for the host runtime's `set_session`/`save_session`
/// hooks (see `crate::conn`).
pub type SslSession = Vec<u8>;

/// Address identity of a peer: immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAddr {
    pub sockaddr: SocketAddr,
    pub name: String,
}

impl Display for PeerAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Derived (not stored) eligibility state of a peer, for diagnostics and
/// tests. See `PeerPool::peer_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Eligible,
    Penalised,
    Down,
}

/// Static, immutable-after-build configuration of one peer.
#[derive(Debug, Clone)]
pub struct Peer {
    pub addr: PeerAddr,
    pub weight: u32,
    pub max_fails: u32,
    pub fail_timeout: u64,
    pub down: bool,
}

/// Mutable runtime counters for one peer, guarded by the owning pool's
/// single mutex (see `crate::pool::PeerPool`).
#[derive(Debug, Clone, Default)]
pub(crate) struct PeerRuntime {
    pub effective_weight: i64,
    pub current_weight: i64,
    pub fails: u32,
    pub accessed: u64,
    pub checked: u64,
    pub ssl_session: Option<SslSession>,
}

impl PeerRuntime {
    pub fn fresh(weight: u32) -> Self {
        Self {
            effective_weight: weight as i64,
            current_weight: 0,
            fails: 0,
            accessed: 0,
            checked: 0,
            ssl_session: None,
        }
    }
}
