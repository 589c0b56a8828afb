//! Weighted smooth round-robin peer selection for a reverse-proxy upstream.
//!
//! The core algorithm (`Selector`) is nginx's smooth weighted round-robin:
//! each call to `choose` gives every live peer a boost proportional to its
//! effective weight, picks the peer with the largest accumulator, then
//! debits it by the total handed out. Failures temporarily reduce a peer's
//! effective weight and, past a configured threshold, put it in a penalty
//! window; exhausting a pool fails over to an optional backup tier.

pub mod attempt;
pub mod bitset;
pub mod builder;
pub mod clock;
pub mod conn;
pub mod error;
pub mod peer;
pub mod pool;
pub mod selector;

pub use attempt::AttemptState;
pub use builder::{PoolBuilder, ServerConf};
pub use clock::{Clock, ManualClock, SystemClock};
pub use conn::{free, get, save_session, set_session, Connection, GetResult, OutcomeFlags};
pub use error::BuildError;
pub use peer::{Peer, PeerAddr, PeerState, SslSession};
pub use pool::PeerPool;
pub use selector::{ChooseResult, PeerSelector, ReleaseOutcome, Selector};
