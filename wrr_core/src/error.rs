//! Construction-time error taxonomy.
//!
//! Runtime failures are never represented as `Error` values here: a dial
//! failure is reported through `Selector::release`, and pool exhaustion is
//! reported as `ChooseResult::Busy`. Only `PoolBuilder` can fail.

use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// No non-backup servers were configured.
    NoPeers,
    /// An implicit (dynamically-resolved) upstream was built with no port.
    NoPort,
    /// A server address string failed to resolve.
    ResolveFailed(String),
    /// Reserved for parity with the source's allocator-failure path.
    /// `Vec` allocation in this implementation aborts rather than
    /// returning an error, so this variant is never constructed; it is
    /// kept so downstream matches stay exhaustive if that ever changes.
    Alloc,
}

impl Display for BuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::NoPeers => write!(f, "no peers configured (all servers were marked backup)"),
            BuildError::NoPort => write!(f, "no port given for an implicit upstream"),
            BuildError::ResolveFailed(msg) => write!(f, "failed to resolve upstream address: {msg}"),
            BuildError::Alloc => write!(f, "allocation failed while building pool"),
        }
    }
}

impl std::error::Error for BuildError {}
