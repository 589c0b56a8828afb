//! Host-facing, callback-shaped surface: `get`/`free`/`set_session`/
//! `save_session`. This is the thin adapter a connector calls instead of
//! using `Selector` directly; it writes the chosen address into a
//! `Connection` and folds `outcome_flags` into a `ReleaseOutcome`.

use std::net::SocketAddr;

use crate::attempt::AttemptState;
use crate::peer::SslSession;
use crate::selector::{ChooseResult, ReleaseOutcome, Selector};

/// Connection-scoped fields the selector writes into / reads session data
/// from. Real socket I/O is the caller's concern; this struct only carries
/// the bits the selector contract touches.
#[derive(Debug, Default, Clone)]
pub struct Connection {
    pub sockaddr: Option<SocketAddr>,
    pub name: Option<String>,
    pub cached: bool,
    pub ssl_session: Option<SslSession>,
}

/// Bit flags passed to `free`, mirroring the host runtime's
/// `NGX_PEER_FAILED` / `NGX_PEER_KEEPALIVE` / `NGX_PEER_NEXT`. Only
/// `failed` affects this core; the others are accepted and ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct OutcomeFlags {
    pub failed: bool,
    pub keepalive: bool,
    pub next: bool,
}

impl OutcomeFlags {
    pub fn failed() -> Self {
        Self {
            failed: true,
            ..Default::default()
        }
    }

    pub fn ok() -> Self {
        Self::default()
    }

    fn to_release_outcome(self) -> ReleaseOutcome {
        if self.failed {
            ReleaseOutcome::Failed
        } else if self.keepalive {
            ReleaseOutcome::Keepalive
        } else {
            ReleaseOutcome::Ok
        }
    }
}

/// Result returned to the host by `get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetResult {
    Ok,
    Busy,
}

/// Invoke `choose` and write the selected address into `conn`; on `Busy`,
/// stamp `conn.name` with the pool's display name so the caller can log
/// which upstream was exhausted.
pub fn get(conn: &mut Connection, state: &mut AttemptState) -> GetResult {
    conn.cached = false;

    match Selector::choose(state) {
        ChooseResult::Selected => {
            let peer = state.current_peer().expect("choose just selected a peer");
            conn.sockaddr = Some(peer.addr.sockaddr);
            conn.name = Some(peer.addr.name.clone());
            GetResult::Ok
        }
        ChooseResult::Busy => {
            conn.sockaddr = None;
            conn.name = Some(state.pool_name().to_string());
            GetResult::Busy
        }
    }
}

/// Invoke `release` with the outcome encoded in `outcome_flags`.
pub fn free(_conn: &Connection, state: &mut AttemptState, outcome_flags: OutcomeFlags) {
    Selector::release(state, outcome_flags.to_release_outcome());
}

/// Load the cached TLS session (if any) for the peer at `state.current`
/// into `conn`. A no-op for pools built from a dynamic resolution.
pub fn set_session(conn: &mut Connection, state: &AttemptState) {
    let Some(idx) = state.current else { return };
    if state.pool.dynamic {
        return;
    }
    let runtime = state.pool.runtime.lock().unwrap();
    if let Some(session) = runtime[idx].ssl_session.clone() {
        conn.cached = true;
        conn.ssl_session = Some(session);
    }
}

/// Store `session` as the cached TLS session for the peer at
/// `state.current`. A no-op for pools built from a dynamic resolution.
pub fn save_session(state: &AttemptState, session: SslSession) {
    let Some(idx) = state.current else { return };
    if state.pool.dynamic {
        return;
    }
    let mut runtime = state.pool.runtime.lock().unwrap();
    runtime[idx].ssl_session = Some(session);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{PoolBuilder, ServerConf};
    use crate::clock::{Clock, ManualClock};
    use std::sync::Arc;

    fn server(addr: &str, weight: u32, max_fails: u32, down: bool) -> ServerConf {
        ServerConf {
            addr: addr.to_string(),
            weight,
            max_fails,
            fail_timeout: 10,
            backup: false,
            down,
        }
    }

    #[test]
    fn get_happy_path_fills_connection() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let pool = PoolBuilder::build(&[server("127.0.0.1:1", 1, 1, false)], clock).unwrap();
        let mut state = Selector::init_attempt(pool);
        let mut conn = Connection::default();

        let res = get(&mut conn, &mut state);
        assert_eq!(res, GetResult::Ok);
        assert_eq!(conn.name.as_deref(), Some("127.0.0.1:1"));
        assert!(conn.sockaddr.is_some());
        assert!(!conn.cached);

        free(&conn, &mut state, OutcomeFlags::ok());
        assert_eq!(state.tries_remaining, 0);
    }

    #[test]
    fn get_busy_path_stamps_pool_name_and_clears_sockaddr() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let pool = PoolBuilder::build(&[server("127.0.0.1:1", 1, 1, true)], clock).unwrap();
        let mut state = Selector::init_attempt(pool);
        let mut conn = Connection::default();

        let res = get(&mut conn, &mut state);
        assert_eq!(res, GetResult::Busy);
        assert_eq!(conn.sockaddr, None);
        assert_eq!(conn.name.as_deref(), Some("127.0.0.1:1"));
    }

    #[test]
    fn session_round_trips_through_save_and_set() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let pool = PoolBuilder::build(&[server("127.0.0.1:1", 1, 1, false)], clock).unwrap();
        let mut state = Selector::init_attempt(pool);
        let mut conn = Connection::default();

        assert_eq!(get(&mut conn, &mut state), GetResult::Ok);

        let session: SslSession = vec![1, 2, 3, 4];
        save_session(&state, session.clone());

        let mut conn2 = Connection {
            sockaddr: conn.sockaddr,
            ..Default::default()
        };
        set_session(&mut conn2, &state);
        assert!(conn2.cached);
        assert_eq!(conn2.ssl_session, Some(session));
    }

    #[test]
    fn set_session_is_noop_without_a_stored_session() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let pool = PoolBuilder::build(&[server("127.0.0.1:1", 1, 1, false)], clock).unwrap();
        let mut state = Selector::init_attempt(pool);
        let mut conn = Connection::default();
        assert_eq!(get(&mut conn, &mut state), GetResult::Ok);

        set_session(&mut conn, &state);
        assert!(!conn.cached);
        assert_eq!(conn.ssl_session, None);
    }
}
