//! The algorithm surface: `init_attempt`, `choose`, `release`.
//!
//! Implements nginx-style smooth weighted round-robin with failure
//! damping and primary/backup tier failover.

use std::sync::Arc;

use crate::attempt::AttemptState;
use crate::bitset::TriedSet;
use crate::pool::PeerPool;

/// Outcome of a `release` call, reported by the caller after dialing the
/// peer `choose` returned. `Keepalive` is a hint and is treated as `Ok`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Ok,
    Failed,
    Keepalive,
}

/// Outcome of a `choose` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChooseResult {
    Selected,
    Busy,
}

/// Capability set a peer-selection policy must provide. `Selector`
/// (smooth weighted round-robin) is the only implementation here; the
/// trait exists so a hash- or least-connections-based policy could share
/// the same `AttemptState`/`PeerPool` plumbing without `Selector` growing
/// an inheritance hierarchy.
pub trait PeerSelector {
    fn init_attempt(pool: Arc<PeerPool>) -> AttemptState;
    fn choose(state: &mut AttemptState) -> ChooseResult;
    fn release(state: &mut AttemptState, outcome: ReleaseOutcome);
}

/// Stateless algorithm surface over `AttemptState`. All mutable state lives
/// in the `PeerPool` (shared, mutex-guarded) and the `AttemptState` (per
/// request); `Selector` itself carries nothing.
pub struct Selector;

impl PeerSelector for Selector {
    fn init_attempt(pool: Arc<PeerPool>) -> AttemptState {
        Selector::init_attempt(pool)
    }

    fn choose(state: &mut AttemptState) -> ChooseResult {
        Selector::choose(state)
    }

    fn release(state: &mut AttemptState, outcome: ReleaseOutcome) {
        Selector::release(state, outcome)
    }
}

impl Selector {
    /// Start a new request attempt against `pool`.
    pub fn init_attempt(pool: Arc<PeerPool>) -> AttemptState {
        let backup_len = pool.next.as_ref().map(|n| n.len()).unwrap_or(0);
        let capacity = pool.len().max(backup_len);
        let tries_remaining = pool.len();
        AttemptState {
            pool,
            tried: TriedSet::new(capacity),
            current: None,
            tries_remaining,
        }
    }

    /// Select the next peer to try, or report that every reachable tier is
    /// exhausted.
    pub fn choose(state: &mut AttemptState) -> ChooseResult {
        let selected = if state.pool.single {
            single_fast_path(&state.pool)
        } else {
            weighted_sweep(state)
        };

        match selected {
            Some(idx) => {
                state.tried.set(idx);
                state.current = Some(idx);

                // If this was the last primary try and a backup tier
                // exists, extend the caller's retry budget to cover it.
                if state.tries_remaining == 1 {
                    if let Some(next) = state.pool.next.clone() {
                        state.tries_remaining += next.len();
                    }
                }

                ChooseResult::Selected
            }
            None => failover(state),
        }
    }

    /// Report the outcome of dialing the peer returned by the most recent
    /// `choose`.
    pub fn release(state: &mut AttemptState, outcome: ReleaseOutcome) {
        if state.pool.single {
            state.tries_remaining = 0;
            return;
        }

        let Some(idx) = state.current else {
            debug_assert!(false, "release called without a prior choose");
            log::error!("[wrr] release called with no prior choose; ignoring");
            return;
        };

        let now = state.pool.clock.now();
        let peer = state.pool.peer(idx);

        {
            let mut runtime = state.pool.runtime.lock().unwrap();
            let rt = &mut runtime[idx];

            match outcome {
                ReleaseOutcome::Failed => {
                    rt.fails += 1;
                    rt.accessed = now;
                    rt.checked = now;

                    if peer.max_fails > 0 {
                        rt.effective_weight -= (peer.weight / peer.max_fails) as i64;
                    }
                    if rt.effective_weight < 0 {
                        rt.effective_weight = 0;
                    }

                    log::debug!(
                        "[wrr] peer '{}' failed: fails={} effective_weight={}",
                        peer.addr,
                        rt.fails,
                        rt.effective_weight
                    );
                }
                ReleaseOutcome::Ok | ReleaseOutcome::Keepalive => {
                    if rt.accessed < rt.checked {
                        rt.fails = 0;
                    }
                }
            }
        }

        if state.tries_remaining > 0 {
            state.tries_remaining -= 1;
        }
    }
}

fn single_fast_path(pool: &PeerPool) -> Option<usize> {
    if pool.peer(0).down {
        None
    } else {
        Some(0)
    }
}

/// The smooth weighted round-robin sweep: give every untried, eligible peer
/// a boost proportional to its effective weight, pick the largest
/// accumulator, then debit it by the sum handed out this call.
fn weighted_sweep(state: &AttemptState) -> Option<usize> {
    let pool = &state.pool;
    let now = pool.clock.now();

    let mut best: Option<(usize, i64)> = None;
    let mut total: i64 = 0;

    let mut runtime = pool.runtime.lock().unwrap();

    for i in 0..pool.len() {
        if state.tried.is_set(i) {
            continue;
        }

        let peer = pool.peer(i);
        if peer.down {
            continue;
        }

        if peer.max_fails > 0 {
            let rt = &runtime[i];
            if rt.fails >= peer.max_fails && now.saturating_sub(rt.checked) <= peer.fail_timeout {
                continue;
            }
        }

        let rt = &mut runtime[i];
        rt.current_weight += rt.effective_weight;
        total += rt.effective_weight;

        // Recovery happens in the same sweep that may be about to punish a
        // different peer below; preserved from the source as specified,
        // not smoothed out.
        if rt.effective_weight < peer.weight as i64 {
            rt.effective_weight += 1;
        }

        if best.is_none_or(|(_, bw)| rt.current_weight > bw) {
            best = Some((i, rt.current_weight));
        }
    }

    let (idx, _) = best?;
    let peer = pool.peer(idx);
    let rt = &mut runtime[idx];
    rt.current_weight -= total;
    if now.saturating_sub(rt.checked) > peer.fail_timeout {
        rt.checked = now;
    }

    Some(idx)
}

fn failover(state: &mut AttemptState) -> ChooseResult {
    if let Some(next) = state.pool.next.clone() {
        log::debug!(
            "[wrr] pool '{}' exhausted, trying backup servers '{}'",
            state.pool.name,
            next.name
        );
        state.tries_remaining = next.len();
        state.pool = next;
        state.tried.clear();
        return Selector::choose(state);
    }

    quick_recovery_reset(&state.pool);
    log::warn!(
        "[wrr] pool '{}' busy: all peers failed this request, fails reset for quick recovery",
        state.pool.name
    );
    ChooseResult::Busy
}

fn quick_recovery_reset(pool: &PeerPool) {
    let mut runtime = pool.runtime.lock().unwrap();
    for rt in runtime.iter_mut() {
        rt.fails = 0;
    }
}
