//! Converts a parsed configuration (list of servers with addresses,
//! weights, flags) into one or two `PeerPool`s.

use std::net::ToSocketAddrs;
use std::sync::Arc;

use serde::Deserialize;

use crate::clock::Clock;
use crate::error::BuildError;
use crate::peer::{Peer, PeerAddr};
use crate::pool::PeerPool;

fn default_weight() -> u32 {
    1
}

fn default_max_fails() -> u32 {
    1
}

fn default_fail_timeout() -> u64 {
    10
}

/// One `[[server]]` entry: an address (which may itself resolve to several
/// socket addresses, expanded into one `Peer` each) plus the policy shared
/// by all of them.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConf {
    pub addr: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default = "default_max_fails")]
    pub max_fails: u32,
    #[serde(default = "default_fail_timeout")]
    pub fail_timeout: u64,
    #[serde(default)]
    pub backup: bool,
    #[serde(default)]
    pub down: bool,
}

impl ServerConf {
    fn resolve(&self) -> Result<Vec<Peer>, BuildError> {
        let resolved = self
            .addr
            .to_socket_addrs()
            .map_err(|e| BuildError::ResolveFailed(format!("{}: {}", self.addr, e)))?;

        let peers: Vec<Peer> = resolved
            .map(|sockaddr| Peer {
                addr: PeerAddr {
                    sockaddr,
                    name: self.addr.clone(),
                },
                weight: self.weight.max(1),
                max_fails: self.max_fails,
                fail_timeout: self.fail_timeout,
                down: self.down,
            })
            .collect();

        if peers.is_empty() {
            return Err(BuildError::ResolveFailed(format!("{}: no address resolved", self.addr)));
        }

        Ok(peers)
    }
}

/// Builds one or two `PeerPool`s (primary, and optionally backup) from a
/// server list or from a single dynamically-resolved host.
pub struct PoolBuilder;

impl PoolBuilder {
    /// Build from an explicit server list. Servers with `backup = true`
    /// are expanded into a second tier, linked from the primary pool's
    /// `next`. Fails with `BuildError::NoPeers` if no non-backup server
    /// remains after expansion.
    pub fn build(servers: &[ServerConf], clock: Arc<dyn Clock>) -> Result<Arc<PeerPool>, BuildError> {
        let mut primary_peers = Vec::new();
        let mut backup_peers = Vec::new();

        for server in servers {
            let expanded = server.resolve()?;
            if server.backup {
                backup_peers.extend(expanded);
            } else {
                primary_peers.extend(expanded);
            }
        }

        if primary_peers.is_empty() {
            return Err(BuildError::NoPeers);
        }

        let name = servers
            .iter()
            .find(|s| !s.backup)
            .map(|s| s.addr.clone())
            .unwrap_or_default();

        let mut primary = PeerPool::new(primary_peers, false, name.clone(), clock.clone());

        if !backup_peers.is_empty() {
            let backup = PeerPool::new(backup_peers, false, format!("{name} (backup)"), clock);
            primary.next = Some(Arc::new(backup));
        }

        Ok(Arc::new(primary))
    }

    /// Build an implicit pool from a single dynamically-resolved host, as
    /// for `proxy_pass` to a bare hostname: all weights 1, `max_fails = 1`,
    /// `fail_timeout = 10s`, no backup tier.
    pub fn build_implicit(host: &str, port: u16, clock: Arc<dyn Clock>) -> Result<Arc<PeerPool>, BuildError> {
        if port == 0 {
            return Err(BuildError::NoPort);
        }

        let addr = format!("{host}:{port}");
        let resolved: Vec<_> = addr
            .to_socket_addrs()
            .map_err(|e| BuildError::ResolveFailed(format!("{addr}: {e}")))?
            .collect();

        if resolved.is_empty() {
            return Err(BuildError::ResolveFailed(format!("{addr}: no address resolved")));
        }

        let peers = resolved
            .into_iter()
            .map(|sockaddr| Peer {
                addr: PeerAddr {
                    sockaddr,
                    name: addr.clone(),
                },
                weight: 1,
                max_fails: 1,
                fail_timeout: 10,
                down: false,
            })
            .collect();

        Ok(Arc::new(PeerPool::new(peers, true, addr, clock)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn conf(addr: &str, weight: u32, backup: bool) -> ServerConf {
        ServerConf {
            addr: addr.to_string(),
            weight,
            max_fails: 1,
            fail_timeout: 10,
            backup,
            down: false,
        }
    }

    #[test]
    fn builds_primary_and_backup_tiers() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let servers = vec![
            conf("127.0.0.1:8001", 5, false),
            conf("127.0.0.1:8002", 1, false),
            conf("127.0.0.1:9001", 1, true),
        ];

        let pool = PoolBuilder::build(&servers, clock).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.total_weight, 6);
        assert!(pool.weighted);
        assert!(!pool.single);
        let backup = pool.next.as_ref().unwrap();
        assert_eq!(backup.len(), 1);
    }

    #[test]
    fn all_backup_servers_is_no_peers() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let servers = vec![conf("127.0.0.1:9001", 1, true)];
        let err = PoolBuilder::build(&servers, clock).unwrap_err();
        assert_eq!(err, BuildError::NoPeers);
    }

    #[test]
    fn unresolvable_address_fails_cleanly() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let servers = vec![conf("not a valid addr", 1, false)];
        let err = PoolBuilder::build(&servers, clock).unwrap_err();
        assert!(matches!(err, BuildError::ResolveFailed(_)));
    }

    #[test]
    fn implicit_pool_rejects_zero_port() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let err = PoolBuilder::build_implicit("127.0.0.1", 0, clock).unwrap_err();
        assert_eq!(err, BuildError::NoPort);
    }
}
