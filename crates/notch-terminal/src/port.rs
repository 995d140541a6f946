//! Local port selection for the HTTP bridge backend.
//!
//! Probing binds each candidate on the loopback interface and immediately
//! releases it. That is best effort: another process can take the port
//! between the probe and the bridge binding it, so a bind failure at
//! launch is an ordinary error for the caller, not a bug here.

use std::collections::HashSet;
use std::net::{Ipv4Addr, TcpListener};
use std::sync::{Arc, Mutex, PoisonError};

/// Ports probed when the caller does not say otherwise.
pub const DEFAULT_PROBE_RANGE: u16 = 10;

/// First port in `[start, start + range_size)` that can be bound, or
/// `start` when none can.
pub fn find_available_port(start: u16, range_size: u16) -> u16 {
    candidates(start, range_size)
        .find(|&port| is_bindable(port))
        .unwrap_or(start)
}

/// Candidate ports, truncated at the top of the port space.
fn candidates(start: u16, range_size: u16) -> impl Iterator<Item = u16> {
    (0..range_size).map_while(move |offset| start.checked_add(offset))
}

fn is_bindable(port: u16) -> bool {
    TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_ok()
}

/// Hands out ports to sessions and remembers which are in use.
///
/// Clones share one lease table, so two bridge sessions in the same app
/// never receive the same port while both are alive, even if the first
/// bridge has not bound it yet.
#[derive(Debug, Clone, Default)]
pub struct PortAllocator {
    leased: Arc<Mutex<HashSet<u16>>>,
}

impl PortAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe like [`find_available_port`], skipping leased ports.
    ///
    /// Falls back to `start` when nothing in range is free. A fallback that
    /// collides with an existing lease is returned unowned, so dropping it
    /// does not free the other session's port.
    pub fn reserve(&self, start: u16, range_size: u16) -> PortLease {
        let mut leased = self.leased.lock().unwrap_or_else(PoisonError::into_inner);

        let found = candidates(start, range_size)
            .find(|port| !leased.contains(port) && is_bindable(*port));

        let port = match found {
            Some(port) => port,
            None => {
                tracing::warn!(start, range_size, "no free port in range, falling back to start");
                start
            }
        };

        let owned = leased.insert(port);
        if !owned {
            tracing::warn!(port, "fallback port is already leased to another session");
        }
        tracing::debug!(port, "port leased");

        PortLease {
            port,
            owned,
            leased: Arc::clone(&self.leased),
        }
    }

    pub fn is_leased(&self, port: u16) -> bool {
        self.leased
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&port)
    }

    pub fn leased_count(&self) -> usize {
        self.leased.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// A port held for one session; released back to the allocator on drop.
#[derive(Debug)]
pub struct PortLease {
    port: u16,
    owned: bool,
    leased: Arc<Mutex<HashSet<u16>>>,
}

impl PortLease {
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for PortLease {
    fn drop(&mut self) {
        if self.owned {
            self.leased
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.port);
            tracing::debug!(port = self.port, "port lease released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bind `count` consecutive loopback ports, or `None` if the OS handed
    /// out a base whose neighbours are taken.
    fn occupy_consecutive(count: u16) -> Option<(u16, Vec<TcpListener>)> {
        for _ in 0..20 {
            let first = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).ok()?;
            let base = first.local_addr().ok()?.port();
            if base.checked_add(count).is_none() {
                continue;
            }
            let mut held = vec![first];
            for offset in 1..count {
                match TcpListener::bind((Ipv4Addr::LOCALHOST, base + offset)) {
                    Ok(l) => held.push(l),
                    Err(_) => break,
                }
            }
            if held.len() == count as usize {
                return Some((base, held));
            }
        }
        None
    }

    #[test]
    fn result_is_within_probed_range() {
        let start = 41_000;
        let port = find_available_port(start, DEFAULT_PROBE_RANGE);
        assert!((start..start + DEFAULT_PROBE_RANGE).contains(&port));
    }

    #[test]
    fn all_occupied_returns_start() {
        let Some((base, _held)) = occupy_consecutive(3) else {
            return;
        };
        assert_eq!(find_available_port(base, 3), base);
    }

    #[test]
    fn skips_occupied_prefix() {
        let Some((base, mut held)) = occupy_consecutive(2) else {
            return;
        };
        // Free the second port again; only the first stays occupied.
        drop(held.pop());
        let port = find_available_port(base, 2);
        assert_eq!(port, base + 1);
    }

    #[test]
    fn zero_range_returns_start() {
        assert_eq!(find_available_port(5_000, 0), 5_000);
    }

    #[test]
    fn range_is_truncated_at_port_space_end() {
        let ports: Vec<u16> = candidates(65_534, 10).collect();
        assert_eq!(ports, vec![65_534, 65_535]);
    }

    #[test]
    fn allocator_never_hands_out_a_live_lease_twice() {
        let allocator = PortAllocator::new();
        let a = allocator.reserve(42_100, DEFAULT_PROBE_RANGE);
        let b = allocator.reserve(42_100, DEFAULT_PROBE_RANGE);
        assert_ne!(a.port(), b.port());
        assert!(allocator.is_leased(a.port()));
        assert!(allocator.is_leased(b.port()));
        assert_eq!(allocator.leased_count(), 2);
    }

    #[test]
    fn dropping_lease_frees_port() {
        let allocator = PortAllocator::new();
        let lease = allocator.reserve(42_200, DEFAULT_PROBE_RANGE);
        let port = lease.port();
        drop(lease);
        assert!(!allocator.is_leased(port));

        let again = allocator.reserve(42_200, DEFAULT_PROBE_RANGE);
        assert_eq!(again.port(), port);
    }

    #[test]
    fn colliding_fallback_does_not_release_original() {
        let allocator = PortAllocator::new();
        let first = allocator.reserve(42_300, 1);
        let fallback = allocator.reserve(42_300, 1);
        assert_eq!(fallback.port(), first.port());
        drop(fallback);
        assert!(allocator.is_leased(first.port()));
    }
}
