//! Port allocation
//!
//! Finds a host port free for binding on localhost by scanning a bounded
//! range in ascending order. The probe actually binds the candidate port
//! and releases it immediately: a successful bind proves bindability (a
//! connect probe would report ports stuck in TIME_WAIT as free). The
//! result is a lease, not a reservation. Between the probe and the
//! consumer's own bind the port can be lost, and the consumer must surface
//! or retry that failure.

use log::{debug, info};
use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddrV4, TcpListener};

use crate::error::DeployError;

/// Scans `range_start..=range_end` for the first port that is not in
/// `excluded` and currently binds on 127.0.0.1.
///
/// First-fit: the lowest eligible port wins. Fails with `NoPortAvailable`
/// when every candidate is excluded or occupied.
pub fn find_free_port(
    range_start: u16,
    range_end: u16,
    excluded: &HashSet<u16>,
) -> Result<u16, DeployError> {
    for port in range_start..=range_end {
        if excluded.contains(&port) {
            continue;
        }

        let candidate = SocketAddrV4::new(Ipv4Addr::LOCALHOST, port);
        match TcpListener::bind(candidate) {
            Ok(listener) => {
                // Release immediately; the caller claims the port itself.
                drop(listener);
                info!("Allocated free port {}", port);
                return Ok(port);
            }
            Err(e) => {
                debug!("Port {} not bindable: {}", port, e);
            }
        }
    }

    Err(DeployError::NoPortAvailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupied_port() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[test]
    fn test_occupied_single_port_range_fails() {
        let (_guard, port) = occupied_port();
        assert!(matches!(
            find_free_port(port, port, &HashSet::new()),
            Err(DeployError::NoPortAvailable)
        ));
    }

    #[test]
    fn test_fully_excluded_range_fails() {
        let excluded: HashSet<u16> = (40000..=40004).collect();
        assert!(matches!(
            find_free_port(40000, 40004, &excluded),
            Err(DeployError::NoPortAvailable)
        ));
    }

    #[test]
    fn test_excluded_ports_never_returned() {
        let excluded: HashSet<u16> = [3000, 8090, 8453, 80, 443].into_iter().collect();
        let port = find_free_port(1024, 65535, &excluded).unwrap();
        assert!(!excluded.contains(&port));
        assert!((1024..=65535).contains(&port));
    }

    #[test]
    fn test_first_fit_returns_lowest_eligible() {
        // Find a port known free a moment ago; a single-port scan over it
        // must return exactly that port.
        let (listener, port) = occupied_port();
        drop(listener);
        assert_eq!(find_free_port(port, port, &HashSet::new()).unwrap(), port);
    }

    #[test]
    fn test_occupied_port_skipped_for_next_candidate() {
        let (_guard, port) = occupied_port();
        // Range starts at the occupied port; allocation must move past it.
        let allocated = find_free_port(port, port.saturating_add(50), &HashSet::new()).unwrap();
        assert_ne!(allocated, port);
        assert!(allocated > port);
    }
}
