// src/port_tracker.rs
//
// Process-wide table of physical ports currently held by a transport.
// A serial device is a single-handle resource: a second transport against the
// same port is refused until the first one closes.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::Mutex;

/// Ports with a live lease
static HELD_PORTS: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Exclusive claim on a physical port, released on drop.
#[derive(Debug)]
pub struct PortLease {
    port: String,
}

impl PortLease {
    /// Claim `port`. Fails with the holder-facing message when it is taken.
    pub fn acquire(port: &str) -> Result<PortLease, String> {
        let mut held = HELD_PORTS
            .lock()
            .map_err(|e| format!("Port table poisoned: {}", e))?;
        if !held.insert(port.to_string()) {
            return Err(format!(
                "Port '{}' is in use by another session. Close that session first.",
                port
            ));
        }
        tlog!("[port_tracker] Acquired '{}' (held: {})", port, held.len());
        Ok(PortLease {
            port: port.to_string(),
        })
    }

    pub fn port(&self) -> &str {
        &self.port
    }
}

impl Drop for PortLease {
    fn drop(&mut self) {
        if let Ok(mut held) = HELD_PORTS.lock() {
            if held.remove(&self.port) {
                tlog!("[port_tracker] Released '{}' (held: {})", self.port, held.len());
            }
        }
    }
}

/// Whether some transport currently holds `port`.
pub fn is_held(port: &str) -> bool {
    HELD_PORTS
        .lock()
        .map(|held| held.contains(port))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_lease_refused_until_release() {
        let port = "/dev/test-port-tracker-a";
        let lease = PortLease::acquire(port).unwrap();
        assert!(is_held(port));
        assert!(PortLease::acquire(port).is_err());

        drop(lease);
        assert!(!is_held(port));
        let again = PortLease::acquire(port).unwrap();
        assert_eq!(again.port(), port);
    }

    #[test]
    fn test_distinct_ports_independent() {
        let a = PortLease::acquire("/dev/test-port-tracker-b").unwrap();
        let b = PortLease::acquire("/dev/test-port-tracker-c").unwrap();
        assert_ne!(a.port(), b.port());
    }
}
