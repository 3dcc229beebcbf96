// src/io/mod.rs
//
// Serial transport abstraction.
// One `Transport` type covers both a physical port (via the `serialport` crate)
// and a virtual loopback port, so the poll loop and the session never need to
// know whether hardware is attached.

mod error;
pub mod serial;
mod transport;

pub use error::TransportError;
pub use serial::{
    list_serial_ports, port_needs_selection, ports_for_picker, PortIo, PortOpener, SerialPortInfo,
    SystemPortOpener,
};
pub use transport::Transport;

/// Marker prepended to bytes a virtual transport echoes back.
pub const ECHO_PREFIX: &[u8] = b"[echo] ";

/// Connectivity of a transport instance.
///
/// `Connected -> Disconnected` is one-way: a transport never reconnects, the
/// session builds a new one instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportState {
    /// No hardware; writes come back as echo, input only via injection
    Virtual,
    /// Hardware open and healthy
    Connected,
    /// Hardware failed to open or failed later
    Disconnected(String),
}

/// Status notifications delivered to the display collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkStatus {
    Connected(String),
    Virtual,
    OpenFailed(String),
    Disconnected(String),
    WriteFailed(String),
    RepeatStopped(String),
    Closed,
}

impl LinkStatus {
    /// Whether this status reports a problem (rendered as an error by front ends).
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            LinkStatus::OpenFailed(_)
                | LinkStatus::Disconnected(_)
                | LinkStatus::WriteFailed(_)
                | LinkStatus::RepeatStopped(_)
        )
    }
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkStatus::Connected(port) => write!(f, "connected: {}", port),
            LinkStatus::Virtual => f.write_str("virtual"),
            LinkStatus::OpenFailed(reason) => write!(f, "open failed: {}", reason),
            LinkStatus::Disconnected(reason) => write!(f, "disconnected: {}", reason),
            LinkStatus::WriteFailed(reason) => write!(f, "write failed: {}", reason),
            LinkStatus::RepeatStopped(reason) => write!(f, "repeat stopped: {}", reason),
            LinkStatus::Closed => f.write_str("closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(
            LinkStatus::Disconnected("read error on COM3: gone".into()).to_string(),
            "disconnected: read error on COM3: gone"
        );
        assert_eq!(LinkStatus::Virtual.to_string(), "virtual");
        assert!(LinkStatus::WriteFailed("x".into()).is_error());
        assert!(!LinkStatus::Connected("COM3 @ 9600".into()).is_error());
    }
}
