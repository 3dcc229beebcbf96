// src/io/error.rs
//
// Typed errors for the transport layer.
// Every variant carries the port it concerns so status lines stay self-describing.

use thiserror::Error;

/// Transport failure taxonomy.
///
/// `Open` and `Read` are terminal for a transport instance; `Write` is
/// transient and leaves connectivity unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("failed to open {port}: {reason}")]
    Open { port: String, reason: String },

    #[error("read error on {port}: {reason}")]
    Read { port: String, reason: String },

    #[error("write error on {port}: {reason}")]
    Write { port: String, reason: String },

    #[error("{port} is not connected")]
    NotConnected { port: String },

    #[error("{port} is not a virtual transport")]
    NotVirtual { port: String },

    #[error("{port} is already held by another session")]
    PortBusy { port: String },
}

impl TransportError {
    pub fn open(port: &str, reason: impl Into<String>) -> Self {
        Self::Open {
            port: port.to_string(),
            reason: reason.into(),
        }
    }

    pub fn read(port: &str, reason: impl Into<String>) -> Self {
        Self::Read {
            port: port.to_string(),
            reason: reason.into(),
        }
    }

    pub fn write(port: &str, reason: impl Into<String>) -> Self {
        Self::Write {
            port: port.to_string(),
            reason: reason.into(),
        }
    }

    pub fn not_connected(port: &str) -> Self {
        Self::NotConnected {
            port: port.to_string(),
        }
    }

    pub fn not_virtual(port: &str) -> Self {
        Self::NotVirtual {
            port: port.to_string(),
        }
    }

    pub fn port_busy(port: &str) -> Self {
        Self::PortBusy {
            port: port.to_string(),
        }
    }

    /// Errors after which the transport can no longer carry traffic.
    /// A repeat sender hitting one of these stops instead of retrying.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, Self::Write { .. })
    }
}

impl From<TransportError> for String {
    fn from(e: TransportError) -> Self {
        e.to_string()
    }
}
