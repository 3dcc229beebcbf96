// src/io/transport.rs
//
// One transport instance per configured port. Opening never fails outright:
// a port that cannot be opened yields a transport that is already
// `Disconnected`, so the session can report it and carry on.

use std::io;

use super::serial::{PortIo, PortOpener, SystemPortOpener, MAX_READ_CHUNK};
use super::{TransportError, TransportState, ECHO_PREFIX};
use crate::config::Config;
use crate::port_tracker::PortLease;

pub struct Transport {
    port: String,
    baud: u32,
    state: TransportState,
    handle: Option<Box<dyn PortIo>>,
    lease: Option<PortLease>,
    closed: bool,
}

impl Transport {
    /// Open the port named in `config` through the OS.
    pub fn open(config: &Config) -> Transport {
        Self::open_with(config, &SystemPortOpener)
    }

    /// Open the port named in `config` through `opener`.
    pub fn open_with(config: &Config, opener: &dyn PortOpener) -> Transport {
        let mut transport = Transport {
            port: config.port.clone(),
            baud: config.baud,
            state: TransportState::Virtual,
            handle: None,
            lease: None,
            closed: false,
        };

        if config.is_virtual() {
            tlog!("[transport] Virtual port ready");
            return transport;
        }

        let lease = match PortLease::acquire(&config.port) {
            Ok(lease) => lease,
            Err(_) => {
                let err = TransportError::port_busy(&config.port);
                tlog!("[transport] {}", err);
                transport.state = TransportState::Disconnected(err.to_string());
                return transport;
            }
        };

        match opener.open(&config.port, config.baud) {
            Ok(handle) => {
                tlog!("[transport] Opened {} at {} baud", config.port, config.baud);
                transport.handle = Some(handle);
                transport.lease = Some(lease);
                transport.state = TransportState::Connected;
            }
            Err(reason) => {
                let err = TransportError::open(&config.port, reason);
                tlog!("[transport] {}", err);
                transport.state = TransportState::Disconnected(err.to_string());
            }
        }
        transport
    }

    pub fn state(&self) -> &TransportState {
        &self.state
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }

    pub fn is_virtual(&self) -> bool {
        self.state == TransportState::Virtual
    }

    pub fn is_connected(&self) -> bool {
        self.state == TransportState::Connected
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Reason the transport is down, if it is.
    pub fn failure(&self) -> Option<&str> {
        match &self.state {
            TransportState::Disconnected(reason) => Some(reason),
            _ => None,
        }
    }

    /// Drain whatever the OS has buffered, without blocking.
    ///
    /// Virtual transports always return nothing. A read failure moves the
    /// transport to `Disconnected` and drops the device handle.
    pub fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        if self.closed {
            return Err(TransportError::not_connected(&self.port));
        }
        let result = match (&self.state, self.handle.as_mut()) {
            (TransportState::Virtual, _) => return Ok(Vec::new()),
            (TransportState::Connected, Some(handle)) => read_buffered(handle.as_mut()),
            _ => return Err(TransportError::not_connected(&self.port)),
        };

        result.map_err(|e| {
            let err = TransportError::read(&self.port, e.to_string());
            self.fail(&err);
            err
        })
    }

    /// Send `data`.
    ///
    /// A virtual transport returns the echo (`[echo] ` + data) for the caller
    /// to deliver as received bytes; a connected one returns `None`. A failed
    /// physical write is reported but leaves the state alone.
    pub fn write(&mut self, data: &[u8]) -> Result<Option<Vec<u8>>, TransportError> {
        if self.closed {
            return Err(TransportError::not_connected(&self.port));
        }
        match &self.state {
            TransportState::Virtual => {
                let mut echo = Vec::with_capacity(ECHO_PREFIX.len() + data.len());
                echo.extend_from_slice(ECHO_PREFIX);
                echo.extend_from_slice(data);
                Ok(Some(echo))
            }
            TransportState::Connected => {
                let port = &self.port;
                let handle = self
                    .handle
                    .as_mut()
                    .ok_or_else(|| TransportError::not_connected(port))?;
                handle
                    .write_all(data)
                    .map_err(|e| TransportError::write(port, e.to_string()))?;
                Ok(None)
            }
            TransportState::Disconnected(_) => Err(TransportError::not_connected(&self.port)),
        }
    }

    /// Bytes a virtual transport delivers as if they had been received.
    pub fn inject_virtual(&self, text: &str) -> Result<Vec<u8>, TransportError> {
        if self.closed {
            return Err(TransportError::not_connected(&self.port));
        }
        if !self.is_virtual() {
            return Err(TransportError::not_virtual(&self.port));
        }
        Ok(text.as_bytes().to_vec())
    }

    /// Release the device. Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.handle = None;
        self.lease = None;
        if self.state == TransportState::Connected {
            self.state = TransportState::Disconnected("closed".to_string());
        }
        tlog!("[transport] Closed {}", self.port);
    }

    fn fail(&mut self, err: &TransportError) {
        tlog!("[transport] {}", err);
        self.handle = None;
        self.lease = None;
        self.state = TransportState::Disconnected(err.to_string());
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("port", &self.port)
            .field("baud", &self.baud)
            .field("state", &self.state)
            .field("closed", &self.closed)
            .finish()
    }
}

fn read_buffered(handle: &mut dyn PortIo) -> io::Result<Vec<u8>> {
    let waiting = handle.bytes_to_read()?;
    if waiting == 0 {
        return Ok(Vec::new());
    }
    let mut buf = vec![0u8; waiting.min(MAX_READ_CHUNK)];
    match handle.read(&mut buf) {
        // Bytes were reported waiting, so EOF means the device went away
        Ok(0) => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "port closed")),
        Ok(n) => {
            buf.truncate(n);
            Ok(buf)
        }
        Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}
