// src/io/serial/mod.rs
//
// Physical serial port plumbing on top of the `serialport` crate.
//
// - `PortIo` is the narrow byte interface the transport needs from a device
// - `SystemPortOpener` opens real ports with a short read timeout
// - `list_serial_ports` enumerates what the OS offers

#[cfg(test)]
pub(crate) mod mock;
mod ports;

pub use ports::{list_serial_ports, port_needs_selection, ports_for_picker, SerialPortInfo};

use std::io::{self, Read, Write};
use std::time::Duration;

/// Read timeout for physical ports. Kept well under one poll tick so a read
/// that races with the OS buffer never stalls the host loop.
pub const READ_TIMEOUT: Duration = Duration::from_millis(5);

/// Largest chunk pulled from the OS in one poll tick.
pub const MAX_READ_CHUNK: usize = 4096;

/// Byte-level access to an open device.
pub trait PortIo {
    /// Bytes currently buffered by the OS, without blocking.
    fn bytes_to_read(&mut self) -> io::Result<usize>;

    /// Read into `buf`, bounded by the port's read timeout.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write and flush all of `data`.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;
}

/// Opens a device by name. Swappable so tests can stand in for hardware.
pub trait PortOpener {
    fn open(&self, port: &str, baud: u32) -> Result<Box<dyn PortIo>, String>;
}

/// Opens real ports through the OS.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemPortOpener;

impl PortOpener for SystemPortOpener {
    fn open(&self, port: &str, baud: u32) -> Result<Box<dyn PortIo>, String> {
        let handle = serialport::new(port, baud)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| e.to_string())?;
        Ok(Box::new(SystemPort(handle)))
    }
}

/// `PortIo` over a `serialport` handle.
struct SystemPort(Box<dyn serialport::SerialPort>);

impl PortIo for SystemPort {
    fn bytes_to_read(&mut self) -> io::Result<usize> {
        self.0
            .bytes_to_read()
            .map(|n| n as usize)
            .map_err(io::Error::from)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(&mut self.0, buf)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        Write::write_all(&mut self.0, data)?;
        Write::flush(&mut self.0)
    }
}
