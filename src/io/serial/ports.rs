// src/io/serial/ports.rs
//
// Port discovery for the startup port picker.

use crate::config::VIRTUAL_PORT;

/// Information about an available serial port
#[derive(Clone, Debug, PartialEq)]
pub struct SerialPortInfo {
    pub port_name: String,
    pub port_type: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

impl SerialPortInfo {
    /// Entry for the virtual port, always offered alongside real devices.
    pub fn virtual_port() -> Self {
        Self {
            port_name: VIRTUAL_PORT.to_string(),
            port_type: "Virtual".to_string(),
            manufacturer: None,
            product: None,
            serial_number: None,
            vid: None,
            pid: None,
        }
    }

    /// One-line description for port pickers.
    pub fn describe(&self) -> String {
        match (&self.product, self.vid, self.pid) {
            (Some(product), Some(vid), Some(pid)) => format!(
                "{} ({}, {} {:04X}:{:04X})",
                self.port_name, self.port_type, product, vid, pid
            ),
            _ => format!("{} ({})", self.port_name, self.port_type),
        }
    }
}

/// List available serial ports, followed by the virtual port.
///
/// On macOS, filters out /dev/tty.* devices and only shows /dev/cu.* devices.
/// The cu (calling unit) devices are non-blocking and preferred for outgoing connections.
/// The tty (terminal) devices block on open waiting for carrier detect.
pub fn list_serial_ports() -> Result<Vec<SerialPortInfo>, String> {
    let ports =
        serialport::available_ports().map_err(|e| format!("Failed to enumerate ports: {}", e))?;

    let mut infos: Vec<SerialPortInfo> = ports
        .into_iter()
        .filter(|_p| {
            #[cfg(target_os = "macos")]
            {
                !_p.port_name.starts_with("/dev/tty.")
            }
            #[cfg(not(target_os = "macos"))]
            {
                true
            }
        })
        .map(|p| {
            let (port_type, manufacturer, product, serial_number, vid, pid) = match p.port_type {
                serialport::SerialPortType::UsbPort(info) => (
                    "USB".to_string(),
                    info.manufacturer,
                    info.product,
                    info.serial_number,
                    Some(info.vid),
                    Some(info.pid),
                ),
                serialport::SerialPortType::BluetoothPort => {
                    ("Bluetooth".to_string(), None, None, None, None, None)
                }
                serialport::SerialPortType::PciPort => {
                    ("PCI".to_string(), None, None, None, None, None)
                }
                serialport::SerialPortType::Unknown => {
                    ("Unknown".to_string(), None, None, None, None, None)
                }
            };
            SerialPortInfo {
                port_name: p.port_name,
                port_type,
                manufacturer,
                product,
                serial_number,
                vid,
                pid,
            }
        })
        .collect();

    infos.push(SerialPortInfo::virtual_port());
    Ok(infos)
}

/// Ports to offer a picker. When enumeration failed only the virtual port is
/// left.
pub fn ports_for_picker(listed: Result<Vec<SerialPortInfo>, String>) -> Vec<SerialPortInfo> {
    listed.unwrap_or_else(|e| {
        tlog!("[ports] {}", e);
        vec![SerialPortInfo::virtual_port()]
    })
}

/// Whether the front end has to ask for a port before a session can start:
/// the configured port is neither virtual nor among `available`.
pub fn port_needs_selection(configured: &str, available: &[SerialPortInfo]) -> bool {
    if configured == VIRTUAL_PORT {
        return false;
    }
    !available.iter().any(|p| p.port_name == configured)
}
