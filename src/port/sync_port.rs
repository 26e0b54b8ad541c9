//! Synchronous serial port implementation.
//!
//! Wraps the `serialport` crate's `SerialPort` trait with our own
//! `SerialPortAdapter`, and provides `SystemPortOpener` for acquiring
//! OS devices.

use super::error::PortError;
use super::traits::{PortConfiguration, PortOpener, SerialPortAdapter};
use serde::Serialize;
use std::io::{Read, Write};
use tracing::debug;

/// Synchronous serial port implementation wrapping `serialport::SerialPort`.
pub struct SyncSerialPort {
    /// The underlying serial port implementation.
    port: Box<dyn serialport::SerialPort>,
    /// The port name/path for identification.
    name: String,
}

impl SyncSerialPort {
    /// Acquire a serial device.
    ///
    /// # Arguments
    /// * `port_name` - The system path to the serial port (e.g., "/dev/ttyACM0" or "COM9")
    /// * `config` - Line parameters requested at open time
    ///
    /// # Example
    /// ```no_run
    /// use stdaq_serial::port::{PortConfiguration, SyncSerialPort};
    ///
    /// let port = SyncSerialPort::open("COM9", &PortConfiguration::default())?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(port_name: &str, config: &PortConfiguration) -> Result<Self, PortError> {
        let port = serialport::new(port_name, config.baud_rate)
            .data_bits(config.data_bits)
            .flow_control(config.flow_control)
            .parity(config.parity)
            .stop_bits(config.stop_bits)
            .timeout(config.timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => PortError::not_found(port_name),
                serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                    PortError::not_found(port_name)
                }
                serialport::ErrorKind::InvalidInput => PortError::config(e.to_string()),
                _ => PortError::Serial(e),
            })?;

        debug!(port = port_name, baud = config.baud_rate, "acquired serial device");

        Ok(Self {
            port,
            name: port_name.to_string(),
        })
    }
}

impl SerialPortAdapter for SyncSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.port.write(data).map_err(PortError::Io)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.port.read(buffer).map_err(PortError::Io)
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        self.port
            .clear(serialport::ClearBuffer::All)
            .map_err(PortError::Serial)
    }

    fn apply_configuration(&mut self, config: &PortConfiguration) -> Result<(), PortError> {
        self.port.set_timeout(config.timeout)?;
        self.port.set_baud_rate(config.baud_rate)?;
        self.port.set_data_bits(config.data_bits)?;
        self.port.set_parity(config.parity)?;
        self.port.set_stop_bits(config.stop_bits)?;
        self.port.set_flow_control(config.flow_control)?;
        Ok(())
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate().ok())
            .finish()
    }
}

/// Opens real OS serial devices.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPortOpener;

impl PortOpener for SystemPortOpener {
    fn open_port(
        &self,
        device: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        Ok(Box::new(SyncSerialPort::open(device, config)?))
    }
}

/// A serial device visible to the OS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailablePort {
    pub name: String,
    pub port_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

/// Enumerate the serial devices the OS currently reports.
pub fn list_ports() -> Result<Vec<AvailablePort>, PortError> {
    let ports = serialport::available_ports()?;
    Ok(ports.into_iter().map(available_port).collect())
}

fn available_port(info: serialport::SerialPortInfo) -> AvailablePort {
    let (port_type, product) = match info.port_type {
        serialport::SerialPortType::UsbPort(usb) => ("Usb".to_string(), usb.product),
        serialport::SerialPortType::BluetoothPort => ("Bluetooth".to_string(), None),
        serialport::SerialPortType::PciPort => ("Pci".to_string(), None),
        serialport::SerialPortType::Unknown => ("Unknown".to_string(), None),
    };

    AvailablePort {
        name: info.port_name,
        port_type,
        product,
    }
}
