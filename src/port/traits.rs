//! Core traits for serial port abstraction.
//!
//! Defines the `SerialPortAdapter` trait for an acquired handle and the
//! `PortOpener` trait that acquires one, so the session can run against a
//! real COM port or a simulated transport interchangeably.

use super::error::PortError;
use serialport::{DataBits, FlowControl, Parity, StopBits};
use std::time::Duration;

/// Baud rate the stDAQ firmware listens on.
pub const STDAQ_BAUD_RATE: u32 = 9600;

/// Per-call read/write timeout, with no per-byte multiplier.
pub const STDAQ_TIMEOUT: Duration = Duration::from_millis(1);

/// Line parameters installed on every opened port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfiguration {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Number of data bits.
    pub data_bits: DataBits,

    /// Flow control mode.
    pub flow_control: FlowControl,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Total read/write timeout per call.
    pub timeout: Duration,
}

impl Default for PortConfiguration {
    /// 9600 baud, 8N1, no flow control, 1 ms timeout.
    fn default() -> Self {
        Self {
            baud_rate: STDAQ_BAUD_RATE,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            timeout: STDAQ_TIMEOUT,
        }
    }
}

/// Trait for an acquired serial port handle.
///
/// Dropping the adapter releases the underlying OS handle.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes to the serial port in a single call.
    ///
    /// Returns the number of bytes the transport accepted, which may be
    /// fewer than `data.len()`.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Returns the number of bytes actually read. A read that waited the
    /// full timeout without data surfaces as a timeout error.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Discard any bytes in flight in either direction.
    fn clear_buffers(&mut self) -> Result<(), PortError>;

    /// Install timeouts and line parameters.
    fn apply_configuration(&mut self, config: &PortConfiguration) -> Result<(), PortError>;
}

/// Acquires exclusive access to a named serial device.
pub trait PortOpener {
    /// Open `device` and return the raw handle.
    ///
    /// Only acquisition happens here; flushing and configuration are
    /// performed afterwards through the returned adapter.
    fn open_port(
        &self,
        device: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError>;
}

impl<T: PortOpener + ?Sized> PortOpener for &T {
    fn open_port(
        &self,
        device: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        (**self).open_port(device, config)
    }
}
