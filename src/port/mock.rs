//! Mock serial port implementation for testing.
//!
//! Provides a `MockSerialPort` that simulates a serial transport without
//! hardware, and a `MockPortOpener` that hands out handles to registered
//! mock devices while counting how many are still alive.

use super::error::PortError;
use super::traits::{PortConfiguration, PortOpener, SerialPortAdapter, STDAQ_TIMEOUT};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Inner state of the mock port, shared by every clone.
#[derive(Debug, Default)]
struct MockPortState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all bytes accepted by the port.
    write_log: Vec<Vec<u8>>,
    /// Written bytes are appended to the read queue.
    loopback: bool,
    /// Maximum bytes accepted per write call.
    write_limit: Option<usize>,
    /// Whether the next read fails with an I/O error.
    fail_next_read: bool,
    /// Whether the next write fails with an I/O error.
    fail_next_write: bool,
    /// Whether the next write times out with nothing sent.
    timeout_next_write: bool,
    /// Whether clearing buffers fails.
    fail_clear: bool,
    /// Whether applying a configuration fails.
    fail_configure: bool,
    /// Configuration most recently applied.
    applied: Option<PortConfiguration>,
    /// Whether buffers have been cleared.
    buffers_cleared: bool,
    /// Number of read calls issued.
    read_calls: usize,
}

/// Mock serial port implementation for testing.
///
/// This implementation allows you to:
/// - Enqueue data to be returned by read operations
/// - Echo written data back (loopback)
/// - Accept only part of a write
/// - Simulate I/O, write timeout, flush and configuration failures
///
/// An empty read queue behaves like a serial timeout.
///
/// # Example
/// ```
/// use stdaq_serial::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.set_loopback(true);
///
/// port.write_bytes(&[72, 105]).unwrap();
///
/// let mut buffer = [0u8; 8];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], &[72, 105]);
/// ```
pub struct MockSerialPort {
    /// The port name/identifier.
    name: String,
    /// The internal state, shared with clones.
    state: Arc<Mutex<MockPortState>>,
    /// Live-handle counter this clone decrements on drop.
    lease: Option<Arc<AtomicUsize>>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState::default())),
            lease: None,
        }
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    pub fn enqueue_read(&mut self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Echo every accepted write back into the read queue.
    pub fn set_loopback(&mut self, loopback: bool) {
        self.state.lock().loopback = loopback;
    }

    /// Accept at most `limit` bytes per write call.
    pub fn set_write_limit(&mut self, limit: Option<usize>) {
        self.state.lock().write_limit = limit;
    }

    /// Make the next read fail with an I/O error.
    pub fn fail_next_read(&mut self) {
        self.state.lock().fail_next_read = true;
    }

    /// Make the next write fail with an I/O error.
    pub fn fail_next_write(&mut self) {
        self.state.lock().fail_next_write = true;
    }

    /// Make the next write time out before any byte is accepted.
    pub fn fail_next_write_timeout(&mut self) {
        self.state.lock().timeout_next_write = true;
    }

    /// Make buffer clearing fail.
    pub fn set_fail_clear(&mut self, fail: bool) {
        self.state.lock().fail_clear = fail;
    }

    /// Make configuration fail.
    pub fn set_fail_configure(&mut self, fail: bool) {
        self.state.lock().fail_configure = fail;
    }

    /// Get a copy of all data written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Get whether buffers have been cleared.
    pub fn was_cleared(&self) -> bool {
        self.state.lock().buffers_cleared
    }

    /// The configuration most recently applied, if any.
    pub fn applied_configuration(&self) -> Option<PortConfiguration> {
        self.state.lock().applied.clone()
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    /// Number of read calls issued against this port.
    pub fn read_calls(&self) -> usize {
        self.state.lock().read_calls
    }

    /// A clone that counts as one live handle until dropped.
    fn leased(&self, live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self {
            name: self.name.clone(),
            state: Arc::clone(&self.state),
            lease: Some(Arc::clone(live)),
        }
    }
}

impl Clone for MockSerialPort {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            state: Arc::clone(&self.state),
            lease: None,
        }
    }
}

impl Drop for MockSerialPort {
    fn drop(&mut self) {
        if let Some(live) = self.lease.take() {
            live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();

        if state.fail_next_write {
            state.fail_next_write = false;
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "The device does not recognize the command.",
            )));
        }
        if state.timeout_next_write {
            state.timeout_next_write = false;
            return Err(PortError::timeout(configured_timeout(&state)));
        }

        let accepted = state.write_limit.map_or(data.len(), |n| n.min(data.len()));
        let chunk = &data[..accepted];
        state.write_log.push(chunk.to_vec());
        if state.loopback {
            state.read_queue.extend(chunk);
        }

        Ok(accepted)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        state.read_calls += 1;

        if state.fail_next_read {
            state.fail_next_read = false;
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "The I/O operation has been aborted.",
            )));
        }

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 && !buffer.is_empty() {
            return Err(PortError::timeout(configured_timeout(&state)));
        }

        Ok(bytes_read)
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if state.fail_clear {
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "The parameter is incorrect.",
            )));
        }
        state.read_queue.clear();
        state.buffers_cleared = true;
        Ok(())
    }

    fn apply_configuration(&mut self, config: &PortConfiguration) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if state.fail_configure {
            return Err(PortError::config("A device attached to the system is not functioning."));
        }
        state.applied = Some(config.clone());
        Ok(())
    }
}

fn configured_timeout(state: &MockPortState) -> Duration {
    state
        .applied
        .as_ref()
        .map_or(STDAQ_TIMEOUT, |c| c.timeout)
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

/// Opens registered mock devices and tracks live handles.
///
/// # Example
/// ```
/// use stdaq_serial::port::{MockPortOpener, MockSerialPort, PortConfiguration, PortOpener};
///
/// let opener = MockPortOpener::new();
/// opener.register(MockSerialPort::new("COM3"));
///
/// let handle = opener.open_port("COM3", &PortConfiguration::default()).unwrap();
/// assert_eq!(opener.live_handles(), 1);
/// drop(handle);
/// assert_eq!(opener.live_handles(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockPortOpener {
    devices: Arc<Mutex<HashMap<String, MockSerialPort>>>,
    live: Arc<AtomicUsize>,
    fail_open: Arc<Mutex<Option<String>>>,
}

impl MockPortOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `port` available under its name.
    pub fn register(&self, port: MockSerialPort) {
        self.devices.lock().insert(port.name.clone(), port);
    }

    /// Shared view of a registered device.
    pub fn device(&self, name: &str) -> Option<MockSerialPort> {
        self.devices.lock().get(name).cloned()
    }

    /// Make the next open fail with the given OS message.
    pub fn fail_next_open(&self, message: impl Into<String>) {
        *self.fail_open.lock() = Some(message.into());
    }

    /// Number of handles acquired and not yet dropped.
    pub fn live_handles(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl PortOpener for MockPortOpener {
    fn open_port(
        &self,
        device: &str,
        _config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        if let Some(message) = self.fail_open.lock().take() {
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                message,
            )));
        }

        let devices = self.devices.lock();
        let port = devices
            .get(device)
            .ok_or_else(|| PortError::not_found(device))?;
        Ok(Box::new(port.leased(&self.live)))
    }
}
