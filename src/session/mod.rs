//! Serial session: lifecycle and blocking transport for one port.
//!
//! A `SerialSession` is either Closed or Open. `open` acquires a device,
//! flushes it and installs the fixed line configuration; `read` and
//! `write` each issue exactly one timeout-bounded transport call; `close`
//! (or dropping the session) releases the handle.
//!
//! ```text
//! Closed ──open ok──> Open ──close──> Closed
//!   ^                  │
//!   └──── open err ────┘   (a failed open always ends Closed)
//! ```

mod error;

pub use error::{OpenError, ReadError, WriteError};

use crate::port::{PortConfiguration, PortOpener, SerialPortAdapter, SystemPortOpener};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// What `open` does with a session that is already Open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReopenPolicy {
    /// Release the previous handle, then acquire the new device.
    #[default]
    CloseThenReplace,
    /// Abandon the previous handle without releasing it. Only for scripts
    /// that depend on the old binding keeping the device locked.
    LeakPrevious,
}

impl FromStr for ReopenPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "close_then_replace" => Ok(Self::CloseThenReplace),
            "leak_previous" => Ok(Self::LeakPrevious),
            other => Err(format!(
                "unknown reopen policy '{other}' (expected close_then_replace or leak_previous)"
            )),
        }
    }
}

/// Snapshot of a session for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "PascalCase")]
pub enum SessionStatus {
    Closed,
    Open {
        device: String,
        bytes_read_total: u64,
        bytes_written_total: u64,
        open_duration_ms: u64,
    },
}

struct OpenPort {
    port: Box<dyn SerialPortAdapter>,
    device: String,
    bytes_read_total: u64,
    bytes_written_total: u64,
    opened_at: Instant,
}

#[derive(Default)]
enum SessionState {
    #[default]
    Closed,
    Open(OpenPort),
}

/// One serial connection and the opener used to (re)acquire it.
pub struct SerialSession<O: PortOpener = SystemPortOpener> {
    opener: O,
    config: PortConfiguration,
    policy: ReopenPolicy,
    state: SessionState,
}

impl Default for SerialSession<SystemPortOpener> {
    fn default() -> Self {
        Self::new(SystemPortOpener)
    }
}

impl<O: PortOpener> SerialSession<O> {
    /// A Closed session that will open devices through `opener`.
    pub fn new(opener: O) -> Self {
        Self {
            opener,
            config: PortConfiguration::default(),
            policy: ReopenPolicy::default(),
            state: SessionState::Closed,
        }
    }

    /// Set the re-open behaviour.
    pub fn with_policy(mut self, policy: ReopenPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ReopenPolicy {
        self.policy
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// The line configuration installed on every open.
    pub fn configuration(&self) -> &PortConfiguration {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open(_))
    }

    /// Name of the open device, if any.
    pub fn device(&self) -> Option<&str> {
        match &self.state {
            SessionState::Open(open) => Some(open.device.as_str()),
            SessionState::Closed => None,
        }
    }

    /// Open `device`, replacing any current session per the reopen policy.
    ///
    /// On failure the session is Closed and nothing acquired during this
    /// call is still held.
    pub fn open(&mut self, device: &str) -> Result<(), OpenError> {
        if let SessionState::Open(previous) = std::mem::take(&mut self.state) {
            match self.policy {
                ReopenPolicy::CloseThenReplace => {
                    info!(previous = %previous.device, device, "releasing previous serial session");
                    drop(previous);
                }
                ReopenPolicy::LeakPrevious => {
                    warn!(previous = %previous.device, device, "abandoning previous serial handle");
                    std::mem::forget(previous);
                }
            }
        }

        let port = self.acquire(device)?;
        info!(device, baud = self.config.baud_rate, "serial session opened");

        self.state = SessionState::Open(OpenPort {
            port,
            device: device.to_string(),
            bytes_read_total: 0,
            bytes_written_total: 0,
            opened_at: Instant::now(),
        });
        Ok(())
    }

    fn acquire(&self, device: &str) -> Result<Box<dyn SerialPortAdapter>, OpenError> {
        let mut port = self
            .opener
            .open_port(device, &self.config)
            .map_err(|source| {
                error!(context = device, error = %source, "failed to acquire serial device");
                OpenError::DeviceUnavailable {
                    device: device.to_string(),
                    source,
                }
            })?;

        // Early returns below drop `port`, releasing the handle.
        port.clear_buffers().map_err(|source| {
            error!(context = "Failed to flush serial port", device, error = %source);
            OpenError::FlushFailed {
                device: device.to_string(),
                source,
            }
        })?;

        port.apply_configuration(&self.config).map_err(|source| {
            error!(context = "Failed to set serial settings", device, error = %source);
            OpenError::ConfigFailed {
                device: device.to_string(),
                source,
            }
        })?;

        Ok(port)
    }

    /// Issue one read of at most `buffer.len()` bytes.
    ///
    /// Returns as soon as any bytes arrive or the timeout elapses; a
    /// timeout with nothing received is `Ok(0)`. Short reads are not
    /// retried.
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<usize, ReadError> {
        let SessionState::Open(open) = &mut self.state else {
            return Err(ReadError::NotOpen);
        };
        if buffer.is_empty() {
            return Ok(0);
        }

        match open.port.read_bytes(buffer) {
            Ok(n) => {
                open.bytes_read_total += n as u64;
                trace!(device = %open.device, received = n, "read");
                Ok(n)
            }
            Err(e) if e.is_timeout() => {
                trace!(device = %open.device, "read timed out with no data");
                Ok(0)
            }
            Err(source) => {
                error!(context = "Failed to read from port", device = %open.device, error = %source);
                Err(ReadError::IoFailure(source))
            }
        }
    }

    /// Issue one write of all of `data`.
    ///
    /// Succeeds only if the transport reports the full length written;
    /// the remainder of a short write is not retried.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        let SessionState::Open(open) = &mut self.state else {
            return Err(WriteError::NotOpen);
        };
        if data.is_empty() {
            return Ok(0);
        }

        let requested = data.len();
        let written = match open.port.write_bytes(data) {
            Ok(n) => n,
            Err(e) if e.is_timeout() => 0,
            Err(source) => {
                error!(context = "Failed to write to port", device = %open.device, error = %source);
                return Err(WriteError::IoFailure(source));
            }
        };
        open.bytes_written_total += written as u64;

        if written != requested {
            error!(
                context = "Failed to write all bytes to port",
                device = %open.device,
                written,
                requested
            );
            return Err(WriteError::PartialWrite { written, requested });
        }

        trace!(device = %open.device, written, "write");
        Ok(written)
    }

    /// Release the handle. Closing a Closed session does nothing.
    pub fn close(&mut self) {
        match std::mem::take(&mut self.state) {
            SessionState::Open(open) => {
                info!(device = %open.device, "serial session closed");
                drop(open);
            }
            SessionState::Closed => debug!("close requested with no open serial session"),
        }
    }

    pub fn status(&self) -> SessionStatus {
        match &self.state {
            SessionState::Closed => SessionStatus::Closed,
            SessionState::Open(open) => SessionStatus::Open {
                device: open.device.clone(),
                bytes_read_total: open.bytes_read_total,
                bytes_written_total: open.bytes_written_total,
                open_duration_ms: open.opened_at.elapsed().as_millis() as u64,
            },
        }
    }
}

impl<O: PortOpener> std::fmt::Debug for SerialSession<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSession")
            .field("device", &self.device())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{MockPortOpener, MockSerialPort};

    fn session_with(device: &str) -> (SerialSession<MockPortOpener>, MockSerialPort) {
        let opener = MockPortOpener::new();
        opener.register(MockSerialPort::new(device));
        let port = opener.device(device).unwrap();
        (SerialSession::new(opener), port)
    }

    #[test]
    fn test_new_session_is_closed() {
        let (session, _) = session_with("COM3");
        assert!(!session.is_open());
        assert_eq!(session.device(), None);
        assert_eq!(session.status(), SessionStatus::Closed);
        assert_eq!(session.policy(), ReopenPolicy::CloseThenReplace);
    }

    #[test]
    fn test_open_flushes_and_configures() {
        let (mut session, mut port) = session_with("COM3");
        port.enqueue_read(b"stale bytes");

        session.open("COM3").unwrap();

        assert!(session.is_open());
        assert_eq!(session.device(), Some("COM3"));
        assert!(port.was_cleared());
        assert_eq!(port.available_bytes(), 0);
        assert_eq!(port.applied_configuration(), Some(PortConfiguration::default()));
    }

    #[test]
    fn test_open_unknown_device() {
        let (mut session, _) = session_with("COM3");
        let err = session.open("COM4").unwrap_err();
        assert!(matches!(err, OpenError::DeviceUnavailable { .. }));
        assert!(!session.is_open());
    }

    #[test]
    fn test_flush_failure_releases_handle() {
        let (mut session, mut port) = session_with("COM3");
        port.set_fail_clear(true);

        let err = session.open("COM3").unwrap_err();
        assert!(matches!(err, OpenError::FlushFailed { .. }));
        assert!(!session.is_open());
        assert_eq!(session.opener().live_handles(), 0);
    }

    #[test]
    fn test_config_failure_releases_handle() {
        let (mut session, mut port) = session_with("COM3");
        port.set_fail_configure(true);

        let err = session.open("COM3").unwrap_err();
        assert!(matches!(err, OpenError::ConfigFailed { .. }));
        assert_eq!(session.opener().live_handles(), 0);
    }

    #[test]
    fn test_read_write_require_open() {
        let (mut session, _) = session_with("COM3");
        let mut buffer = [0u8; 4];
        assert!(matches!(session.read(&mut buffer), Err(ReadError::NotOpen)));
        assert!(matches!(session.write(b"vn"), Err(WriteError::NotOpen)));
    }

    #[test]
    fn test_read_timeout_is_zero() {
        let (mut session, port) = session_with("COM3");
        session.open("COM3").unwrap();

        let mut buffer = [0u8; 16];
        assert_eq!(session.read(&mut buffer).unwrap(), 0);
        assert_eq!(port.read_calls(), 1);
    }

    #[test]
    fn test_short_read_not_retried() {
        let (mut session, mut port) = session_with("COM3");
        session.open("COM3").unwrap();
        port.enqueue_read(&[7, 8]);

        let mut buffer = [0u8; 16];
        assert_eq!(session.read(&mut buffer).unwrap(), 2);
        assert_eq!(&buffer[..2], &[7, 8]);
        assert_eq!(port.read_calls(), 1);
    }

    #[test]
    fn test_read_io_failure() {
        let (mut session, mut port) = session_with("COM3");
        session.open("COM3").unwrap();
        port.fail_next_read();

        let mut buffer = [0u8; 4];
        assert!(matches!(
            session.read(&mut buffer),
            Err(ReadError::IoFailure(_))
        ));
        assert!(session.is_open());
    }

    #[test]
    fn test_partial_write() {
        let (mut session, mut port) = session_with("COM3");
        session.open("COM3").unwrap();
        port.set_write_limit(Some(1));

        let err = session.write(&[100, 15, 255]).unwrap_err();
        assert!(matches!(
            err,
            WriteError::PartialWrite {
                written: 1,
                requested: 3
            }
        ));
    }

    #[test]
    fn test_write_timeout_is_partial_write_of_nothing() {
        let (mut session, mut port) = session_with("COM3");
        session.open("COM3").unwrap();
        port.fail_next_write_timeout();

        let err = session.write(&[100, 15, 255]).unwrap_err();
        assert!(matches!(
            err,
            WriteError::PartialWrite {
                written: 0,
                requested: 3
            }
        ));
        assert!(session.is_open());
        assert!(port.get_write_log().is_empty());
    }

    #[test]
    fn test_write_io_failure() {
        let (mut session, mut port) = session_with("COM3");
        session.open("COM3").unwrap();
        port.fail_next_write();

        assert!(matches!(
            session.write(b"de"),
            Err(WriteError::IoFailure(_))
        ));
    }

    #[test]
    fn test_empty_write_skips_transport() {
        let (mut session, port) = session_with("COM3");
        session.open("COM3").unwrap();

        assert_eq!(session.write(&[]).unwrap(), 0);
        assert!(port.get_write_log().is_empty());
    }

    #[test]
    fn test_status_tracks_totals() {
        let (mut session, mut port) = session_with("COM3");
        port.set_loopback(true);
        session.open("COM3").unwrap();

        session.write(b"vr").unwrap();
        let mut buffer = [0u8; 8];
        session.read(&mut buffer).unwrap();

        match session.status() {
            SessionStatus::Open {
                device,
                bytes_read_total,
                bytes_written_total,
                ..
            } => {
                assert_eq!(device, "COM3");
                assert_eq!(bytes_read_total, 2);
                assert_eq!(bytes_written_total, 2);
            }
            SessionStatus::Closed => panic!("expected an open session"),
        }
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut session, _) = session_with("COM3");
        session.open("COM3").unwrap();

        session.close();
        session.close();
        assert!(!session.is_open());
        assert_eq!(session.opener().live_handles(), 0);
    }

    #[test]
    fn test_reopen_releases_previous() {
        let opener = MockPortOpener::new();
        opener.register(MockSerialPort::new("COM3"));
        opener.register(MockSerialPort::new("COM4"));
        let mut session = SerialSession::new(opener);

        session.open("COM3").unwrap();
        session.open("COM4").unwrap();

        assert_eq!(session.device(), Some("COM4"));
        assert_eq!(session.opener().live_handles(), 1);
    }

    #[test]
    fn test_reopen_leak_policy_keeps_previous_handle() {
        let opener = MockPortOpener::new();
        opener.register(MockSerialPort::new("COM3"));
        let mut session = SerialSession::new(opener).with_policy(ReopenPolicy::LeakPrevious);

        session.open("COM3").unwrap();
        session.open("COM3").unwrap();
        session.close();

        assert_eq!(session.opener().live_handles(), 1);
    }

    #[test]
    fn test_failed_reopen_ends_closed() {
        let (mut session, _) = session_with("COM3");
        session.open("COM3").unwrap();

        assert!(session.open("COM5").is_err());
        assert!(!session.is_open());
        assert_eq!(session.opener().live_handles(), 0);
    }

    #[test]
    fn test_drop_releases_handle() {
        let opener = MockPortOpener::new();
        opener.register(MockSerialPort::new("COM3"));
        {
            let mut session = SerialSession::new(&opener);
            session.open("COM3").unwrap();
            assert_eq!(opener.live_handles(), 1);
        }
        assert_eq!(opener.live_handles(), 0);
    }

    #[test]
    fn test_reopen_policy_parsing() {
        assert_eq!(
            "close_then_replace".parse::<ReopenPolicy>(),
            Ok(ReopenPolicy::CloseThenReplace)
        );
        assert_eq!(
            " Leak_Previous ".parse::<ReopenPolicy>(),
            Ok(ReopenPolicy::LeakPrevious)
        );
        assert!("leak".parse::<ReopenPolicy>().is_err());
    }
}
