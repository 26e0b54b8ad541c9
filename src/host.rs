//! Host numeric calling convention.
//!
//! The scripting host passes every argument as an integer array, so bytes
//! are widened to `i32` on the way out and narrowed (wrapping) on the way
//! in. Results are integer status codes: `0` ok / `-1` error for `open`,
//! and a byte count or `-1` for `read` and `write`, which keeps a failed
//! call distinguishable from a read that simply timed out empty.

use crate::config::ConfigLoader;
use crate::logging;
use crate::port::{PortOpener, SystemPortOpener};
use crate::session::{ReopenPolicy, SerialSession};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Capacity of the reusable receive buffer.
pub const READ_BUFFER_CAPACITY: usize = 256;

/// Status code for a successful call.
pub const STATUS_OK: i32 = 0;

/// Status/count code for a failed call.
pub const STATUS_ERROR: i32 = -1;

/// Widen raw bytes to the host's integer representation.
pub fn widen(bytes: &[u8]) -> Vec<i32> {
    bytes.iter().map(|&b| i32::from(b)).collect()
}

/// Narrow host integers to bytes, keeping the low 8 bits of each value.
pub fn narrow(values: &[i32]) -> Vec<u8> {
    values.iter().map(|&v| v as u8).collect()
}

/// Outcome of a host-level read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRead {
    /// Bytes received, or `-1` if the read failed.
    pub received: i32,
    /// The received bytes, widened. Empty on failure.
    pub bytes: Vec<i32>,
}

/// A session driven through the host's integer convention.
pub struct HostSession<O: PortOpener = SystemPortOpener> {
    session: SerialSession<O>,
    scratch: [u8; READ_BUFFER_CAPACITY],
}

impl<O: PortOpener> HostSession<O> {
    pub fn new(session: SerialSession<O>) -> Self {
        Self {
            session,
            scratch: [0; READ_BUFFER_CAPACITY],
        }
    }

    pub fn session(&self) -> &SerialSession<O> {
        &self.session
    }

    /// Open `device`; `0` on success, `-1` on failure.
    pub fn open(&mut self, device: &str) -> i32 {
        match self.session.open(device) {
            Ok(()) => STATUS_OK,
            Err(_) => STATUS_ERROR,
        }
    }

    /// Reserved entry point, currently a no-op.
    pub fn set(&mut self) {}

    /// Read up to `max_length` bytes (clamped to `0..=256`).
    pub fn read(&mut self, max_length: i32) -> HostRead {
        match self.read_scratch(max_length) {
            Some(n) => HostRead {
                received: n as i32,
                bytes: widen(&self.scratch[..n]),
            },
            None => HostRead {
                received: STATUS_ERROR,
                bytes: Vec::new(),
            },
        }
    }

    /// Read into a caller-owned integer buffer.
    ///
    /// Only the first `received` slots are written; the rest are left as
    /// they were. `max_length` is further limited by `out.len()`.
    pub fn read_into(&mut self, max_length: i32, out: &mut [i32]) -> i32 {
        let max_length = max_length.min(i32::try_from(out.len()).unwrap_or(i32::MAX));
        match self.read_scratch(max_length) {
            Some(n) => {
                for (slot, &byte) in out.iter_mut().zip(&self.scratch[..n]) {
                    *slot = i32::from(byte);
                }
                n as i32
            }
            None => STATUS_ERROR,
        }
    }

    fn read_scratch(&mut self, max_length: i32) -> Option<usize> {
        let capped = clamp_length(max_length);
        self.session.read(&mut self.scratch[..capped]).ok()
    }

    /// Write `values` narrowed to bytes; the count written or `-1`.
    pub fn write(&mut self, values: &[i32]) -> i32 {
        let transmit = narrow(values);
        match self.session.write(&transmit) {
            Ok(n) => i32::try_from(n).unwrap_or(i32::MAX),
            Err(_) => STATUS_ERROR,
        }
    }

    pub fn close(&mut self) {
        self.session.close();
    }
}

fn clamp_length(max_length: i32) -> usize {
    let clamped = max_length.clamp(0, READ_BUFFER_CAPACITY as i32) as usize;
    if clamped as i64 != i64::from(max_length) {
        warn!(
            requested = max_length,
            capacity = READ_BUFFER_CAPACITY,
            "read length outside buffer capacity, clamped"
        );
    }
    clamped
}

/// Opener behind the process-wide session; unit tests swap in the mock
/// transport so the C entry points can run end to end.
#[cfg(not(test))]
pub type GlobalOpener = SystemPortOpener;
#[cfg(test)]
pub type GlobalOpener = crate::port::MockPortOpener;

static GLOBAL: Lazy<Mutex<HostSession<GlobalOpener>>> = Lazy::new(|| {
    let (config, load_error) = match ConfigLoader::load() {
        Ok(loader) => (loader.into_config(), None),
        Err(e) => (ConfigLoader::with_defaults().into_config(), Some(e)),
    };

    if let Err(e) = logging::init_logging(&config.logging) {
        debug!("logging already initialised: {}", e);
    }
    if let Some(e) = load_error {
        warn!("Failed to load config, using defaults: {}", e);
    }

    let policy: ReopenPolicy = config.serial.reopen_policy;
    Mutex::new(HostSession::new(
        SerialSession::new(GlobalOpener::default()).with_policy(policy),
    ))
});

/// The process-wide session used by the C entry points.
///
/// Built on first use from the resolved configuration; calls must be made
/// sequentially, the lock only keeps them from overlapping.
pub fn global() -> &'static Mutex<HostSession<GlobalOpener>> {
    &GLOBAL
}
