//! Port abstraction layer for serial communication.
//!
//! Provides the traits the session is written against, the real
//! `serialport`-backed implementation, and a mock transport for tests.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::{MockPortOpener, MockSerialPort};
pub use sync_port::*;
pub use traits::*;
