//! Shared test utilities for stdaq-serial tests.
//!
//! Builds sessions over simulated devices so the session contract can be
//! exercised without hardware.

#![allow(dead_code)]

use stdaq_serial::port::{MockPortOpener, MockSerialPort};
use stdaq_serial::session::SerialSession;
use stdaq_serial::HostSession;

/// Register a mock device and return the opener with a shared view of it.
pub fn opener_with_device(port_name: &str) -> (MockPortOpener, MockSerialPort) {
    let opener = MockPortOpener::new();
    opener.register(MockSerialPort::new(port_name));
    let port = opener
        .device(port_name)
        .expect("device was just registered");
    (opener, port)
}

/// A session whose device echoes every written byte back.
pub fn loopback_session(port_name: &str) -> (SerialSession<MockPortOpener>, MockSerialPort) {
    let (opener, mut port) = opener_with_device(port_name);
    port.set_loopback(true);
    (SerialSession::new(opener), port)
}

/// Host-convention wrapper over a loopback device.
pub fn loopback_host(port_name: &str) -> (HostSession<MockPortOpener>, MockSerialPort) {
    let (session, port) = loopback_session(port_name);
    (HostSession::new(session), port)
}
