//! Example driving a session and the host convention over a mock device.
//!
//! Run with `cargo run --example mock_session`.

use stdaq_serial::host::HostSession;
use stdaq_serial::port::{MockPortOpener, MockSerialPort};
use stdaq_serial::session::SerialSession;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== stDAQ mock session ===\n");

    let opener = MockPortOpener::new();
    let mut port = MockSerialPort::new("COM9");
    port.set_loopback(true);
    opener.register(port.clone());

    // Typed session API
    let mut session = SerialSession::new(&opener);
    session.open("COM9")?;
    let written = session.write(b"vr")?;
    let mut buffer = [0u8; 8];
    let received = session.read(&mut buffer)?;
    println!("  session: wrote {written}, read back {:?}", &buffer[..received]);

    // A timed-out read is an empty success
    let received = session.read(&mut buffer)?;
    println!("  session: empty read returned {received}");
    session.close();
    println!("  live handles after close: {}", opener.live_handles());

    // Host integer convention
    let mut host = HostSession::new(SerialSession::new(&opener));
    println!("\n  host: open -> {}", host.open("COM9"));
    println!("  host: write [100, 15, 255] -> {}", host.write(&[100, 15, 255]));
    let read = host.read(3);
    println!("  host: read(3) -> {} {:?}", read.received, read.bytes);
    host.close();
    println!("  host: read after close -> {}", host.read(3).received);

    println!("\n=== Example complete ===");
    Ok(())
}
