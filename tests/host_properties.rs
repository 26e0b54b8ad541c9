//! Property tests for the host integer convention.

mod common;

use common::loopback_host;
use proptest::prelude::*;
use stdaq_serial::host::{narrow, widen, READ_BUFFER_CAPACITY};

proptest! {
    #[test]
    fn widen_then_narrow_is_identity(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        prop_assert_eq!(narrow(&widen(&bytes)), bytes);
    }

    #[test]
    fn narrow_keeps_low_byte(values in proptest::collection::vec(any::<i32>(), 0..64)) {
        let narrowed = narrow(&values);
        for (value, byte) in values.iter().zip(narrowed) {
            prop_assert_eq!(i32::from(byte), value.rem_euclid(256));
        }
    }

    #[test]
    fn loopback_reproduces_written_values(
        values in proptest::collection::vec(0i32..=255, 1..=READ_BUFFER_CAPACITY)
    ) {
        let (mut host, _) = loopback_host("COM3");
        prop_assert_eq!(host.open("COM3"), 0);

        prop_assert_eq!(host.write(&values), values.len() as i32);
        let read = host.read(values.len() as i32);
        prop_assert_eq!(read.received, values.len() as i32);
        prop_assert_eq!(read.bytes, values);
    }
}

#[test]
fn every_byte_value_survives_loopback() {
    let (mut host, _) = loopback_host("COM3");
    assert_eq!(host.open("COM3"), 0);

    let all: Vec<i32> = (0..=255).collect();
    assert_eq!(host.write(&all), 256);

    let read = host.read(256);
    assert_eq!(read.received, 256);
    assert_eq!(read.bytes, all);
}
