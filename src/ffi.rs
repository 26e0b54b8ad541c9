//! C entry points for the scripting host.
//!
//! Signatures follow the host's link convention: every argument is a
//! pointer, integers travel as `int`, and results are written through
//! output pointers. All calls go to the process-wide session in
//! [`crate::host::global`].

use crate::host::{self, READ_BUFFER_CAPACITY, STATUS_ERROR};
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use tracing::error;

/// Open the named serial device. Writes `0` or `-1` to `out`.
///
/// # Safety
///
/// `device` must be null or point to a NUL-terminated string. `out` must
/// be null or valid for one `int` write.
#[no_mangle]
pub unsafe extern "C" fn stdaq_open(device: *const c_char, out: *mut c_int) {
    let status = if device.is_null() {
        error!(context = "stdaq_open", "null device name");
        STATUS_ERROR
    } else {
        match unsafe { CStr::from_ptr(device) }.to_str() {
            Ok(name) => host::global().lock().open(name),
            Err(e) => {
                error!(context = "stdaq_open", error = %e, "device name is not valid UTF-8");
                STATUS_ERROR
            }
        }
    };

    if let Some(out) = unsafe { out.as_mut() } {
        *out = status;
    }
}

/// Reserved; does nothing.
#[no_mangle]
pub extern "C" fn stdaq_set() {
    host::global().lock().set();
}

/// Read up to `*length` bytes (at most 256) into `rx_buffer`.
///
/// Writes the count received, or `-1` on failure, to `received`. Slots of
/// `rx_buffer` past the received count are not touched.
///
/// # Safety
///
/// `length` must be null or valid for one `int` read. `rx_buffer` must be
/// valid for `min(*length, 256)` `int` writes. `received` must be null or
/// valid for one `int` write.
#[no_mangle]
pub unsafe extern "C" fn stdaq_read(
    length: *const c_int,
    rx_buffer: *mut c_int,
    received: *mut c_int,
) {
    let Some(received) = (unsafe { received.as_mut() }) else {
        return;
    };
    let Some(&length) = (unsafe { length.as_ref() }) else {
        *received = STATUS_ERROR;
        return;
    };
    if rx_buffer.is_null() {
        *received = STATUS_ERROR;
        return;
    }

    let capacity = length.clamp(0, READ_BUFFER_CAPACITY as c_int) as usize;
    let out = unsafe { std::slice::from_raw_parts_mut(rx_buffer, capacity) };
    *received = host::global().lock().read_into(length, out);
}

/// Write `*length` values from `tx_buffer`, each narrowed to a byte.
///
/// Writes the count written, or `-1` on failure, to `written`.
///
/// # Safety
///
/// `length` must be null or valid for one `int` read. `tx_buffer` must be
/// valid for `*length` `int` reads. `written` must be null or valid for
/// one `int` write.
#[no_mangle]
pub unsafe extern "C" fn stdaq_write(
    length: *const c_int,
    tx_buffer: *const c_int,
    written: *mut c_int,
) {
    let Some(written) = (unsafe { written.as_mut() }) else {
        return;
    };
    let Some(&length) = (unsafe { length.as_ref() }) else {
        *written = STATUS_ERROR;
        return;
    };
    if length < 0 || (length > 0 && tx_buffer.is_null()) {
        *written = STATUS_ERROR;
        return;
    }

    let values: &[c_int] = if length == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(tx_buffer, length as usize) }
    };
    *written = host::global().lock().write(values);
}

/// Close the serial device, if open.
#[no_mangle]
pub extern "C" fn stdaq_close() {
    host::global().lock().close();
}
