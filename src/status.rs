use std::ffi::CStr;

use crate::errors::{Result, TelemetryError};
use crate::sys::{ErrorStringFn, RawStatus};

// Translate a native status code into a structured error. Success
// codes translate to Ok(()), anything else carries the message the
// native library associates with the code, or a fallback when the
// library has none.
pub fn translate(status: RawStatus, error_string: ErrorStringFn) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }

    let message = unsafe {
        let cmessage = error_string(status);

        if cmessage.is_null() {
            format!("unrecognized status code {}", status.0)
        } else {
            CStr::from_ptr(cmessage).to_string_lossy().into_owned()
        }
    };

    Err(TelemetryError::AccessorFailed { message })
}
