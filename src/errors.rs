use thiserror::Error;

pub type Result<T> = std::result::Result<T, TelemetryError>;

// The main telemetry error type. Every fallible operation in this
// crate returns one of these to its immediate caller, nothing is
// swallowed or logged in place of being returned.
#[derive(Debug, Error)]
pub enum TelemetryError {
    // The requested name is not a known property. This is a caller
    // error, retrying the same name cannot succeed
    #[error("property \"{name}\" not found")]
    PropertyNotFound { name: String },

    // The native call reported a non success status code. The message
    // is the one the native library associates with the code
    #[error("native accessor failed: {message}")]
    AccessorFailed { message: String },

    // A text accessor reported success but produced a zero length
    // string, which no text property is ever expected to do
    #[error("text property accessor returned an empty string")]
    EmptyResult,

    #[error("no devices found on the system")]
    NoDevicesFound,

    // A device handle lookup failed mid enumeration
    #[error("device enumeration failed at index {index}: {message}")]
    EnumerationFailed { index: u32, message: String },
}
