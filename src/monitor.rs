use std::ffi::c_uint;
use std::ptr;

use tracing::{debug, info};

use crate::device::Device;
use crate::errors::{Result, TelemetryError};
use crate::registry::PropertyRegistry;
use crate::status;
use crate::sys::{NativeBindings, RawDeviceHandle, RawStatus};

// Monitoring context over one native capability set.
//
// The property registry is built here exactly once and never mutated
// afterwards, devices borrow the context for their whole lifetime.
// Every query is a blocking native call with no timeout, and this
// layer adds no synchronization of its own: concurrent use is exactly
// as safe as the native library makes it, no more.
pub struct Monitor {
    bindings: NativeBindings,
    registry: PropertyRegistry,
}

impl Monitor {
    // Create a monitoring context over an externally supplied native
    // capability set
    pub fn new(bindings: NativeBindings) -> Self {
        let registry = PropertyRegistry::new(&bindings);

        Self { bindings, registry }
    }

    // Create a monitoring context over the symbols of the linked
    // vendor library. The embedder must have initialized the library
    // before issuing the first query.
    #[cfg(feature = "nvml")]
    pub fn linked() -> Self {
        Self::new(NativeBindings::linked())
    }

    pub(crate) fn bindings(&self) -> &NativeBindings {
        &self.bindings
    }

    pub(crate) fn registry(&self) -> &PropertyRegistry {
        &self.registry
    }

    // Translate a native status code into a structured error
    pub(crate) fn check(&self, status: RawStatus) -> Result<()> {
        status::translate(status, self.bindings.error_string)
    }

    /// Return the number of devices the native library reports on the
    /// host. A failed count query is an ordinary recoverable error,
    /// never fatal to the process.
    pub fn device_count(&self) -> Result<u32> {
        let mut count: c_uint = 0;

        let status = unsafe { (self.bindings.device_count)(&mut count) };
        self.check(status)?;

        Ok(count)
    }

    /// Create a device from a caller supplied native handle.
    pub fn device_from_handle(&self, handle: RawDeviceHandle) -> Result<Device<'_>> {
        Device::new(self, handle)
    }

    // Look up the native handle for one enumeration index
    fn device_handle_by_index(&self, index: u32) -> Result<RawDeviceHandle> {
        let mut handle: RawDeviceHandle = ptr::null_mut();

        let status = unsafe { (self.bindings.device_handle_by_index)(index, &mut handle) };
        self.check(status)?;

        Ok(handle)
    }

    /// Enumerate every device on the host.
    ///
    /// Any failure aborts the whole enumeration: a handle lookup error
    /// and a device construction error both discard the devices built
    /// so far instead of reporting a truncated list as success.
    pub fn devices(&self) -> Result<Vec<Device<'_>>> {
        let count = self.device_count()?;

        debug!("Native library reported {count} devices");

        let mut devices = Vec::with_capacity(count as usize);

        for index in 0..count {
            let handle = self.device_handle_by_index(index).map_err(|err| {
                let message = match err {
                    TelemetryError::AccessorFailed { message } => message,
                    other => other.to_string(),
                };

                TelemetryError::EnumerationFailed { index, message }
            })?;

            devices.push(Device::new(self, handle)?);
        }

        if devices.is_empty() {
            return Err(TelemetryError::NoDevicesFound);
        }

        info!("Enumerated {} devices", devices.len());

        Ok(devices)
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::c_char;

    use super::*;
    use crate::test_stubs::{self, stub_bindings};

    #[test]
    fn test_device_count() {
        let monitor = Monitor::new(stub_bindings());

        assert_eq!(monitor.device_count().unwrap(), test_stubs::DEVICE_COUNT);
    }

    #[test]
    fn test_count_failure_is_recoverable() {
        unsafe extern "C" fn count_fail(_count: *mut c_uint) -> RawStatus {
            RawStatus::UNINITIALIZED
        }

        let mut bindings = stub_bindings();
        bindings.device_count = count_fail;

        let monitor = Monitor::new(bindings);

        // The caller gets an ordinary error to handle, the process
        // keeps running
        let err = monitor.devices().unwrap_err();
        assert!(matches!(err, TelemetryError::AccessorFailed { .. }));
    }

    #[test]
    fn test_enumeration_builds_every_device() {
        let monitor = Monitor::new(stub_bindings());

        let devices = monitor.devices().unwrap();

        assert_eq!(devices.len(), test_stubs::DEVICE_COUNT as usize);
        for (expected, device) in devices.iter().enumerate() {
            assert_eq!(device.index(), expected as u32);
            assert_eq!(device.uuid(), test_stubs::UUID);
            assert_eq!(device.name(), test_stubs::NAME);
        }
    }

    #[test]
    fn test_handle_failure_aborts_enumeration() {
        unsafe extern "C" fn count_three(count: *mut c_uint) -> RawStatus {
            unsafe { *count = 3 };
            RawStatus::SUCCESS
        }

        unsafe extern "C" fn second_handle_lost(
            index: c_uint,
            device: *mut RawDeviceHandle,
        ) -> RawStatus {
            if index == 1 {
                return RawStatus::GPU_IS_LOST;
            }

            unsafe { *device = (index as usize + 1) as RawDeviceHandle };
            RawStatus::SUCCESS
        }

        let mut bindings = stub_bindings();
        bindings.device_count = count_three;
        bindings.device_handle_by_index = second_handle_lost;

        let monitor = Monitor::new(bindings);

        // A handle lookup failure aborts the whole enumeration, the
        // device already built for index 0 is discarded rather than
        // returned as a partial success
        let err = monitor.devices().unwrap_err();
        match err {
            TelemetryError::EnumerationFailed { index, message } => {
                assert_eq!(index, 1);
                assert_eq!(message, test_stubs::NATIVE_MESSAGE);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_construction_failure_aborts_enumeration() {
        unsafe extern "C" fn second_name_fails(
            device: RawDeviceHandle,
            buf: *mut c_char,
            length: c_uint,
        ) -> RawStatus {
            // Handles are index + 1, the second device misbehaves
            if device as usize == 2 {
                return RawStatus::NOT_FOUND;
            }

            unsafe { test_stubs::write_text(buf, length, test_stubs::NAME) };
            RawStatus::SUCCESS
        }

        let mut bindings = stub_bindings();
        bindings.name = second_name_fails;

        let monitor = Monitor::new(bindings);

        // A construction failure aborts enumeration exactly like a
        // handle lookup failure does. The devices built before the
        // failing one are discarded, never returned as a silently
        // truncated success list
        let err = monitor.devices().unwrap_err();
        assert!(matches!(err, TelemetryError::AccessorFailed { .. }));
    }

    #[test]
    fn test_zero_devices_is_an_error() {
        unsafe extern "C" fn count_zero(count: *mut c_uint) -> RawStatus {
            unsafe { *count = 0 };
            RawStatus::SUCCESS
        }

        let mut bindings = stub_bindings();
        bindings.device_count = count_zero;

        let monitor = Monitor::new(bindings);

        let err = monitor.devices().unwrap_err();
        assert!(matches!(err, TelemetryError::NoDevicesFound));
    }
}
