use std::ffi::{c_char, c_uint};
use std::fmt;

use tracing::debug;

use crate::device_data::{MemoryInfo, UtilizationRates, UtilizationSample};
use crate::errors::{Result, TelemetryError};
use crate::monitor::Monitor;
use crate::registry::{IntProperty, TextProperty};
use crate::sys::{self, RawDeviceHandle};

// One physical accelerator device.
//
// The native handle stays owned by the native library for the process
// lifetime, this type only references it and never frees it. Identity
// attributes are resolved once at construction and are immutable for
// the life of the value.
pub struct Device<'m> {
    monitor: &'m Monitor,
    handle: RawDeviceHandle,

    index: u32,
    uuid: String,
    name: String,
}

impl<'m> Device<'m> {
    // Create a device from a native handle, eagerly resolving the
    // identity attributes in UUID, Name, Index order. The first
    // resolution failure aborts the construction, a partially
    // populated device is never returned.
    pub(crate) fn new(monitor: &'m Monitor, handle: RawDeviceHandle) -> Result<Self> {
        let uuid = Self::resolve_text(monitor, handle, TextProperty::Uuid)?;
        let name = Self::resolve_text(monitor, handle, TextProperty::Name)?;
        let index = Self::resolve_int(monitor, handle, IntProperty::Index)?;

        debug!("Found device {index}: \"{uuid}\"");

        Ok(Self {
            monitor,
            handle,
            index,
            uuid,
            name,
        })
    }

    // Resolve an integer property descriptor and run its accessor
    // against the given handle. One native call, no retries
    fn resolve_int(
        monitor: &Monitor,
        handle: RawDeviceHandle,
        property: IntProperty,
    ) -> Result<u32> {
        let descriptor = monitor.registry().lookup_int(property).ok_or_else(|| {
            TelemetryError::PropertyNotFound {
                name: property.name().to_string(),
            }
        })?;

        let mut value: c_uint = 0;

        let status = unsafe { (descriptor.accessor)(handle, &mut value) };
        monitor.check(status)?;

        Ok(value)
    }

    // Resolve a text property descriptor, run its accessor against a
    // buffer of the declared length and decode the result.
    //
    // The buffer is owned by this call alone and is released on every
    // exit path. The decode stops at the first terminator and never
    // reads past the declared length, even when the native call fills
    // the whole buffer without terminating it.
    fn resolve_text(
        monitor: &Monitor,
        handle: RawDeviceHandle,
        property: TextProperty,
    ) -> Result<String> {
        let descriptor = monitor.registry().lookup_text(property).ok_or_else(|| {
            TelemetryError::PropertyNotFound {
                name: property.name().to_string(),
            }
        })?;

        let mut buf = vec![0u8; descriptor.max_length];

        let status = unsafe {
            (descriptor.accessor)(
                handle,
                buf.as_mut_ptr() as *mut c_char,
                descriptor.max_length as c_uint,
            )
        };
        monitor.check(status)?;

        let end = buf.iter().position(|&byte| byte == 0).unwrap_or(buf.len());
        let text = String::from_utf8_lossy(&buf[..end]).into_owned();

        // An empty string from a successful accessor is a failure for
        // every property in this domain, not a value to pass through
        if text.is_empty() {
            return Err(TelemetryError::EmptyResult);
        }

        Ok(text)
    }

    fn query_int(&self, property: IntProperty) -> Result<u32> {
        Self::resolve_int(self.monitor, self.handle, property)
    }

    fn query_text(&self, property: TextProperty) -> Result<String> {
        Self::resolve_text(self.monitor, self.handle, property)
    }

    /// Query an integer property by its public name.
    ///
    /// Kept for callers that select properties by name at runtime, the
    /// typed getters below are the primary interface.
    pub fn int_property(&self, name: &str) -> Result<u32> {
        let property =
            IntProperty::from_name(name).ok_or_else(|| TelemetryError::PropertyNotFound {
                name: name.to_string(),
            })?;

        self.query_int(property)
    }

    /// Query a text property by its public name.
    pub fn text_property(&self, name: &str) -> Result<String> {
        let property =
            TextProperty::from_name(name).ok_or_else(|| TelemetryError::PropertyNotFound {
                name: name.to_string(),
            })?;

        self.query_text(property)
    }

    /// Return the enumeration index of the device, cached at
    /// construction.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Return the UUID of the device, cached at construction.
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Return the product name of the device, e.g. "Tesla K40m",
    /// cached at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the serial number of the device.
    pub fn serial(&self) -> Result<String> {
        self.query_text(TextProperty::Serial)
    }

    /// Return the global inforom image version.
    pub fn inforom_image_version(&self) -> Result<String> {
        self.query_text(TextProperty::InforomImageVersion)
    }

    /// Return the VBIOS version of the device.
    pub fn vbios_version(&self) -> Result<String> {
        self.query_text(TextProperty::VbiosVersion)
    }

    /// Return the minor number of the device. The device node file for
    /// the device will be /dev/nvidia[minor number].
    pub fn minor_number(&self) -> Result<u32> {
        self.query_int(IntProperty::MinorNumber)
    }

    /// Return the checksum of the configuration stored in the device
    /// inforom. Identically configured devices report the same value.
    pub fn inforom_config_checksum(&self) -> Result<u32> {
        self.query_int(IntProperty::InforomConfigurationChecksum)
    }

    /// Return the maximum PCIe link generation possible with this
    /// device and system.
    pub fn max_pcie_link_generation(&self) -> Result<u32> {
        self.query_int(IntProperty::MaxPcieLinkGeneration)
    }

    /// Return the maximum PCIe link width possible with this device
    /// and system.
    pub fn max_pcie_link_width(&self) -> Result<u32> {
        self.query_int(IntProperty::MaxPcieLinkWidth)
    }

    /// Return the current PCIe link generation.
    pub fn curr_pcie_link_generation(&self) -> Result<u32> {
        self.query_int(IntProperty::CurrPcieLinkGeneration)
    }

    /// Return the current PCIe link width.
    pub fn curr_pcie_link_width(&self) -> Result<u32> {
        self.query_int(IntProperty::CurrPcieLinkWidth)
    }

    /// Return the PCIe replay counter.
    pub fn pcie_replay_counter(&self) -> Result<u32> {
        self.query_int(IntProperty::PcieReplayCounter)
    }

    /// Return the current fan speed in percent, on devices that have
    /// fans.
    pub fn fan_speed_percent(&self) -> Result<u32> {
        self.query_int(IntProperty::FanSpeed)
    }

    /// Return the power management limit for the device, in mW.
    pub fn power_management_limit_milliwatts(&self) -> Result<u32> {
        self.query_int(IntProperty::PowerManagementLimit)
    }

    /// Return the default limit for the amount of power the device is
    /// allowed to draw, in mW.
    pub fn power_management_default_limit_milliwatts(&self) -> Result<u32> {
        self.query_int(IntProperty::PowerManagementDefaultLimit)
    }

    /// Return the current power usage of the device, in mW.
    pub fn power_usage_milliwatts(&self) -> Result<u32> {
        self.query_int(IntProperty::PowerUsage)
    }

    /// Return the power limit the driver actually enforces after
    /// taking all limiters into account, in mW.
    pub fn enforced_power_limit_milliwatts(&self) -> Result<u32> {
        self.query_int(IntProperty::EnforcedPowerLimit)
    }

    /// Return the board id of the device, identical for devices
    /// connected to the same PLX.
    pub fn board_id(&self) -> Result<u32> {
        self.query_int(IntProperty::BoardId)
    }

    /// Return whether the device sits on a multi GPU board.
    pub fn is_multi_gpu_board(&self) -> Result<bool> {
        Ok(self.query_int(IntProperty::MultiGpuBoard)? != 0)
    }

    /// Return the current performance state of the device.
    pub fn power_state(&self) -> Result<u32> {
        let mut value: c_uint = 0;

        let status = unsafe { (self.monitor.bindings().power_state)(self.handle, &mut value) };
        self.monitor.check(status)?;

        Ok(value)
    }

    /// Return the current temperature of the on die GPU sensor, in
    /// degrees Celsius.
    pub fn temperature_celsius(&self) -> Result<u32> {
        let mut value: c_uint = 0;

        let status = unsafe {
            (self.monitor.bindings().temperature)(
                self.handle,
                sys::TEMPERATURE_SENSOR_GPU,
                &mut value,
            )
        };
        self.monitor.check(status)?;

        Ok(value)
    }

    /// Return the current decoder utilization and the sampling period
    /// it was measured over.
    pub fn decoder_utilization(&self) -> Result<UtilizationSample> {
        self.sampled_pair(self.monitor.bindings().decoder_utilization)
    }

    /// Return the current encoder utilization and the sampling period
    /// it was measured over.
    pub fn encoder_utilization(&self) -> Result<UtilizationSample> {
        self.sampled_pair(self.monitor.bindings().encoder_utilization)
    }

    fn sampled_pair(&self, accessor: sys::PairAccessorFn) -> Result<UtilizationSample> {
        let mut utilization: c_uint = 0;
        let mut sampling_period_us: c_uint = 0;

        let status = unsafe { accessor(self.handle, &mut utilization, &mut sampling_period_us) };
        self.monitor.check(status)?;

        Ok(UtilizationSample {
            utilization,
            sampling_period_us,
        })
    }

    /// Return the current utilization rates of the device major
    /// subsystems.
    pub fn utilization_rates(&self) -> Result<UtilizationRates> {
        let mut raw = sys::RawUtilization::default();

        let status = unsafe { (self.monitor.bindings().utilization_rates)(self.handle, &mut raw) };
        self.monitor.check(status)?;

        Ok(raw.into())
    }

    /// Return the amount of memory used, free and in total on the
    /// device, in bytes.
    pub fn memory_info(&self) -> Result<MemoryInfo> {
        let mut raw = sys::RawMemoryInfo::default();

        let status = unsafe { (self.monitor.bindings().memory_info)(self.handle, &mut raw) };
        self.monitor.check(status)?;

        Ok(raw.into())
    }
}

impl fmt::Debug for Device<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("index", &self.index)
            .field("uuid", &self.uuid)
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::sys::RawStatus;
    use crate::test_stubs::{self, stub_bindings};

    fn stub_monitor() -> Monitor {
        Monitor::new(stub_bindings())
    }

    fn handle(value: usize) -> RawDeviceHandle {
        value as RawDeviceHandle
    }

    #[test]
    fn test_construction_caches_identity() {
        static UUID_CALLS: AtomicU32 = AtomicU32::new(0);

        unsafe extern "C" fn counted_uuid(
            _device: RawDeviceHandle,
            buf: *mut c_char,
            length: c_uint,
        ) -> RawStatus {
            UUID_CALLS.fetch_add(1, Ordering::SeqCst);
            unsafe { test_stubs::write_text(buf, length, test_stubs::UUID) };
            RawStatus::SUCCESS
        }

        let mut bindings = stub_bindings();
        bindings.uuid = counted_uuid;

        let monitor = Monitor::new(bindings);
        let device = monitor.device_from_handle(handle(1)).unwrap();

        assert_eq!(device.uuid(), test_stubs::UUID);
        assert_eq!(device.name(), test_stubs::NAME);
        assert_eq!(device.index(), 0);

        // The cached getters answer without going back to the native
        // layer, construction was the only accessor invocation
        assert_eq!(UUID_CALLS.load(Ordering::SeqCst), 1);
        let _ = device.uuid();
        let _ = device.uuid();
        assert_eq!(UUID_CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_construction_fails_fast_on_uuid() {
        static NAME_CALLS: AtomicU32 = AtomicU32::new(0);

        unsafe extern "C" fn counted_name(
            _device: RawDeviceHandle,
            buf: *mut c_char,
            length: c_uint,
        ) -> RawStatus {
            NAME_CALLS.fetch_add(1, Ordering::SeqCst);
            unsafe { test_stubs::write_text(buf, length, test_stubs::NAME) };
            RawStatus::SUCCESS
        }

        let mut bindings = stub_bindings();
        bindings.uuid = test_stubs::text_fail;
        bindings.name = counted_name;

        let monitor = Monitor::new(bindings);
        let err = monitor.device_from_handle(handle(1)).unwrap_err();

        assert!(matches!(err, TelemetryError::AccessorFailed { .. }));

        // UUID resolution failed, the later identity attributes were
        // never attempted
        assert_eq!(NAME_CALLS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_int_property_returns_stub_value() {
        let monitor = stub_monitor();
        let device = monitor.device_from_handle(handle(1)).unwrap();

        assert_eq!(device.fan_speed_percent().unwrap(), test_stubs::INT_VALUE);
        assert_eq!(
            device.int_property("FanSpeed").unwrap(),
            test_stubs::INT_VALUE
        );
        assert_eq!(
            device.int_property("PowerUsage").unwrap(),
            test_stubs::INT_VALUE
        );
    }

    #[test]
    fn test_unknown_names_never_reach_the_native_layer() {
        static CALLS: AtomicU32 = AtomicU32::new(0);

        unsafe extern "C" fn counted_int(
            _device: RawDeviceHandle,
            value: *mut c_uint,
        ) -> RawStatus {
            CALLS.fetch_add(1, Ordering::SeqCst);
            unsafe { *value = 7 };
            RawStatus::SUCCESS
        }

        unsafe extern "C" fn counted_text(
            _device: RawDeviceHandle,
            buf: *mut c_char,
            length: c_uint,
        ) -> RawStatus {
            CALLS.fetch_add(1, Ordering::SeqCst);
            unsafe { test_stubs::write_text(buf, length, test_stubs::SERIAL) };
            RawStatus::SUCCESS
        }

        let mut bindings = stub_bindings();
        bindings.fan_speed = counted_int;
        bindings.serial = counted_text;

        let monitor = Monitor::new(bindings);
        let device = monitor.device_from_handle(handle(1)).unwrap();

        let baseline = CALLS.load(Ordering::SeqCst);

        let err = device.int_property("FanSpeeed").unwrap_err();
        assert!(matches!(err, TelemetryError::PropertyNotFound { .. }));

        let err = device.text_property("SerialNumber").unwrap_err();
        assert!(matches!(err, TelemetryError::PropertyNotFound { .. }));

        assert_eq!(CALLS.load(Ordering::SeqCst), baseline);
    }

    #[test]
    fn test_text_decode_is_bounded_by_declared_length() {
        // The accessor fills the whole buffer without a terminator,
        // the decode must stop at the declared length
        unsafe extern "C" fn unterminated(
            _device: RawDeviceHandle,
            buf: *mut c_char,
            length: c_uint,
        ) -> RawStatus {
            unsafe {
                for i in 0..length as usize {
                    *buf.add(i) = b'A' as c_char;
                }
            }
            RawStatus::SUCCESS
        }

        let mut bindings = stub_bindings();
        bindings.serial = unterminated;

        let monitor = Monitor::new(bindings);
        let device = monitor.device_from_handle(handle(1)).unwrap();

        let serial = device.serial().unwrap();
        assert_eq!(serial.len(), crate::sys::DEVICE_SERIAL_BUFFER_SIZE);
        assert!(serial.bytes().all(|byte| byte == b'A'));
    }

    #[test]
    fn test_empty_text_is_a_failure() {
        unsafe extern "C" fn empty_text(
            _device: RawDeviceHandle,
            buf: *mut c_char,
            _length: c_uint,
        ) -> RawStatus {
            unsafe { *buf = 0 };
            RawStatus::SUCCESS
        }

        let mut bindings = stub_bindings();
        bindings.serial = empty_text;

        let monitor = Monitor::new(bindings);
        let device = monitor.device_from_handle(handle(1)).unwrap();

        let err = device.serial().unwrap_err();
        assert!(matches!(err, TelemetryError::EmptyResult));
    }

    #[test]
    fn test_accessor_failure_carries_native_message() {
        let mut bindings = stub_bindings();
        bindings.fan_speed = test_stubs::int_fail;

        let monitor = Monitor::new(bindings);
        let device = monitor.device_from_handle(handle(1)).unwrap();

        let err = device.fan_speed_percent().unwrap_err();
        match err {
            TelemetryError::AccessorFailed { message } => {
                assert_eq!(message, test_stubs::NATIVE_MESSAGE);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_multi_gpu_board_decodes_native_flag() {
        unsafe extern "C" fn flag_clear(
            _device: RawDeviceHandle,
            value: *mut c_uint,
        ) -> RawStatus {
            unsafe { *value = 0 };
            RawStatus::SUCCESS
        }

        let monitor = stub_monitor();
        let device = monitor.device_from_handle(handle(1)).unwrap();
        assert!(device.is_multi_gpu_board().unwrap());

        let mut bindings = stub_bindings();
        bindings.multi_gpu_board = flag_clear;

        let monitor = Monitor::new(bindings);
        let device = monitor.device_from_handle(handle(1)).unwrap();
        assert!(!device.is_multi_gpu_board().unwrap());
    }

    #[test]
    fn test_bespoke_accessors_return_stub_values() {
        let monitor = stub_monitor();
        let device = monitor.device_from_handle(handle(1)).unwrap();

        assert_eq!(device.power_state().unwrap(), test_stubs::INT_VALUE);
        assert_eq!(
            device.temperature_celsius().unwrap(),
            test_stubs::TEMPERATURE
        );

        let sample = device.decoder_utilization().unwrap();
        assert_eq!(sample.utilization, test_stubs::UTILIZATION);
        assert_eq!(sample.sampling_period_us, test_stubs::SAMPLING_PERIOD_US);

        let sample = device.encoder_utilization().unwrap();
        assert_eq!(sample.utilization, test_stubs::UTILIZATION);

        let rates = device.utilization_rates().unwrap();
        assert_eq!(rates.gpu_percent, test_stubs::GPU_UTILIZATION);
        assert_eq!(rates.memory_percent, test_stubs::MEMORY_UTILIZATION);
    }

    #[test]
    fn test_memory_info_returns_exact_counters() {
        let monitor = stub_monitor();
        let device = monitor.device_from_handle(handle(1)).unwrap();

        let info = device.memory_info().unwrap();
        assert_eq!(
            info,
            MemoryInfo {
                free: 100,
                used: 50,
                total: 150,
            }
        );
    }

    #[test]
    fn test_text_properties_by_name() {
        let monitor = stub_monitor();
        let device = monitor.device_from_handle(handle(1)).unwrap();

        assert_eq!(device.text_property("UUID").unwrap(), test_stubs::UUID);
        assert_eq!(device.text_property("Name").unwrap(), test_stubs::NAME);
        assert_eq!(device.serial().unwrap(), test_stubs::SERIAL);
        assert_eq!(
            device.inforom_image_version().unwrap(),
            test_stubs::INFOROM_VERSION
        );
        assert_eq!(device.vbios_version().unwrap(), test_stubs::VBIOS_VERSION);
    }
}
