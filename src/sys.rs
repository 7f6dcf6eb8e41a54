// Raw surface of the vendor hardware monitoring interface.
//
// Everything the native library hands this crate, or expects from it,
// is declared here: the opaque device handle, the status code domain,
// the accessor signatures and the capability set record that groups
// one accessor per named property.

use std::ffi::{c_char, c_uint, c_ulonglong, c_void};

// Opaque reference to a device instance. The native library owns the
// handle for the whole process lifetime, this layer never frees or
// duplicates it, only passes it back into accessor calls.
pub type RawDeviceHandle = *mut c_void;

// Status code returned by every native call. Kept as a dedicated type
// so a status is never confused with an ordinary integer result
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawStatus(pub i32);

impl RawStatus {
    pub const SUCCESS: RawStatus = RawStatus(0);
    pub const UNINITIALIZED: RawStatus = RawStatus(1);
    pub const INVALID_ARGUMENT: RawStatus = RawStatus(2);
    pub const NOT_SUPPORTED: RawStatus = RawStatus(3);
    pub const NO_PERMISSION: RawStatus = RawStatus(4);
    pub const NOT_FOUND: RawStatus = RawStatus(6);
    pub const INSUFFICIENT_SIZE: RawStatus = RawStatus(7);
    pub const GPU_IS_LOST: RawStatus = RawStatus(15);
    pub const UNKNOWN: RawStatus = RawStatus(999);

    // Success is whatever the library defines as its sentinel,
    // never a bare zero comparison at the call sites
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }
}

// Memory counters as laid out by the native library, in bytes
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct RawMemoryInfo {
    pub total: c_ulonglong,
    pub free: c_ulonglong,
    pub used: c_ulonglong,
}

// Utilization counters of the device major subsystems, in percent
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct RawUtilization {
    pub gpu: c_uint,
    pub memory: c_uint,
}

// Sensor selector for the temperature accessor, the on die GPU sensor
// is the only one this crate queries
pub const TEMPERATURE_SENSOR_GPU: c_uint = 0;

// Text buffer lengths declared by the native library, one per text
// property. The lengths are heterogeneous, not a single constant
pub const DEVICE_NAME_BUFFER_SIZE: usize = 64;
pub const DEVICE_SERIAL_BUFFER_SIZE: usize = 30;
pub const DEVICE_UUID_BUFFER_SIZE: usize = 80;
pub const DEVICE_INFOROM_VERSION_BUFFER_SIZE: usize = 16;
pub const DEVICE_VBIOS_VERSION_BUFFER_SIZE: usize = 32;

// Accessor reading one fixed width integer property
pub type IntAccessorFn =
    unsafe extern "C" fn(device: RawDeviceHandle, value: *mut c_uint) -> RawStatus;

// Accessor filling a caller supplied text buffer of the given length
pub type TextAccessorFn = unsafe extern "C" fn(
    device: RawDeviceHandle,
    buf: *mut c_char,
    length: c_uint,
) -> RawStatus;

// Accessor reading a value together with its sampling period
pub type PairAccessorFn = unsafe extern "C" fn(
    device: RawDeviceHandle,
    value: *mut c_uint,
    sampling_period_us: *mut c_uint,
) -> RawStatus;

pub type TemperatureFn = unsafe extern "C" fn(
    device: RawDeviceHandle,
    sensor: c_uint,
    value: *mut c_uint,
) -> RawStatus;

pub type UtilizationFn =
    unsafe extern "C" fn(device: RawDeviceHandle, utilization: *mut RawUtilization) -> RawStatus;

pub type MemoryInfoFn =
    unsafe extern "C" fn(device: RawDeviceHandle, memory: *mut RawMemoryInfo) -> RawStatus;

pub type DeviceCountFn = unsafe extern "C" fn(count: *mut c_uint) -> RawStatus;

pub type HandleByIndexFn =
    unsafe extern "C" fn(index: c_uint, device: *mut RawDeviceHandle) -> RawStatus;

// Status to human readable message lookup
pub type ErrorStringFn = unsafe extern "C" fn(status: RawStatus) -> *const c_char;

// The externally supplied native capability set: exactly one accessor
// per named property plus the system level entry points. The registry
// and the monitor context are built from one of these, the tests
// build them from stub functions.
#[derive(Clone, Copy)]
pub struct NativeBindings {
    pub device_count: DeviceCountFn,
    pub device_handle_by_index: HandleByIndexFn,
    pub error_string: ErrorStringFn,

    // Fixed width integer property accessors
    pub index: IntAccessorFn,
    pub minor_number: IntAccessorFn,
    pub inforom_configuration_checksum: IntAccessorFn,
    pub max_pcie_link_generation: IntAccessorFn,
    pub max_pcie_link_width: IntAccessorFn,
    pub curr_pcie_link_generation: IntAccessorFn,
    pub curr_pcie_link_width: IntAccessorFn,
    pub pcie_replay_counter: IntAccessorFn,
    pub fan_speed: IntAccessorFn,
    pub power_management_limit: IntAccessorFn,
    pub power_management_default_limit: IntAccessorFn,
    pub power_usage: IntAccessorFn,
    pub enforced_power_limit: IntAccessorFn,
    pub board_id: IntAccessorFn,
    pub multi_gpu_board: IntAccessorFn,

    // Length bounded text property accessors
    pub name: TextAccessorFn,
    pub serial: TextAccessorFn,
    pub uuid: TextAccessorFn,
    pub inforom_image_version: TextAccessorFn,
    pub vbios_version: TextAccessorFn,

    // Accessors with signatures of their own
    pub power_state: IntAccessorFn,
    pub temperature: TemperatureFn,
    pub decoder_utilization: PairAccessorFn,
    pub encoder_utilization: PairAccessorFn,
    pub utilization_rates: UtilizationFn,
    pub memory_info: MemoryInfoFn,
}

#[cfg(feature = "nvml")]
#[allow(non_snake_case)]
#[link(name = "nvidia-ml")]
unsafe extern "C" {
    fn nvmlDeviceGetCount(count: *mut c_uint) -> RawStatus;
    fn nvmlDeviceGetHandleByIndex(index: c_uint, device: *mut RawDeviceHandle) -> RawStatus;
    fn nvmlErrorString(status: RawStatus) -> *const c_char;

    fn nvmlDeviceGetIndex(device: RawDeviceHandle, value: *mut c_uint) -> RawStatus;
    fn nvmlDeviceGetMinorNumber(device: RawDeviceHandle, value: *mut c_uint) -> RawStatus;
    fn nvmlDeviceGetInforomConfigurationChecksum(
        device: RawDeviceHandle,
        value: *mut c_uint,
    ) -> RawStatus;
    fn nvmlDeviceGetMaxPcieLinkGeneration(device: RawDeviceHandle, value: *mut c_uint)
    -> RawStatus;
    fn nvmlDeviceGetMaxPcieLinkWidth(device: RawDeviceHandle, value: *mut c_uint) -> RawStatus;
    fn nvmlDeviceGetCurrPcieLinkGeneration(
        device: RawDeviceHandle,
        value: *mut c_uint,
    ) -> RawStatus;
    fn nvmlDeviceGetCurrPcieLinkWidth(device: RawDeviceHandle, value: *mut c_uint) -> RawStatus;
    fn nvmlDeviceGetPcieReplayCounter(device: RawDeviceHandle, value: *mut c_uint) -> RawStatus;
    fn nvmlDeviceGetFanSpeed(device: RawDeviceHandle, value: *mut c_uint) -> RawStatus;
    fn nvmlDeviceGetPowerManagementLimit(device: RawDeviceHandle, value: *mut c_uint)
    -> RawStatus;
    fn nvmlDeviceGetPowerManagementDefaultLimit(
        device: RawDeviceHandle,
        value: *mut c_uint,
    ) -> RawStatus;
    fn nvmlDeviceGetPowerUsage(device: RawDeviceHandle, value: *mut c_uint) -> RawStatus;
    fn nvmlDeviceGetEnforcedPowerLimit(device: RawDeviceHandle, value: *mut c_uint) -> RawStatus;
    fn nvmlDeviceGetBoardId(device: RawDeviceHandle, value: *mut c_uint) -> RawStatus;
    fn nvmlDeviceGetMultiGpuBoard(device: RawDeviceHandle, value: *mut c_uint) -> RawStatus;

    fn nvmlDeviceGetName(device: RawDeviceHandle, buf: *mut c_char, length: c_uint) -> RawStatus;
    fn nvmlDeviceGetSerial(device: RawDeviceHandle, buf: *mut c_char, length: c_uint)
    -> RawStatus;
    fn nvmlDeviceGetUUID(device: RawDeviceHandle, buf: *mut c_char, length: c_uint) -> RawStatus;
    fn nvmlDeviceGetInforomImageVersion(
        device: RawDeviceHandle,
        buf: *mut c_char,
        length: c_uint,
    ) -> RawStatus;
    fn nvmlDeviceGetVbiosVersion(
        device: RawDeviceHandle,
        buf: *mut c_char,
        length: c_uint,
    ) -> RawStatus;

    fn nvmlDeviceGetPowerState(device: RawDeviceHandle, value: *mut c_uint) -> RawStatus;
    fn nvmlDeviceGetTemperature(
        device: RawDeviceHandle,
        sensor: c_uint,
        value: *mut c_uint,
    ) -> RawStatus;
    fn nvmlDeviceGetDecoderUtilization(
        device: RawDeviceHandle,
        value: *mut c_uint,
        sampling_period_us: *mut c_uint,
    ) -> RawStatus;
    fn nvmlDeviceGetEncoderUtilization(
        device: RawDeviceHandle,
        value: *mut c_uint,
        sampling_period_us: *mut c_uint,
    ) -> RawStatus;
    fn nvmlDeviceGetUtilizationRates(
        device: RawDeviceHandle,
        utilization: *mut RawUtilization,
    ) -> RawStatus;
    fn nvmlDeviceGetMemoryInfo(device: RawDeviceHandle, memory: *mut RawMemoryInfo) -> RawStatus;
}

#[cfg(feature = "nvml")]
impl NativeBindings {
    // Build the capability set from the linked vendor library. Loading
    // and initializing the library before the first query is the
    // embedder's responsibility, not this crate's.
    pub fn linked() -> Self {
        Self {
            device_count: nvmlDeviceGetCount,
            device_handle_by_index: nvmlDeviceGetHandleByIndex,
            error_string: nvmlErrorString,

            index: nvmlDeviceGetIndex,
            minor_number: nvmlDeviceGetMinorNumber,
            inforom_configuration_checksum: nvmlDeviceGetInforomConfigurationChecksum,
            max_pcie_link_generation: nvmlDeviceGetMaxPcieLinkGeneration,
            max_pcie_link_width: nvmlDeviceGetMaxPcieLinkWidth,
            curr_pcie_link_generation: nvmlDeviceGetCurrPcieLinkGeneration,
            curr_pcie_link_width: nvmlDeviceGetCurrPcieLinkWidth,
            pcie_replay_counter: nvmlDeviceGetPcieReplayCounter,
            fan_speed: nvmlDeviceGetFanSpeed,
            power_management_limit: nvmlDeviceGetPowerManagementLimit,
            power_management_default_limit: nvmlDeviceGetPowerManagementDefaultLimit,
            power_usage: nvmlDeviceGetPowerUsage,
            enforced_power_limit: nvmlDeviceGetEnforcedPowerLimit,
            board_id: nvmlDeviceGetBoardId,
            multi_gpu_board: nvmlDeviceGetMultiGpuBoard,

            name: nvmlDeviceGetName,
            serial: nvmlDeviceGetSerial,
            uuid: nvmlDeviceGetUUID,
            inforom_image_version: nvmlDeviceGetInforomImageVersion,
            vbios_version: nvmlDeviceGetVbiosVersion,

            power_state: nvmlDeviceGetPowerState,
            temperature: nvmlDeviceGetTemperature,
            decoder_utilization: nvmlDeviceGetDecoderUtilization,
            encoder_utilization: nvmlDeviceGetEncoderUtilization,
            utilization_rates: nvmlDeviceGetUtilizationRates,
            memory_info: nvmlDeviceGetMemoryInfo,
        }
    }
}
