// Stub native capability set shared by the unit tests. The baseline
// set succeeds on every accessor and reports the fixed values below,
// individual tests override single entries with local stubs.

use std::ffi::{c_char, c_uint, c_void};
use std::ptr;

use crate::sys::{
    NativeBindings, RawDeviceHandle, RawMemoryInfo, RawStatus, RawUtilization,
};

pub const DEVICE_COUNT: u32 = 2;

pub const UUID: &str = "GPU-b2704d55-6af1-4a7c-a014-0d7a2a10fa2c";
pub const NAME: &str = "Tesla K40m";
pub const SERIAL: &str = "0320217055289";
pub const INFOROM_VERSION: &str = "2081.0206.01.0";
pub const VBIOS_VERSION: &str = "80.21.25.00.02";

pub const INT_VALUE: u32 = 42;
pub const TEMPERATURE: u32 = 61;
pub const UTILIZATION: u32 = 37;
pub const SAMPLING_PERIOD_US: u32 = 167_000;
pub const GPU_UTILIZATION: u32 = 83;
pub const MEMORY_UTILIZATION: u32 = 54;

pub const NATIVE_MESSAGE: &str = "Insufficient Permissions";
const NATIVE_MESSAGE_C: &[u8] = b"Insufficient Permissions\0";

// Copy a string into a native style text buffer, terminating it and
// never writing past the declared length
pub unsafe fn write_text(buf: *mut c_char, length: c_uint, text: &str) {
    let bytes = text.as_bytes();
    let count = bytes.len().min(length as usize - 1);

    unsafe {
        ptr::copy_nonoverlapping(bytes.as_ptr() as *const c_char, buf, count);
        *buf.add(count) = 0;
    }
}

unsafe extern "C" fn device_count_ok(count: *mut c_uint) -> RawStatus {
    unsafe { *count = DEVICE_COUNT };
    RawStatus::SUCCESS
}

unsafe extern "C" fn handle_by_index_ok(
    index: c_uint,
    device: *mut RawDeviceHandle,
) -> RawStatus {
    // Non null fake handles, one per index
    unsafe { *device = (index as usize + 1) as *mut c_void };
    RawStatus::SUCCESS
}

unsafe extern "C" fn error_string_ok(_status: RawStatus) -> *const c_char {
    NATIVE_MESSAGE_C.as_ptr() as *const c_char
}

unsafe extern "C" fn int_ok(_device: RawDeviceHandle, value: *mut c_uint) -> RawStatus {
    unsafe { *value = INT_VALUE };
    RawStatus::SUCCESS
}

// Reports the index the fake handle was built from
unsafe extern "C" fn index_from_handle(
    device: RawDeviceHandle,
    value: *mut c_uint,
) -> RawStatus {
    unsafe { *value = device as usize as c_uint - 1 };
    RawStatus::SUCCESS
}

pub unsafe extern "C" fn int_fail(_device: RawDeviceHandle, _value: *mut c_uint) -> RawStatus {
    RawStatus::NO_PERMISSION
}

pub unsafe extern "C" fn text_fail(
    _device: RawDeviceHandle,
    _buf: *mut c_char,
    _length: c_uint,
) -> RawStatus {
    RawStatus::NO_PERMISSION
}

unsafe extern "C" fn uuid_ok(
    _device: RawDeviceHandle,
    buf: *mut c_char,
    length: c_uint,
) -> RawStatus {
    unsafe { write_text(buf, length, UUID) };
    RawStatus::SUCCESS
}

unsafe extern "C" fn name_ok(
    _device: RawDeviceHandle,
    buf: *mut c_char,
    length: c_uint,
) -> RawStatus {
    unsafe { write_text(buf, length, NAME) };
    RawStatus::SUCCESS
}

unsafe extern "C" fn serial_ok(
    _device: RawDeviceHandle,
    buf: *mut c_char,
    length: c_uint,
) -> RawStatus {
    unsafe { write_text(buf, length, SERIAL) };
    RawStatus::SUCCESS
}

unsafe extern "C" fn inforom_ok(
    _device: RawDeviceHandle,
    buf: *mut c_char,
    length: c_uint,
) -> RawStatus {
    unsafe { write_text(buf, length, INFOROM_VERSION) };
    RawStatus::SUCCESS
}

unsafe extern "C" fn vbios_ok(
    _device: RawDeviceHandle,
    buf: *mut c_char,
    length: c_uint,
) -> RawStatus {
    unsafe { write_text(buf, length, VBIOS_VERSION) };
    RawStatus::SUCCESS
}

unsafe extern "C" fn temperature_ok(
    _device: RawDeviceHandle,
    _sensor: c_uint,
    value: *mut c_uint,
) -> RawStatus {
    unsafe { *value = TEMPERATURE };
    RawStatus::SUCCESS
}

unsafe extern "C" fn pair_ok(
    _device: RawDeviceHandle,
    value: *mut c_uint,
    sampling_period_us: *mut c_uint,
) -> RawStatus {
    unsafe {
        *value = UTILIZATION;
        *sampling_period_us = SAMPLING_PERIOD_US;
    }
    RawStatus::SUCCESS
}

unsafe extern "C" fn utilization_ok(
    _device: RawDeviceHandle,
    utilization: *mut RawUtilization,
) -> RawStatus {
    unsafe {
        *utilization = RawUtilization {
            gpu: GPU_UTILIZATION,
            memory: MEMORY_UTILIZATION,
        };
    }
    RawStatus::SUCCESS
}

unsafe extern "C" fn memory_ok(
    _device: RawDeviceHandle,
    memory: *mut RawMemoryInfo,
) -> RawStatus {
    unsafe {
        *memory = RawMemoryInfo {
            total: 150,
            free: 100,
            used: 50,
        };
    }
    RawStatus::SUCCESS
}

pub fn stub_bindings() -> NativeBindings {
    NativeBindings {
        device_count: device_count_ok,
        device_handle_by_index: handle_by_index_ok,
        error_string: error_string_ok,

        index: index_from_handle,
        minor_number: int_ok,
        inforom_configuration_checksum: int_ok,
        max_pcie_link_generation: int_ok,
        max_pcie_link_width: int_ok,
        curr_pcie_link_generation: int_ok,
        curr_pcie_link_width: int_ok,
        pcie_replay_counter: int_ok,
        fan_speed: int_ok,
        power_management_limit: int_ok,
        power_management_default_limit: int_ok,
        power_usage: int_ok,
        enforced_power_limit: int_ok,
        board_id: int_ok,
        multi_gpu_board: int_ok,

        name: name_ok,
        serial: serial_ok,
        uuid: uuid_ok,
        inforom_image_version: inforom_ok,
        vbios_version: vbios_ok,

        power_state: int_ok,
        temperature: temperature_ok,
        decoder_utilization: pair_ok,
        encoder_utilization: pair_ok,
        utilization_rates: utilization_ok,
        memory_info: memory_ok,
    }
}
