// Data transfer records returned by the multi valued device queries.
// They are not cached anywhere, every query returns a fresh value.

use serde::{Deserialize, Serialize};

use crate::sys::{RawMemoryInfo, RawUtilization};

// Device memory counters, all values in bytes. The native library is
// the one guaranteeing that used + free == total, this layer does not
// enforce it
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    pub free: u64,
    pub used: u64,
    pub total: u64,
}

impl From<RawMemoryInfo> for MemoryInfo {
    fn from(raw: RawMemoryInfo) -> Self {
        Self {
            free: raw.free,
            used: raw.used,
            total: raw.total,
        }
    }
}

// One utilization reading together with the sampling period in
// microseconds over which it was measured
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct UtilizationSample {
    pub utilization: u32,
    pub sampling_period_us: u32,
}

// Utilization of the device major subsystems, in percent
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct UtilizationRates {
    pub gpu_percent: u32,
    pub memory_percent: u32,
}

impl From<RawUtilization> for UtilizationRates {
    fn from(raw: RawUtilization) -> Self {
        Self {
            gpu_percent: raw.gpu,
            memory_percent: raw.memory,
        }
    }
}
