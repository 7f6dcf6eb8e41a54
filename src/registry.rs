use std::collections::HashMap;

use crate::sys::{self, IntAccessorFn, NativeBindings, TextAccessorFn};

// Fixed width integer properties known to the registry. The set is
// closed and known at build time, string selection only exists at the
// public API boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntProperty {
    Index,
    MinorNumber,
    InforomConfigurationChecksum,
    MaxPcieLinkGeneration,
    MaxPcieLinkWidth,
    CurrPcieLinkGeneration,
    CurrPcieLinkWidth,
    PcieReplayCounter,
    FanSpeed,
    PowerManagementLimit,
    PowerManagementDefaultLimit,
    PowerUsage,
    EnforcedPowerLimit,
    BoardId,
    MultiGpuBoard,
}

impl IntProperty {
    pub const ALL: [IntProperty; 15] = [
        IntProperty::Index,
        IntProperty::MinorNumber,
        IntProperty::InforomConfigurationChecksum,
        IntProperty::MaxPcieLinkGeneration,
        IntProperty::MaxPcieLinkWidth,
        IntProperty::CurrPcieLinkGeneration,
        IntProperty::CurrPcieLinkWidth,
        IntProperty::PcieReplayCounter,
        IntProperty::FanSpeed,
        IntProperty::PowerManagementLimit,
        IntProperty::PowerManagementDefaultLimit,
        IntProperty::PowerUsage,
        IntProperty::EnforcedPowerLimit,
        IntProperty::BoardId,
        IntProperty::MultiGpuBoard,
    ];

    // Resolve the public property name used at the API boundary
    pub fn from_name(name: &str) -> Option<Self> {
        let property = match name {
            "Index" => Self::Index,
            "MinorNumber" => Self::MinorNumber,
            "InforomConfigurationChecksum" => Self::InforomConfigurationChecksum,
            "MaxPCIeLinkGeneration" => Self::MaxPcieLinkGeneration,
            "MaxPCIeLinkWidth" => Self::MaxPcieLinkWidth,
            "CurrPCIeLinkGeneration" => Self::CurrPcieLinkGeneration,
            "CurrPCIeLinkWidth" => Self::CurrPcieLinkWidth,
            "PCIeReplayCounter" => Self::PcieReplayCounter,
            "FanSpeed" => Self::FanSpeed,
            "PowerManagementLimit" => Self::PowerManagementLimit,
            "PowerManagementDefaultLimit" => Self::PowerManagementDefaultLimit,
            "PowerUsage" => Self::PowerUsage,
            "EnforcedPowerLimit" => Self::EnforcedPowerLimit,
            "BoardId" => Self::BoardId,
            "MultiGpuBoard" => Self::MultiGpuBoard,
            _ => return None,
        };

        Some(property)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Index => "Index",
            Self::MinorNumber => "MinorNumber",
            Self::InforomConfigurationChecksum => "InforomConfigurationChecksum",
            Self::MaxPcieLinkGeneration => "MaxPCIeLinkGeneration",
            Self::MaxPcieLinkWidth => "MaxPCIeLinkWidth",
            Self::CurrPcieLinkGeneration => "CurrPCIeLinkGeneration",
            Self::CurrPcieLinkWidth => "CurrPCIeLinkWidth",
            Self::PcieReplayCounter => "PCIeReplayCounter",
            Self::FanSpeed => "FanSpeed",
            Self::PowerManagementLimit => "PowerManagementLimit",
            Self::PowerManagementDefaultLimit => "PowerManagementDefaultLimit",
            Self::PowerUsage => "PowerUsage",
            Self::EnforcedPowerLimit => "EnforcedPowerLimit",
            Self::BoardId => "BoardId",
            Self::MultiGpuBoard => "MultiGpuBoard",
        }
    }
}

// Length bounded text properties known to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextProperty {
    Name,
    Serial,
    Uuid,
    InforomImageVersion,
    VbiosVersion,
}

impl TextProperty {
    pub const ALL: [TextProperty; 5] = [
        TextProperty::Name,
        TextProperty::Serial,
        TextProperty::Uuid,
        TextProperty::InforomImageVersion,
        TextProperty::VbiosVersion,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        let property = match name {
            "Name" => Self::Name,
            "Serial" => Self::Serial,
            "UUID" => Self::Uuid,
            "InforomImageVersion" => Self::InforomImageVersion,
            "VbiosVersion" => Self::VbiosVersion,
            _ => return None,
        };

        Some(property)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Serial => "Serial",
            Self::Uuid => "UUID",
            Self::InforomImageVersion => "InforomImageVersion",
            Self::VbiosVersion => "VbiosVersion",
        }
    }
}

// Registry record for one integer property accessor
#[derive(Debug, Clone, Copy)]
pub struct IntDescriptor {
    pub accessor: IntAccessorFn,
}

// Registry record for one text property accessor, paired with the
// buffer length its native call expects
#[derive(Debug, Clone, Copy)]
pub struct TextDescriptor {
    pub accessor: TextAccessorFn,
    pub max_length: usize,
}

// The two property name to accessor mappings. Built once when the
// monitor context is created, read only afterwards: no mutation API
// exists past this constructor.
pub struct PropertyRegistry {
    int_properties: HashMap<IntProperty, IntDescriptor>,
    text_properties: HashMap<TextProperty, TextDescriptor>,
}

impl PropertyRegistry {
    pub fn new(bindings: &NativeBindings) -> Self {
        let mut int_properties = HashMap::new();

        int_properties.insert(
            IntProperty::Index,
            IntDescriptor { accessor: bindings.index },
        );
        int_properties.insert(
            IntProperty::MinorNumber,
            IntDescriptor { accessor: bindings.minor_number },
        );
        int_properties.insert(
            IntProperty::InforomConfigurationChecksum,
            IntDescriptor { accessor: bindings.inforom_configuration_checksum },
        );
        int_properties.insert(
            IntProperty::MaxPcieLinkGeneration,
            IntDescriptor { accessor: bindings.max_pcie_link_generation },
        );
        int_properties.insert(
            IntProperty::MaxPcieLinkWidth,
            IntDescriptor { accessor: bindings.max_pcie_link_width },
        );
        int_properties.insert(
            IntProperty::CurrPcieLinkGeneration,
            IntDescriptor { accessor: bindings.curr_pcie_link_generation },
        );
        int_properties.insert(
            IntProperty::CurrPcieLinkWidth,
            IntDescriptor { accessor: bindings.curr_pcie_link_width },
        );
        int_properties.insert(
            IntProperty::PcieReplayCounter,
            IntDescriptor { accessor: bindings.pcie_replay_counter },
        );
        int_properties.insert(
            IntProperty::FanSpeed,
            IntDescriptor { accessor: bindings.fan_speed },
        );
        int_properties.insert(
            IntProperty::PowerManagementLimit,
            IntDescriptor { accessor: bindings.power_management_limit },
        );
        int_properties.insert(
            IntProperty::PowerManagementDefaultLimit,
            IntDescriptor { accessor: bindings.power_management_default_limit },
        );
        int_properties.insert(
            IntProperty::PowerUsage,
            IntDescriptor { accessor: bindings.power_usage },
        );
        int_properties.insert(
            IntProperty::EnforcedPowerLimit,
            IntDescriptor { accessor: bindings.enforced_power_limit },
        );
        int_properties.insert(
            IntProperty::BoardId,
            IntDescriptor { accessor: bindings.board_id },
        );
        int_properties.insert(
            IntProperty::MultiGpuBoard,
            IntDescriptor { accessor: bindings.multi_gpu_board },
        );

        let mut text_properties = HashMap::new();

        text_properties.insert(
            TextProperty::Name,
            TextDescriptor {
                accessor: bindings.name,
                max_length: sys::DEVICE_NAME_BUFFER_SIZE,
            },
        );
        text_properties.insert(
            TextProperty::Serial,
            TextDescriptor {
                accessor: bindings.serial,
                max_length: sys::DEVICE_SERIAL_BUFFER_SIZE,
            },
        );
        text_properties.insert(
            TextProperty::Uuid,
            TextDescriptor {
                accessor: bindings.uuid,
                max_length: sys::DEVICE_UUID_BUFFER_SIZE,
            },
        );
        text_properties.insert(
            TextProperty::InforomImageVersion,
            TextDescriptor {
                accessor: bindings.inforom_image_version,
                max_length: sys::DEVICE_INFOROM_VERSION_BUFFER_SIZE,
            },
        );
        text_properties.insert(
            TextProperty::VbiosVersion,
            TextDescriptor {
                accessor: bindings.vbios_version,
                max_length: sys::DEVICE_VBIOS_VERSION_BUFFER_SIZE,
            },
        );

        Self {
            int_properties,
            text_properties,
        }
    }

    pub fn lookup_int(&self, property: IntProperty) -> Option<IntDescriptor> {
        self.int_properties.get(&property).copied()
    }

    pub fn lookup_text(&self, property: TextProperty) -> Option<TextDescriptor> {
        self.text_properties.get(&property).copied()
    }
}
