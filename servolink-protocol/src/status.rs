//! Device error bitmask carried in status packets

/// Error bitmask reported by a device in the status byte of its response
///
/// A value of zero means the device accepted the instruction. Any set bit
/// is a fault condition; the raw bitmask is preserved so callers can log or
/// match on the exact combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceStatus {
    bits: u8,
}

impl DeviceStatus {
    /// Supply voltage outside the configured limits
    pub const INPUT_VOLTAGE: u8 = 0x01;
    /// Goal position outside the configured angle limits
    pub const ANGLE_LIMIT: u8 = 0x02;
    /// Internal temperature above the configured limit
    pub const OVERHEATING: u8 = 0x04;
    /// Instruction parameter outside its usable range
    pub const RANGE: u8 = 0x08;
    /// Checksum of the received instruction packet did not match
    pub const CHECKSUM: u8 = 0x10;
    /// Load above the configured torque limit
    pub const OVERLOAD: u8 = 0x20;
    /// Undefined instruction, or ACTION without a staged write
    pub const INSTRUCTION: u8 = 0x40;

    /// Wrap a raw status byte
    pub const fn from_bits(bits: u8) -> Self {
        Self { bits }
    }

    /// The raw bitmask exactly as received
    pub const fn bits(self) -> u8 {
        self.bits
    }

    /// No fault bit set
    pub const fn is_ok(self) -> bool {
        self.bits == 0
    }

    pub const fn input_voltage(self) -> bool {
        self.bits & Self::INPUT_VOLTAGE != 0
    }

    pub const fn angle_limit(self) -> bool {
        self.bits & Self::ANGLE_LIMIT != 0
    }

    pub const fn overheating(self) -> bool {
        self.bits & Self::OVERHEATING != 0
    }

    pub const fn range(self) -> bool {
        self.bits & Self::RANGE != 0
    }

    pub const fn checksum(self) -> bool {
        self.bits & Self::CHECKSUM != 0
    }

    pub const fn overload(self) -> bool {
        self.bits & Self::OVERLOAD != 0
    }

    pub const fn instruction(self) -> bool {
        self.bits & Self::INSTRUCTION != 0
    }
}
