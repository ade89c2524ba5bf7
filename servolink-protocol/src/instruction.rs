//! Instruction codes and bus addressing

/// Reserved id addressing every device on the bus at once
///
/// Broadcast-targeted instructions never produce a status packet.
pub const BROADCAST_ID: u8 = 0xFE;

/// Highest id an individual device may use (0–253)
pub const MAX_DEVICE_ID: u8 = 0xFD;

/// Instruction codes understood by AX-series devices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Instruction {
    /// Presence check, no parameters
    Ping = 0x01,
    /// Read a register range: params are `[address, length]`
    Read = 0x02,
    /// Write register bytes immediately: params are `[address, data..]`
    Write = 0x03,
    /// Stage register bytes without applying them until [`Action`](Self::Action)
    RegWrite = 0x04,
    /// Commit every previously staged deferred write
    Action = 0x05,
    /// Restore factory defaults
    FactoryReset = 0x06,
    /// Restart the device
    Reboot = 0x08,
    /// Write the same register range on several devices in one frame
    // 0x83 per the AX datasheet; some ports mistranscribe this as 0x03.
    SyncWrite = 0x83,
    /// Read register ranges from several devices in one frame
    BulkRead = 0x92,
}

impl Instruction {
    /// Every defined instruction
    pub const ALL: [Self; 9] = [
        Self::Ping,
        Self::Read,
        Self::Write,
        Self::RegWrite,
        Self::Action,
        Self::FactoryReset,
        Self::Reboot,
        Self::SyncWrite,
        Self::BulkRead,
    ];

    /// Wire code for this instruction
    pub const fn code(self) -> u8 {
        self as u8
    }
}
