//! Register map for AX-series servo control tables
//!
//! Each register is a named cell with a fixed address, byte length, access
//! rights and region. The persistent region survives power cycles and has a
//! limited write endurance; the volatile region resets to defaults at
//! power-on. Multi-byte values travel little-endian on the wire.

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use servolink_hal::{OutputPin, SerialPort};
use servolink_protocol::{FrameError, Instruction, BROADCAST_ID};

use crate::bus::{Bus, Error};

/// Widest register cell in the table, in bytes
pub const MAX_CELL_BYTES: usize = 6;

/// Access rights of a register cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Access {
    pub const fn readable(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    pub const fn writable(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }
}

/// Storage region a register cell lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Region {
    /// EEPROM-backed, survives power cycles
    Persistent,
    /// RAM-backed, resets at power-on
    Volatile,
}

/// Static layout of one register cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterCell {
    pub address: u8,
    pub length: u8,
    pub access: Access,
    pub region: Region,
}

/// Every register of the control table, plus the multi-cell spans used by
/// combined operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    ModelNumber,
    FirmwareVersion,
    Id,
    BaudRate,
    ReturnDelayTime,
    CwAngleLimit,
    CcwAngleLimit,
    TemperatureLimit,
    MinVoltageLimit,
    MaxVoltageLimit,
    MaxTorque,
    StatusReturnLevel,
    AlarmLed,
    Shutdown,
    TorqueEnable,
    Led,
    CwComplianceMargin,
    CcwComplianceMargin,
    CwComplianceSlope,
    CcwComplianceSlope,
    GoalPosition,
    MovingSpeed,
    TorqueLimit,
    PresentPosition,
    PresentSpeed,
    PresentLoad,
    PresentVoltage,
    PresentTemperature,
    Registered,
    Moving,
    Lock,
    Punch,
    /// Goal position, moving speed and torque limit as one 6-byte write
    GoalPositionSpeedTorque,
    /// Present position, speed and load as one 6-byte read
    PresentPositionSpeedLoad,
    /// Voltage, temperature, registered and moving as one 4-byte read
    MotorStatus,
}

impl Register {
    /// Number of register variants
    pub const COUNT: usize = 35;

    /// Every register, in control-table order
    pub const ALL: [Self; Self::COUNT] = [
        Self::ModelNumber,
        Self::FirmwareVersion,
        Self::Id,
        Self::BaudRate,
        Self::ReturnDelayTime,
        Self::CwAngleLimit,
        Self::CcwAngleLimit,
        Self::TemperatureLimit,
        Self::MinVoltageLimit,
        Self::MaxVoltageLimit,
        Self::MaxTorque,
        Self::StatusReturnLevel,
        Self::AlarmLed,
        Self::Shutdown,
        Self::TorqueEnable,
        Self::Led,
        Self::CwComplianceMargin,
        Self::CcwComplianceMargin,
        Self::CwComplianceSlope,
        Self::CcwComplianceSlope,
        Self::GoalPosition,
        Self::MovingSpeed,
        Self::TorqueLimit,
        Self::PresentPosition,
        Self::PresentSpeed,
        Self::PresentLoad,
        Self::PresentVoltage,
        Self::PresentTemperature,
        Self::Registered,
        Self::Moving,
        Self::Lock,
        Self::Punch,
        Self::GoalPositionSpeedTorque,
        Self::PresentPositionSpeedLoad,
        Self::MotorStatus,
    ];

    /// Static cell descriptor for this register
    pub const fn cell(self) -> RegisterCell {
        use Access::{ReadOnly, ReadWrite, WriteOnly};
        use Region::{Persistent, Volatile};

        const fn cell(address: u8, length: u8, access: Access, region: Region) -> RegisterCell {
            RegisterCell {
                address,
                length,
                access,
                region,
            }
        }

        match self {
            Self::ModelNumber => cell(0, 2, ReadOnly, Persistent),
            Self::FirmwareVersion => cell(2, 1, ReadWrite, Persistent),
            Self::Id => cell(3, 1, ReadWrite, Persistent),
            Self::BaudRate => cell(4, 1, ReadWrite, Persistent),
            Self::ReturnDelayTime => cell(5, 1, ReadWrite, Persistent),
            Self::CwAngleLimit => cell(6, 2, ReadWrite, Persistent),
            Self::CcwAngleLimit => cell(8, 2, ReadWrite, Persistent),
            Self::TemperatureLimit => cell(11, 1, ReadWrite, Persistent),
            Self::MinVoltageLimit => cell(12, 1, ReadWrite, Persistent),
            Self::MaxVoltageLimit => cell(13, 1, ReadWrite, Persistent),
            Self::MaxTorque => cell(14, 2, ReadWrite, Persistent),
            Self::StatusReturnLevel => cell(16, 1, ReadWrite, Persistent),
            Self::AlarmLed => cell(17, 1, ReadWrite, Persistent),
            Self::Shutdown => cell(18, 1, ReadWrite, Persistent),
            Self::TorqueEnable => cell(24, 1, ReadWrite, Volatile),
            Self::Led => cell(25, 1, ReadWrite, Volatile),
            Self::CwComplianceMargin => cell(26, 1, ReadWrite, Volatile),
            Self::CcwComplianceMargin => cell(27, 1, ReadWrite, Volatile),
            Self::CwComplianceSlope => cell(28, 1, ReadWrite, Volatile),
            Self::CcwComplianceSlope => cell(29, 1, ReadWrite, Volatile),
            Self::GoalPosition => cell(30, 2, ReadWrite, Volatile),
            Self::MovingSpeed => cell(32, 2, ReadWrite, Volatile),
            Self::TorqueLimit => cell(34, 2, ReadWrite, Volatile),
            Self::PresentPosition => cell(36, 2, ReadOnly, Volatile),
            Self::PresentSpeed => cell(38, 2, ReadOnly, Volatile),
            Self::PresentLoad => cell(40, 2, ReadOnly, Volatile),
            Self::PresentVoltage => cell(42, 1, ReadOnly, Volatile),
            Self::PresentTemperature => cell(43, 1, ReadOnly, Volatile),
            Self::Registered => cell(44, 1, ReadOnly, Volatile),
            Self::Moving => cell(46, 1, ReadOnly, Volatile),
            Self::Lock => cell(47, 1, ReadWrite, Volatile),
            Self::Punch => cell(48, 2, ReadWrite, Volatile),
            Self::GoalPositionSpeedTorque => cell(30, 6, WriteOnly, Volatile),
            Self::PresentPositionSpeedLoad => cell(36, 6, ReadOnly, Volatile),
            Self::MotorStatus => cell(42, 4, ReadOnly, Volatile),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Typed register access for one device, with a last-known-value cache
///
/// The cache records the most recent value read from or written to each
/// cell. It is a convenience for telemetry, never a substitute for a read:
/// `get` always goes to the bus.
pub struct DeviceRegisterMap {
    id: u8,
    cache: [Option<Vec<u8, MAX_CELL_BYTES>>; Register::COUNT],
}

impl DeviceRegisterMap {
    /// Register map for the device at `id`
    ///
    /// An id of [`BROADCAST_ID`] makes every write address all devices and
    /// every read fail with [`Error::BroadcastRead`].
    pub fn new(id: u8) -> Self {
        Self {
            id,
            cache: core::array::from_fn(|_| None),
        }
    }

    /// Device id this map addresses
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Read a register from the device
    pub fn get<S, D, T>(
        &mut self,
        bus: &mut Bus<S, D, T>,
        register: Register,
    ) -> Result<Vec<u8, MAX_CELL_BYTES>, Error<S::Error>>
    where
        S: SerialPort,
        D: OutputPin,
        T: DelayNs,
    {
        let cell = register.cell();
        if !cell.access.readable() {
            return Err(Error::Access {
                register,
                access: cell.access,
            });
        }
        if self.id == BROADCAST_ID {
            return Err(Error::BroadcastRead);
        }

        bus.write(self.id, Instruction::Read, &[cell.address, cell.length])?;
        let params = bus.read(self.id)?;
        if params.len() != cell.length as usize {
            return Err(Error::Frame(FrameError::BadLength {
                found: params.len() as u8,
            }));
        }

        let value = Vec::from_slice(&params).map_err(|_| FrameError::PayloadTooLarge)?;
        self.cache[register.index()] = Some(value.clone());
        Ok(value)
    }

    /// Write a register immediately
    pub fn set_now<S, D, T>(
        &mut self,
        bus: &mut Bus<S, D, T>,
        register: Register,
        value: &[u8],
    ) -> Result<(), Error<S::Error>>
    where
        S: SerialPort,
        D: OutputPin,
        T: DelayNs,
    {
        self.write_value(bus, register, value, Instruction::Write)
    }

    /// Stage a register write to be committed by a later ACTION
    pub fn set<S, D, T>(
        &mut self,
        bus: &mut Bus<S, D, T>,
        register: Register,
        value: &[u8],
    ) -> Result<(), Error<S::Error>>
    where
        S: SerialPort,
        D: OutputPin,
        T: DelayNs,
    {
        self.write_value(bus, register, value, Instruction::RegWrite)
    }

    fn write_value<S, D, T>(
        &mut self,
        bus: &mut Bus<S, D, T>,
        register: Register,
        value: &[u8],
        instruction: Instruction,
    ) -> Result<(), Error<S::Error>>
    where
        S: SerialPort,
        D: OutputPin,
        T: DelayNs,
    {
        let cell = register.cell();
        if !cell.access.writable() {
            return Err(Error::Access {
                register,
                access: cell.access,
            });
        }
        if value.len() != cell.length as usize {
            return Err(Error::ValueLength {
                register,
                expected: cell.length,
                actual: value.len(),
            });
        }

        let mut params: Vec<u8, { MAX_CELL_BYTES + 1 }> = Vec::new();
        // Bounded by construction: one address byte plus at most
        // MAX_CELL_BYTES value bytes.
        let _ = params.push(cell.address);
        let _ = params.extend_from_slice(value);

        bus.write(self.id, instruction, &params)?;
        if self.id != BROADCAST_ID {
            // Devices acknowledge addressed writes with an empty status
            // packet; a fault there surfaces as a frame error.
            let _ = bus.read(self.id)?;
        }
        self.cache[register.index()] = Vec::from_slice(value).ok();
        Ok(())
    }

    /// Most recent value seen for a register, if any transaction touched it
    pub fn last_known(&self, register: Register) -> Option<&[u8]> {
        self.cache[register.index()].as_deref()
    }
}
