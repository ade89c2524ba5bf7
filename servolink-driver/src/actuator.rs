//! High-level actuator operations composed from register transactions
//!
//! An [`Actuator`] pairs a [`Bus`] with the [`DeviceRegisterMap`] of one
//! servo (or of the broadcast id) and exposes motion targets, combined
//! telemetry reads and the lifecycle instructions.

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use servolink_hal::{OutputPin, SerialPort};
use servolink_protocol::{Instruction, BROADCAST_ID};

use crate::bus::{Bus, Error};
use crate::registers::{DeviceRegisterMap, Register, MAX_CELL_BYTES};

/// Torque at the limit-register full scale, in millinewton-metres
pub const TORQUE_FULL_SCALE_MNM: u16 = 1_500;

/// Maximum raw value of the torque limit register
pub const TORQUE_SCALE_MAX: u16 = 1023;

/// Torque limit in raw register units, clamped to the valid range
///
/// The device scales 0 to [`TORQUE_SCALE_MAX`] linearly over its stall
/// torque; [`TorqueLimit::from_millinewton_metres`] converts from physical
/// units, rounding up so a requested torque is never silently lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TorqueLimit(u16);

impl TorqueLimit {
    /// Full torque
    pub const MAX: Self = Self(TORQUE_SCALE_MAX);

    /// Raw register units, clamped to [`TORQUE_SCALE_MAX`]
    pub const fn from_raw(raw: u16) -> Self {
        if raw > TORQUE_SCALE_MAX {
            Self(TORQUE_SCALE_MAX)
        } else {
            Self(raw)
        }
    }

    /// Convert a physical torque to register units
    pub const fn from_millinewton_metres(mnm: u16) -> Self {
        if mnm >= TORQUE_FULL_SCALE_MNM {
            return Self::MAX;
        }
        let raw = (mnm as u32 * TORQUE_SCALE_MAX as u32)
            .div_ceil(TORQUE_FULL_SCALE_MNM as u32);
        Self(raw as u16)
    }

    /// Raw register value
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl Default for TorqueLimit {
    fn default() -> Self {
        Self::MAX
    }
}

/// Construction parameters for an [`Actuator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActuatorConfig {
    /// Device id, or [`BROADCAST_ID`] to address every servo on the bus
    pub id: u8,
    /// Upper bound applied to every torque target
    pub torque_limit: TorqueLimit,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            id: 1,
            torque_limit: TorqueLimit::MAX,
        }
    }
}

/// Snapshot of position, velocity and load from one combined read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PresentState {
    pub position: u16,
    pub velocity: u16,
    pub load: u16,
}

/// Snapshot of the health registers from one combined read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorStatus {
    /// Supply voltage in tenths of a volt
    pub voltage: u8,
    /// Internal temperature in degrees Celsius
    pub temperature: u8,
    /// A staged write is waiting for ACTION
    pub registered: bool,
    /// The servo is moving towards a goal
    pub moving: bool,
}

/// One servo (or the broadcast group) together with its bus
pub struct Actuator<S, D, T> {
    bus: Bus<S, D, T>,
    map: DeviceRegisterMap,
    torque_limit: TorqueLimit,
}

impl<S, D, T> Actuator<S, D, T>
where
    S: SerialPort,
    D: OutputPin,
    T: DelayNs,
{
    /// Attach to the servo described by `config`
    pub fn new(bus: Bus<S, D, T>, config: ActuatorConfig) -> Self {
        Self {
            bus,
            map: DeviceRegisterMap::new(config.id),
            torque_limit: config.torque_limit,
        }
    }

    /// Device id this actuator addresses
    pub fn id(&self) -> u8 {
        self.map.id()
    }

    /// Configured torque ceiling
    pub fn torque_limit(&self) -> TorqueLimit {
        self.torque_limit
    }

    /// Stage a goal position in raw units (0..=1023 over the 300° range)
    ///
    /// Targets are staged as deferred writes; [`Actuator::action`] commits
    /// them, so several can be staged and applied at the same instant.
    pub fn target_position(&mut self, position: u16) -> Result<(), Error<S::Error>> {
        self.map
            .set(&mut self.bus, Register::GoalPosition, &position.to_le_bytes())
    }

    /// Stage a moving speed in raw units; zero selects maximum speed
    pub fn target_velocity(&mut self, velocity: u16) -> Result<(), Error<S::Error>> {
        self.map
            .set(&mut self.bus, Register::MovingSpeed, &velocity.to_le_bytes())
    }

    /// Stage a torque limit, clamped to the configured ceiling
    pub fn target_torque(&mut self, torque: u16) -> Result<(), Error<S::Error>> {
        let torque = torque.min(self.torque_limit.raw());
        self.map
            .set(&mut self.bus, Register::TorqueLimit, &torque.to_le_bytes())
    }

    /// Stage position, velocity and torque in a single transaction
    ///
    /// The three cells are contiguous in the control table, so one staged
    /// write covers all of them and [`Actuator::action`] applies them
    /// together. Torque is clamped to the configured ceiling.
    pub fn position_velocity_torque(
        &mut self,
        position: u16,
        velocity: u16,
        torque: u16,
    ) -> Result<(), Error<S::Error>> {
        let torque = torque.min(self.torque_limit.raw());
        let mut value: Vec<u8, MAX_CELL_BYTES> = Vec::new();
        // Exactly six bytes, the cell width.
        let _ = value.extend_from_slice(&position.to_le_bytes());
        let _ = value.extend_from_slice(&velocity.to_le_bytes());
        let _ = value.extend_from_slice(&torque.to_le_bytes());
        self.map
            .set(&mut self.bus, Register::GoalPositionSpeedTorque, &value)
    }

    /// Read position, velocity and load in a single transaction
    pub fn current_position_velocity_load(&mut self) -> Result<PresentState, Error<S::Error>> {
        let value = self
            .map
            .get(&mut self.bus, Register::PresentPositionSpeedLoad)?;
        Ok(PresentState {
            position: u16::from_le_bytes([value[0], value[1]]),
            velocity: u16::from_le_bytes([value[2], value[3]]),
            load: u16::from_le_bytes([value[4], value[5]]),
        })
    }

    /// Read voltage, temperature and the motion flags in a single transaction
    pub fn status(&mut self) -> Result<MotorStatus, Error<S::Error>> {
        let value = self.map.get(&mut self.bus, Register::MotorStatus)?;
        Ok(MotorStatus {
            voltage: value[0],
            temperature: value[1],
            registered: value[2] != 0,
            moving: value[3] != 0,
        })
    }

    /// Commit every staged write on this id
    pub fn action(&mut self) -> Result<(), Error<S::Error>> {
        self.lifecycle(Instruction::Action)
    }

    /// Check the device is present and fault-free
    pub fn ping(&mut self) -> Result<(), Error<S::Error>> {
        self.lifecycle(Instruction::Ping)
    }

    /// Restart the device firmware
    pub fn reboot(&mut self) -> Result<(), Error<S::Error>> {
        self.lifecycle(Instruction::Reboot)
    }

    /// Reset the whole control table to factory defaults
    ///
    /// This also resets the device id and baud rate, so the bus usually
    /// needs reconfiguring afterwards.
    pub fn factory_reset(&mut self) -> Result<(), Error<S::Error>> {
        self.lifecycle(Instruction::FactoryReset)
    }

    /// Direct register read, for cells without a dedicated operation
    pub fn get_register(
        &mut self,
        register: Register,
    ) -> Result<Vec<u8, MAX_CELL_BYTES>, Error<S::Error>> {
        self.map.get(&mut self.bus, register)
    }

    /// Direct staged register write, committed by [`Actuator::action`]
    pub fn set_register(&mut self, register: Register, value: &[u8]) -> Result<(), Error<S::Error>> {
        self.map.set(&mut self.bus, register, value)
    }

    /// Direct immediate register write
    pub fn set_register_now(
        &mut self,
        register: Register,
        value: &[u8],
    ) -> Result<(), Error<S::Error>> {
        self.map.set_now(&mut self.bus, register, value)
    }

    /// Most recent value seen for a register, without touching the bus
    pub fn last_known(&self, register: Register) -> Option<&[u8]> {
        self.map.last_known(register)
    }

    /// Shut down and hand the bus hardware back
    pub fn release(self) -> (S, D, T) {
        self.bus.release()
    }

    fn lifecycle(&mut self, instruction: Instruction) -> Result<(), Error<S::Error>> {
        let id = self.map.id();
        self.bus.write(id, instruction, &[])?;
        if id != BROADCAST_ID {
            let _ = self.bus.read(id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Bus;
    use crate::testutil::{status_frame, MockDelay, MockPin, MockSerial};

    fn actuator(serial: MockSerial, config: ActuatorConfig) -> Actuator<MockSerial, MockPin, MockDelay> {
        let bus = Bus::new(serial, MockPin::new(), MockDelay::new());
        Actuator::new(bus, config)
    }

    #[test]
    fn torque_limit_from_physical_units() {
        assert_eq!(TorqueLimit::from_millinewton_metres(0).raw(), 0);
        assert_eq!(TorqueLimit::from_millinewton_metres(750).raw(), 512);
        assert_eq!(TorqueLimit::from_millinewton_metres(1_500).raw(), 1023);
        // Above full scale clamps, never wraps.
        assert_eq!(TorqueLimit::from_millinewton_metres(3_000).raw(), 1023);
    }

    #[test]
    fn torque_limit_from_raw_clamps() {
        assert_eq!(TorqueLimit::from_raw(512).raw(), 512);
        assert_eq!(TorqueLimit::from_raw(5_000).raw(), 1023);
    }

    #[test]
    fn combined_target_packs_little_endian() {
        let mut serial = MockSerial::new();
        serial.queue(&status_frame(1, 0x00, &[]));
        let mut servo = actuator(serial, ActuatorConfig::default());

        servo.position_velocity_torque(512, 100, 1023).unwrap();
        let (serial, _, _) = servo.release();
        let sent = serial.sent();
        assert_eq!(sent[4], 0x04); // REG_WRITE, committed later by ACTION
        assert_eq!(
            &sent[5..12],
            &[30, 0x00, 0x02, 0x64, 0x00, 0xFF, 0x03]
        );
    }

    #[test]
    fn torque_targets_respect_configured_ceiling() {
        let mut serial = MockSerial::new();
        serial.queue(&status_frame(1, 0x00, &[]));
        let config = ActuatorConfig {
            id: 1,
            torque_limit: TorqueLimit::from_raw(512),
        };
        let mut servo = actuator(serial, config);

        servo.target_torque(1023).unwrap();
        let (serial, _, _) = servo.release();
        // Address 34, then 512 little-endian.
        assert_eq!(&serial.sent()[5..8], &[34, 0x00, 0x02]);
    }

    #[test]
    fn present_state_decodes_three_words() {
        let mut serial = MockSerial::new();
        serial.queue(&status_frame(
            1,
            0x00,
            &[0x2C, 0x01, 0x00, 0x00, 0x10, 0x00],
        ));
        let mut servo = actuator(serial, ActuatorConfig::default());

        let state = servo.current_position_velocity_load().unwrap();
        assert_eq!(
            state,
            PresentState {
                position: 300,
                velocity: 0,
                load: 16,
            }
        );
    }

    #[test]
    fn status_decodes_flags() {
        let mut serial = MockSerial::new();
        // 11.9 V, 32 °C, staged write pending, not moving.
        serial.queue(&status_frame(1, 0x00, &[119, 32, 1, 0]));
        let mut servo = actuator(serial, ActuatorConfig::default());

        let status = servo.status().unwrap();
        assert_eq!(
            status,
            MotorStatus {
                voltage: 119,
                temperature: 32,
                registered: true,
                moving: false,
            }
        );
    }

    #[test]
    fn lifecycle_instructions_on_the_wire() {
        let mut serial = MockSerial::new();
        serial.queue(&status_frame(1, 0x00, &[]));
        serial.queue(&status_frame(1, 0x00, &[]));
        let mut servo = actuator(serial, ActuatorConfig::default());

        servo.ping().unwrap();
        servo.action().unwrap();
        let (serial, _, _) = servo.release();
        let sent = serial.sent();
        assert_eq!(&sent[..6], &[0xFF, 0xFF, 0x01, 0x02, 0x01, 0xFB]);
        assert_eq!(sent[6 + 4], 0x05); // ACTION
    }

    #[test]
    fn broadcast_lifecycle_expects_no_response() {
        // Nothing queued: a read attempt would fail with EmptyResponse.
        let config = ActuatorConfig {
            id: BROADCAST_ID,
            ..ActuatorConfig::default()
        };
        let mut servo = actuator(MockSerial::new(), config);
        servo.action().unwrap();
        let (serial, _, _) = servo.release();
        assert_eq!(serial.sent()[2], BROADCAST_ID);
        assert_eq!(serial.sent()[4], 0x05);
    }

    #[test]
    fn staged_write_then_action() {
        let mut serial = MockSerial::new();
        serial.queue(&status_frame(1, 0x00, &[]));
        serial.queue(&status_frame(1, 0x00, &[]));
        let mut servo = actuator(serial, ActuatorConfig::default());

        servo
            .set_register(Register::GoalPosition, &[0x00, 0x02])
            .unwrap();
        servo.action().unwrap();
        let (serial, _, _) = servo.release();
        let sent = serial.sent();
        assert_eq!(sent[4], 0x04); // REG_WRITE stages
        assert_eq!(sent[9 + 4], 0x05); // ACTION commits
    }

    #[test]
    fn last_known_reflects_targets() {
        let mut serial = MockSerial::new();
        serial.queue(&status_frame(1, 0x00, &[]));
        let mut servo = actuator(serial, ActuatorConfig::default());

        assert_eq!(servo.last_known(Register::GoalPosition), None);
        servo.target_position(512).unwrap();
        assert_eq!(
            servo.last_known(Register::GoalPosition),
            Some(&[0x00, 0x02][..])
        );
    }
}
