//! Half-duplex bus driver
//!
//! The bus has one signal line shared by transmit and receive, steered by
//! a single direction-control output: high drives the master's
//! transmitter onto the line, low listens. After sending a frame the
//! master must hold transmit for the device's internal processing delay
//! (at least 30 µs) before switching around to receive.

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use servolink_hal::{OutputPin, SerialPort};
use servolink_protocol::{FrameError, Instruction, InstructionPacket, StatusParser, MAX_PARAMS};

use crate::registers::{Access, Register};

/// Minimum hold time between the end of a transmission and switching the
/// line around to receive, in microseconds
pub const TURNAROUND_DELAY_US: u32 = 30;

/// Direction of the shared line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Master drives the line
    Transmit,
    /// Master listens; a device may drive the line
    Receive,
}

/// Errors surfaced by bus transactions
///
/// Codec and transport failures are raised immediately and propagate
/// unchanged through the register and actuator layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Transport failure
    Serial(E),
    /// Malformed or faulted response frame
    Frame(FrameError),
    /// Register access rights do not permit the operation
    Access { register: Register, access: Access },
    /// Value byte count does not match the register length
    ValueLength {
        register: Register,
        expected: u8,
        actual: usize,
    },
    /// A read addressed to the broadcast id can never complete
    BroadcastRead,
}

impl<E> From<FrameError> for Error<E> {
    fn from(err: FrameError) -> Self {
        Self::Frame(err)
    }
}

/// Driver for one half-duplex servo bus
///
/// Owns the serial transport, the direction-control output and a delay
/// source for the whole of its lifetime. Exclusive `&mut` access to the
/// bus is what serializes transactions; a second logical controller on
/// the same line must share this value behind a mutex.
pub struct Bus<S, D, T> {
    serial: S,
    direction_pin: D,
    delay: T,
    direction: Direction,
}

impl<S, D, T> Bus<S, D, T>
where
    S: SerialPort,
    D: OutputPin,
    T: DelayNs,
{
    /// Take ownership of the transport and direction output
    ///
    /// The line starts in the transmit state, matching the master's idle
    /// posture on this bus.
    pub fn new(serial: S, mut direction_pin: D, delay: T) -> Self {
        direction_pin.set_high();
        Self {
            serial,
            direction_pin,
            delay,
            direction: Direction::Transmit,
        }
    }

    /// Current direction of the line
    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn set_direction(&mut self, direction: Direction) {
        self.direction_pin
            .set_state(matches!(direction, Direction::Transmit));
        self.direction = direction;
    }

    /// Send one instruction packet
    ///
    /// Forces the line to transmit, sends the encoded frame, then holds
    /// transmit for [`TURNAROUND_DELAY_US`] so the addressed device has
    /// its processing window before any read switches the line around.
    pub fn write(
        &mut self,
        id: u8,
        instruction: Instruction,
        params: &[u8],
    ) -> Result<(), Error<S::Error>> {
        self.set_direction(Direction::Transmit);
        let packet = InstructionPacket::new(id, instruction, params)?;
        let frame = packet.encode_to_vec()?;
        self.serial.write_all(&frame).map_err(Error::Serial)?;
        self.delay.delay_us(TURNAROUND_DELAY_US);
        Ok(())
    }

    /// Receive and validate one status packet, returning its parameters
    ///
    /// Forces the line to receive and leaves it there; the next `write`
    /// performs the transition back. Never call this for a
    /// broadcast-targeted instruction - broadcast suppresses responses,
    /// so the read would only run out the timeout.
    pub fn read(&mut self, expected_id: u8) -> Result<Vec<u8, MAX_PARAMS>, Error<S::Error>> {
        self.set_direction(Direction::Receive);
        let mut parser = StatusParser::new(expected_id);

        let mut prefix = [0u8; 4];
        let got = self.serial.read(&mut prefix).map_err(Error::Serial)?;
        if got == 0 {
            return Err(FrameError::EmptyResponse.into());
        }
        // A frame is at least six bytes, so the prefix alone cannot
        // complete one; feeding it validates markers, id and length.
        let _ = parser.feed_bytes(&prefix[..got])?;
        if got < prefix.len() {
            return Err(FrameError::TruncatedResponse.into());
        }

        // LENGTH was range-checked by the parser above.
        let length = prefix[3] as usize;
        let mut body = [0u8; MAX_PARAMS + 2];
        let body = &mut body[..length];
        let got = self.serial.read(body).map_err(Error::Serial)?;
        if got < body.len() {
            return Err(FrameError::TruncatedResponse.into());
        }
        match parser.feed_bytes(body)? {
            Some(packet) => Ok(packet.params),
            None => Err(FrameError::TruncatedResponse.into()),
        }
    }

    /// Discard buffered input and output without protocol interpretation
    pub fn flush(&mut self) -> Result<(), Error<S::Error>> {
        self.serial.clear().map_err(Error::Serial)
    }

    /// Shut the bus down and hand the hardware back
    ///
    /// Drives the direction output to the receive level first: that is
    /// the state in which this master cannot corrupt anyone else's frame
    /// on the shared line.
    pub fn release(mut self) -> (S, D, T) {
        self.set_direction(Direction::Receive);
        let Self {
            serial,
            direction_pin,
            delay,
            ..
        } = self;
        (serial, direction_pin, delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{status_frame, MockDelay, MockPin, MockSerial};

    fn bus(serial: MockSerial) -> Bus<MockSerial, MockPin, MockDelay> {
        Bus::new(serial, MockPin::new(), MockDelay::new())
    }

    #[test]
    fn starts_in_transmit() {
        let bus = bus(MockSerial::new());
        assert_eq!(bus.direction(), Direction::Transmit);
        let (_, pin, _) = bus.release();
        assert!(!pin.high); // release flips to receive
    }

    #[test]
    fn write_sends_frame_and_holds_transmit() {
        let mut bus = bus(MockSerial::new());
        bus.write(1, Instruction::Ping, &[]).unwrap();
        assert_eq!(bus.direction(), Direction::Transmit);
        let (serial, pin, delay) = bus.release();
        assert_eq!(serial.sent(), &[0xFF, 0xFF, 0x01, 0x02, 0x01, 0xFB]);
        assert!(!pin.high);
        assert!(delay.total_ns >= u64::from(TURNAROUND_DELAY_US) * 1_000);
    }

    #[test]
    fn read_switches_to_receive_and_decodes() {
        let mut serial = MockSerial::new();
        serial.queue(&status_frame(1, 0x00, &[0x2C, 0x01]));
        let mut bus = bus(serial);

        let params = bus.read(1).unwrap();
        assert_eq!(&params[..], &[0x2C, 0x01]);
        // No auto-return to transmit.
        assert_eq!(bus.direction(), Direction::Receive);
    }

    #[test]
    fn next_write_returns_to_transmit() {
        let mut serial = MockSerial::new();
        serial.queue(&status_frame(1, 0x00, &[]));
        let mut bus = bus(serial);

        bus.read(1).unwrap();
        assert_eq!(bus.direction(), Direction::Receive);
        bus.write(1, Instruction::Action, &[]).unwrap();
        assert_eq!(bus.direction(), Direction::Transmit);
    }

    #[test]
    fn silent_line_is_empty_response() {
        let mut bus = bus(MockSerial::new());
        assert_eq!(bus.read(1), Err(Error::Frame(FrameError::EmptyResponse)));
    }

    #[test]
    fn short_prefix_is_truncated() {
        let mut serial = MockSerial::new();
        serial.queue(&[0xFF, 0xFF]);
        let mut bus = bus(serial);
        assert_eq!(
            bus.read(1),
            Err(Error::Frame(FrameError::TruncatedResponse))
        );
    }

    #[test]
    fn short_body_is_truncated() {
        let mut serial = MockSerial::new();
        // Declares two parameter bytes but delivers only the status byte.
        serial.queue(&[0xFF, 0xFF, 0x01, 0x04, 0x00]);
        let mut bus = bus(serial);
        assert_eq!(
            bus.read(1),
            Err(Error::Frame(FrameError::TruncatedResponse))
        );
    }

    #[test]
    fn garbage_prefix_is_header_mismatch() {
        let mut serial = MockSerial::new();
        serial.queue(&[0x00, 0xFF, 0x01, 0x02]);
        let mut bus = bus(serial);
        assert_eq!(
            bus.read(1),
            Err(Error::Frame(FrameError::HeaderMismatch { found: 0x00 }))
        );
    }

    #[test]
    fn device_fault_propagates_bitmask() {
        let mut serial = MockSerial::new();
        serial.queue(&status_frame(1, 0x04, &[]));
        let mut bus = bus(serial);
        match bus.read(1) {
            Err(Error::Frame(FrameError::DeviceFault(status))) => {
                assert!(status.overheating());
                assert_eq!(status.bits(), 0x04);
            }
            other => panic!("expected DeviceFault, got {other:?}"),
        }
    }

    #[test]
    fn flush_discards_buffered_bytes() {
        let mut serial = MockSerial::new();
        serial.queue(&[0xAA, 0xBB]);
        let mut bus = bus(serial);
        bus.flush().unwrap();
        assert_eq!(bus.read(1), Err(Error::Frame(FrameError::EmptyResponse)));
    }
}
