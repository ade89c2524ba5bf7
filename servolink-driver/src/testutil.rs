//! In-memory transport doubles for exercising bus transactions

use core::convert::Infallible;

use heapless::Vec;
use servolink_hal::{OutputPin, SerialPort};
use servolink_protocol::checksum;

/// Loopback serial port: bytes written accumulate in `tx`, reads drain a
/// queue the test pre-loads with `queue`
#[derive(Debug, Default)]
pub struct MockSerial {
    rx: Vec<u8, 512>,
    rx_pos: usize,
    tx: Vec<u8, 512>,
    pub cleared: bool,
}

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load bytes for the next reads
    pub fn queue(&mut self, bytes: &[u8]) {
        self.rx.extend_from_slice(bytes).unwrap();
    }

    /// Everything written so far
    pub fn sent(&self) -> &[u8] {
        &self.tx
    }
}

impl SerialPort for MockSerial {
    type Error = Infallible;

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.tx.extend_from_slice(data).unwrap();
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let remaining = &self.rx[self.rx_pos..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.rx_pos += n;
        Ok(n)
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.rx_pos = self.rx.len();
        self.cleared = true;
        Ok(())
    }
}

/// Direction-control output that records its level
#[derive(Debug)]
pub struct MockPin {
    pub high: bool,
}

impl MockPin {
    pub fn new() -> Self {
        Self { high: false }
    }
}

impl OutputPin for MockPin {
    fn set_high(&mut self) {
        self.high = true;
    }

    fn set_low(&mut self) {
        self.high = false;
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}

/// Delay source that only accounts for the time it was asked to spend
#[derive(Debug, Default)]
pub struct MockDelay {
    pub total_ns: u64,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

/// Build a complete status frame with a valid trailing checksum
pub fn status_frame(id: u8, status: u8, params: &[u8]) -> Vec<u8, 64> {
    let mut frame: Vec<u8, 64> = Vec::new();
    frame.extend_from_slice(&[0xFF, 0xFF, id, params.len() as u8 + 2, status])
        .unwrap();
    frame.extend_from_slice(params).unwrap();
    let sum = checksum(&frame[2..]);
    frame.push(sum).unwrap();
    frame
}
