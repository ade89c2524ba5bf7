//! Serial transport abstraction
//!
//! The servo bus is a single shared line, so the transport is a plain
//! byte-oriented duplex stream. The one behavior the driver relies on is
//! the read timeout: a read call returns once the buffer is full or the
//! configured timeout has elapsed, never blocking indefinitely.

/// Byte-oriented duplex serial transport
pub trait SerialPort {
    /// Error type for transport operations
    type Error;

    /// Write the whole buffer to the line
    ///
    /// Blocks until every byte has been handed to the transmitter or an
    /// error occurs.
    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Read into `buf`, blocking until it is full or the configured read
    /// timeout elapses
    ///
    /// Returns the number of bytes actually read; `0` means the timeout
    /// passed without a single byte arriving.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Discard any buffered input and output without interpreting it
    fn clear(&mut self) -> Result<(), Self::Error>;
}

/// Serial transport configuration
///
/// Defaults match the servo bus line settings: 1 Mbaud, 8N1, with a
/// one-second read timeout.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
    /// Read timeout in milliseconds
    pub read_timeout_ms: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baudrate: 1_000_000,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            read_timeout_ms: 1_000,
        }
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_bus_line_settings() {
        let cfg = SerialConfig::default();
        assert_eq!(cfg.baudrate, 1_000_000);
        assert_eq!(cfg.data_bits, DataBits::Eight);
        assert_eq!(cfg.parity, Parity::None);
        assert_eq!(cfg.stop_bits, StopBits::One);
        assert_eq!(cfg.read_timeout_ms, 1_000);
    }
}
