//! Digital output abstraction
//!
//! The bus driver owns exactly one digital output: the half-duplex
//! direction control line. Implementations handle the actual register
//! or sysfs manipulation for the specific host.

/// Digital output pin
///
/// The driver assumes exclusive ownership of the pin for its whole
/// lifetime; implementations do not need to be shareable.
pub trait OutputPin {
    /// Drive the pin high (logic 1)
    fn set_high(&mut self);

    /// Drive the pin low (logic 0)
    fn set_low(&mut self);

    /// Drive the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Check if the pin is currently driven high
    fn is_set_high(&self) -> bool;

    /// Check if the pin is currently driven low
    fn is_set_low(&self) -> bool {
        !self.is_set_high()
    }
}
