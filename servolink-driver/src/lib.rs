//! AX-series servo bus driver
//!
//! One controlling host, one shared half-duplex line, many addressed
//! servos. This crate layers the application-facing pieces on top of
//! [`servolink_protocol`]:
//!
//! - [`bus::Bus`] - owns the serial transport and the direction-control
//!   output; sequences write-then-switch-to-receive with the turnaround
//!   hold the devices require
//! - [`registers::DeviceRegisterMap`] - every named register of the
//!   persistent (EEPROM) and volatile (RAM) regions, with typed get/set
//!   and access checking
//! - [`actuator::Actuator`] - position/velocity/torque targets, combined
//!   status reads and lifecycle commands composed from register cells
//!
//! Everything is synchronous and blocking: the bus is a single shared
//! resource, so a transaction runs to completion before the next may
//! start, enforced by `&mut` ownership. Reads block no longer than the
//! transport's configured timeout. There are no retries anywhere in this
//! crate; retry policy belongs to the caller.

#![no_std]
#![deny(unsafe_code)]

pub mod actuator;
pub mod bus;
pub mod registers;

#[cfg(test)]
mod testutil;

pub use actuator::{Actuator, ActuatorConfig, MotorStatus, PresentState, TorqueLimit};
pub use bus::{Bus, Direction, Error, TURNAROUND_DELAY_US};
pub use registers::{Access, DeviceRegisterMap, Region, Register, RegisterCell};
