//! Servolink Hardware Abstraction Layer
//!
//! This crate defines the two hardware capabilities the bus driver needs,
//! as traits implemented by the host environment (Raspberry Pi, Jetson,
//! a microcontroller HAL, a test double). Selecting a backend happens
//! explicitly at construction time; nothing here probes hardware or takes
//! effect at load time.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (servolink-driver users)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  servolink-hal (this crate - traits)    │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ host serial + │       │ test doubles  │
//! │ GPIO backend  │       │               │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - the single direction-control output
//! - [`uart::SerialPort`] - byte-oriented duplex stream with a read timeout

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use gpio::OutputPin;
pub use uart::{DataBits, Parity, SerialConfig, SerialPort, StopBits};
