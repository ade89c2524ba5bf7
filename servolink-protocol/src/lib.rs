//! AX-series servo bus packet protocol
//!
//! Instruction packets travel from the master to an addressed device, and
//! status packets travel back, all over one shared half-duplex line.
//!
//! # Frame format
//!
//! ```text
//! ┌──────┬──────┬────┬────────┬─────────────┬────────────┬──────────┐
//! │ 0xFF │ 0xFF │ ID │ LENGTH │ INSTRUCTION │ PARAMS     │ CHECKSUM │
//! │ 1B   │ 1B   │ 1B │ 1B     │ 1B          │ 0–250B     │ 1B       │
//! └──────┴──────┴────┴────────┴─────────────┴────────────┴──────────┘
//! ```
//!
//! `LENGTH` is the parameter count plus two. The checksum is the bitwise
//! complement of the byte sum of ID, LENGTH, INSTRUCTION and every
//! parameter; the two marker bytes are excluded. Status packets share the
//! layout with the instruction byte replaced by a device error bitmask.
//! Multi-byte register values are little-endian.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod instruction;
pub mod packet;
pub mod status;

pub use instruction::{Instruction, BROADCAST_ID, MAX_DEVICE_ID};
pub use packet::{
    checksum, FrameError, InstructionPacket, StatusPacket, StatusParser, MAX_FRAME_SIZE,
    MAX_PARAMS, PACKET_HEADER,
};
pub use status::DeviceStatus;
