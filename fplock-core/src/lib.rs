//! # fplock-core
//!
//! Core protocol implementation for HiLink-style fingerprint sensor modules.
//!
//! This crate provides the low-level protocol primitives:
//! - Packet structure and encoding/decoding
//! - Checksum calculation
//! - Command definitions and parameter flags
//! - Confirm-code table
//! - Protocol constants

pub mod checksum;
pub mod command;
pub mod confirm;
pub mod constants;
pub mod error;
pub mod flags;
pub mod packet;

pub use command::{Command, PacketType};
pub use error::{Error, Result};
pub use flags::{EnrollFlags, IdentifyFlags};
pub use packet::Packet;

/// Packet head constant at the start of every frame
pub const PACKET_HEAD: u16 = 0xEF01;

/// Factory-default device address
pub const DEFAULT_DEVICE_ADDRESS: u32 = 0xFFFF_FFFF;

/// Bytes of framing around the payload (head + address + type + length + checksum)
pub const FRAME_OVERHEAD: usize = 11;

/// Maximum payload size the 16-bit length field can describe
pub const MAX_PAYLOAD_SIZE: usize = 65535 - 2;
