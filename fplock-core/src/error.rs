//! Error types for fplock-core

use crate::command::PacketType;
use crate::confirm;

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Frame is too short to be valid
    #[error("frame too short: expected at least {expected} bytes, got {actual} bytes")]
    FrameTooShort { expected: usize, actual: usize },

    /// Frame does not start with the packet head constant
    #[error("bad packet head: expected 0xEF01, found 0x{found:04X}")]
    BadMagic { found: u16 },

    /// Unknown packet-type byte
    #[error("unknown packet type: 0x{0:02X}")]
    UnknownPacketType(u8),

    /// Unknown command code
    #[error("unknown command code: 0x{0:02X}")]
    UnknownCommand(u8),

    /// Declared length field cannot describe a valid frame
    #[error("invalid length field: {declared} (must be at least 2)")]
    LengthMismatch { declared: u16 },

    /// Checksum verification failed
    #[error("checksum mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    ChecksumMismatch { expected: u16, received: u16 },

    /// Received a packet of the wrong type for the current exchange
    #[error("unexpected packet type: expected {expected}, found {found}")]
    UnexpectedPacket {
        expected: PacketType,
        found: PacketType,
    },

    /// Acknowledgement payload missing its confirm code
    #[error("acknowledgement payload is empty")]
    EmptyAck,

    /// Device silent past the read deadline
    #[error("timeout waiting for response after {seconds}s")]
    Timeout { seconds: u64 },

    /// Module rejected the operation with a non-zero confirm code
    #[error("device error 0x{code:02X}: {message}")]
    Device { code: u8, message: String },

    /// Exchange exceeded the expected acknowledgement bound
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Slot outside the configured library capacity
    #[error("slot {slot} out of range (capacity {capacity})")]
    SlotOutOfRange { slot: u16, capacity: u16 },
}

impl Error {
    /// Build a `Device` error from a raw confirm code using the manual's table
    pub fn device(code: u8) -> Self {
        Self::Device {
            code,
            message: confirm::message(code),
        }
    }

    /// Check if error is recoverable (the next exchange may succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Device { .. }
                | Self::ChecksumMismatch { .. }
                | Self::FrameTooShort { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_uses_table() {
        let err = Error::device(0x0B);
        assert_eq!(
            err.to_string(),
            "device error 0x0B: library access address out of range"
        );
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(Error::Timeout { seconds: 30 }.is_recoverable());
        assert!(Error::device(0x09).is_recoverable());
        assert!(!Error::SlotOutOfRange { slot: 200, capacity: 100 }.is_recoverable());
    }
}
