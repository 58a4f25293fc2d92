//! Command and packet-type definitions
//!
//! Command codes from the module's communication manual. Only the commands
//! the access-control workflow uses are modelled; anything else decodes to
//! an `UnknownCommand` error so corrupted frames never alias a real command.

use std::fmt;

use crate::error::{Error, Result};

/// Packet-type identifier byte
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// Command packet (host to module)
    Command = 0x01,

    /// Data packet (multi-frame transfers)
    Data = 0x02,

    /// Acknowledgement packet (module to host)
    Ack = 0x07,

    /// Final data packet of a transfer
    EndData = 0x08,
}

impl PacketType {
    /// Check if this packet type carries a confirm code in its first payload byte
    pub fn is_ack(self) -> bool {
        matches!(self, Self::Ack)
    }
}

impl From<PacketType> for u8 {
    fn from(pt: PacketType) -> u8 {
        pt as u8
    }
}

impl TryFrom<u8> for PacketType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::Command),
            0x02 => Ok(Self::Data),
            0x07 => Ok(Self::Ack),
            0x08 => Ok(Self::EndData),
            _ => Err(Error::UnknownPacketType(value)),
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Command => "PID_COMMAND",
            Self::Data => "PID_DATA",
            Self::Ack => "PID_ACK",
            Self::EndData => "PID_END_DATA",
        };
        write!(f, "{}(0x{:02X})", name, *self as u8)
    }
}

/// Protocol command codes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Composite enrollment: capture cycles, merge, duplicate check, store
    AutoEnroll = 0x31,

    /// Composite 1:N identification against the whole template library
    AutoIdentify = 0x32,

    /// Delete one or more templates starting at a slot
    DeleteTemplate = 0x0C,

    /// Abort an in-flight auto operation on the module
    Cancel = 0x30,

    /// Read the module's 32-byte chip serial number
    ReadChipSn = 0x34,

    /// Assign a new 4-byte device address
    SetAddress = 0x15,

    /// Soft-reset the module
    Reset = 0x3B,

    /// Drive the ring LED (off, blink, breathe)
    LedControl = 0x3C,
}

impl Command {
    /// Get the manual's name for this command
    pub fn name(self) -> &'static str {
        match self {
            Self::AutoEnroll => "PS_AutoEnroll",
            Self::AutoIdentify => "PS_AutoIdentify",
            Self::DeleteTemplate => "PS_DeletChar",
            Self::Cancel => "PS_Cancel",
            Self::ReadChipSn => "PS_GetChipSN",
            Self::SetAddress => "PS_SetChipAddr",
            Self::Reset => "PS_Reset",
            Self::LedControl => "PS_ControlBLN",
        }
    }
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> u8 {
        cmd as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x31 => Ok(Self::AutoEnroll),
            0x32 => Ok(Self::AutoIdentify),
            0x0C => Ok(Self::DeleteTemplate),
            0x30 => Ok(Self::Cancel),
            0x34 => Ok(Self::ReadChipSn),
            0x15 => Ok(Self::SetAddress),
            0x3B => Ok(Self::Reset),
            0x3C => Ok(Self::LedControl),
            _ => Err(Error::UnknownCommand(value)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}
