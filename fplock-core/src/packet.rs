//! Protocol packet structure and encoding/decoding

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    checksum,
    command::{Command, PacketType},
    error::{Error, Result},
    FRAME_OVERHEAD, PACKET_HEAD,
};

/// Sensor module protocol packet
///
/// # Packet Structure
///
/// ```text
/// ┌──────────┬──────────┬──────────┬──────────┬──────────┬──────────┐
/// │   Head   │ Address  │   Type   │  Length  │ Payload  │ Checksum │
/// │  2 bytes │  4 bytes │  1 byte  │  2 bytes │  N bytes │  2 bytes │
/// │  0xEF01  │ (BE u32) │          │ (BE u16) │          │ (BE u16) │
/// └──────────┴──────────┴──────────┴──────────┴──────────┴──────────┘
/// ```
///
/// All multi-byte values are big-endian. The length field counts the payload
/// plus the two checksum bytes; the checksum covers the type byte, both
/// length bytes and the payload.
///
/// # Examples
///
/// ```
/// use fplock_core::{Command, Packet, DEFAULT_DEVICE_ADDRESS};
///
/// let packet = Packet::command(DEFAULT_DEVICE_ADDRESS, Command::Cancel, []);
/// let decoded = Packet::decode(packet.encode()).unwrap();
/// assert_eq!(packet, decoded);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet-type identifier
    pub packet_type: PacketType,

    /// Device address the frame is for
    pub address: u32,

    /// Payload: command code + parameters, or confirm code + parameters
    pub payload: Bytes,
}

impl Packet {
    /// Create a packet with a raw payload
    pub fn new(packet_type: PacketType, address: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            packet_type,
            address,
            payload: payload.into(),
        }
    }

    /// Create a command packet: payload is the command code followed by its
    /// parameter bytes
    ///
    /// # Examples
    ///
    /// ```
    /// use fplock_core::{Command, Packet};
    ///
    /// let packet = Packet::command(0xFFFF_FFFF, Command::DeleteTemplate, [0x00, 0x05, 0x00, 0x01]);
    /// assert_eq!(packet.payload.len(), 5);
    /// ```
    pub fn command(address: u32, command: Command, params: impl AsRef<[u8]>) -> Self {
        let params = params.as_ref();
        let mut payload = BytesMut::with_capacity(1 + params.len());
        payload.put_u8(command.into());
        payload.put_slice(params);

        Self::new(PacketType::Command, address, payload.freeze())
    }

    /// Create an acknowledgement packet: payload is the confirm code followed
    /// by response parameters
    pub fn ack(address: u32, confirm: u8, params: impl AsRef<[u8]>) -> Self {
        let params = params.as_ref();
        let mut payload = BytesMut::with_capacity(1 + params.len());
        payload.put_u8(confirm);
        payload.put_slice(params);

        Self::new(PacketType::Ack, address, payload.freeze())
    }

    /// Value of the length field: payload plus the two checksum bytes
    pub fn length_field(&self) -> u16 {
        (self.payload.len() + 2) as u16
    }

    /// Calculate the checksum for this packet
    pub fn checksum(&self) -> u16 {
        checksum::calculate(self.packet_type.into(), self.length_field(), &self.payload)
    }

    /// Encode the packet into a complete frame
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(FRAME_OVERHEAD + self.payload.len());

        buf.put_u16(PACKET_HEAD);
        buf.put_u32(self.address);
        buf.put_u8(self.packet_type.into());
        buf.put_u16(self.length_field());
        buf.put_slice(&self.payload);
        buf.put_u16(self.checksum());

        buf
    }

    /// Decode one complete frame
    ///
    /// # Errors
    ///
    /// - [`Error::FrameTooShort`] if the buffer cannot hold the framing or the
    ///   declared length
    /// - [`Error::BadMagic`] if the frame does not start with 0xEF01
    /// - [`Error::UnknownPacketType`] for an unrecognised type byte
    /// - [`Error::LengthMismatch`] if the length field is below 2
    /// - [`Error::ChecksumMismatch`] if the trailing checksum does not match
    pub fn decode(mut buf: BytesMut) -> Result<Self> {
        if buf.len() < FRAME_OVERHEAD {
            return Err(Error::FrameTooShort {
                expected: FRAME_OVERHEAD,
                actual: buf.len(),
            });
        }

        let head = buf.get_u16();
        if head != PACKET_HEAD {
            return Err(Error::BadMagic { found: head });
        }

        let address = buf.get_u32();
        let packet_type = PacketType::try_from(buf.get_u8())?;

        let length = buf.get_u16();
        if length < 2 {
            return Err(Error::LengthMismatch { declared: length });
        }
        if buf.remaining() < length as usize {
            return Err(Error::FrameTooShort {
                expected: length as usize,
                actual: buf.remaining(),
            });
        }

        let payload = buf.split_to(length as usize - 2).freeze();
        let received = buf.get_u16();

        let packet = Self {
            packet_type,
            address,
            payload,
        };

        let expected = packet.checksum();
        if expected != received {
            return Err(Error::ChecksumMismatch { expected, received });
        }

        Ok(packet)
    }

    /// Confirm code of an acknowledgement packet
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedPacket`] if this is not an ack,
    /// [`Error::EmptyAck`] if the payload is empty.
    pub fn confirm_code(&self) -> Result<u8> {
        if !self.packet_type.is_ack() {
            return Err(Error::UnexpectedPacket {
                expected: PacketType::Ack,
                found: self.packet_type,
            });
        }

        self.payload.first().copied().ok_or(Error::EmptyAck)
    }

    /// Response parameters of an acknowledgement (bytes after the confirm code)
    pub fn ack_params(&self) -> &[u8] {
        self.payload.get(1..).unwrap_or(&[])
    }

    /// Payload command code of a command packet
    pub fn command_code(&self) -> Result<Command> {
        let raw = self.payload.first().copied().ok_or(Error::EmptyAck)?;
        Command::try_from(raw)
    }

    /// Total encoded frame size
    pub fn size(&self) -> usize {
        FRAME_OVERHEAD + self.payload.len()
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("packet_type", &self.packet_type)
            .field("address", &format!("0x{:08X}", self.address))
            .field("checksum", &format!("0x{:04X}", self.checksum()))
            .field("payload", &hex::encode(&self.payload))
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Packet[{}](addr=0x{:08X}, len={})",
            self.packet_type,
            self.address,
            self.payload.len()
        )
    }
}
