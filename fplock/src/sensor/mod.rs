//! Device protocol engine
//!
//! Drives the fingerprint module's command/acknowledgement exchanges over a
//! byte transport: one command elicits one ack, except enrollment, which
//! streams a bounded sequence of acks (see [`enroll`](Sensor::enroll)).
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use fplock::registry::Registry;
//! use fplock::sensor::Sensor;
//! use fplock_transport::{TcpTransport, Transport};
//!
//! #[tokio::main]
//! async fn main() -> fplock::Result<()> {
//!     let registry = Arc::new(Registry::load("fingerprint_db.json"));
//!     let mut transport = TcpTransport::new("127.0.0.1", 3333);
//!     transport.connect().await?;
//!
//!     let mut sensor = Sensor::new(Box::new(transport), 0xFFFF_FFFF, registry);
//!     let outcome = sensor.identify().await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

mod enroll;

use std::sync::Arc;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, info, trace, warn};

use fplock_core::{
    confirm,
    constants::{self, led},
    Command, Error as CoreError, IdentifyFlags, Packet, PACKET_HEAD,
};
use fplock_transport::{Error as TransportError, Transport};
use fplock_types::IdentifyOutcome;

use crate::error::{Error, Result};
use crate::registry::Registry;

/// Fingerprint sensor module driver
pub struct Sensor {
    transport: Box<dyn Transport>,
    address: u32,
    registry: Arc<Registry>,
    read_timeout: Duration,
    enroll_count: u8,
    score_level: u8,
    capacity: u16,
}

impl Sensor {
    /// Create a new engine over an established transport
    pub fn new(transport: Box<dyn Transport>, address: u32, registry: Arc<Registry>) -> Self {
        Self {
            transport,
            address,
            registry,
            read_timeout: Duration::from_secs(constants::DEFAULT_READ_TIMEOUT),
            enroll_count: constants::DEFAULT_ENROLL_COUNT,
            score_level: constants::DEFAULT_SCORE_LEVEL,
            capacity: constants::DEFAULT_CAPACITY,
        }
    }

    /// Set the per-read device timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the number of captures per enrollment
    pub fn with_enroll_count(mut self, count: u8) -> Self {
        self.enroll_count = count;
        self
    }

    /// Set the minimum match score level for identification
    pub fn with_score_level(mut self, level: u8) -> Self {
        self.score_level = level;
        self
    }

    /// Set the template library capacity
    pub fn with_capacity(mut self, capacity: u16) -> Self {
        self.capacity = capacity;
        self
    }

    /// Run one 1:N identification attempt
    ///
    /// A device-reported operation timeout (nobody touched the sensor) is a
    /// quiet `NoMatch` with no LED feedback; everything else blinks.
    pub async fn identify(&mut self) -> Result<IdentifyOutcome> {
        let mut params = BytesMut::with_capacity(5);
        params.put_u8(self.score_level);
        params.put_u16(constants::WILDCARD_SLOT);
        params.put_u16(IdentifyFlags::daemon_default().bits());

        let (code, resp) = self.exchange(Command::AutoIdentify, &params).await?;

        match code {
            confirm::SUCCESS if resp.len() >= 5 => {
                let slot = u16::from_be_bytes([resp[1], resp[2]]);
                let score = u16::from_be_bytes([resp[3], resp[4]]);
                let name = self.registry.get(slot);

                info!(
                    slot,
                    score,
                    name = name.as_deref().unwrap_or("<unregistered>"),
                    "fingerprint matched"
                );
                self.feedback(led::GREEN, Duration::from_secs(2), 1).await;

                Ok(IdentifyOutcome::Matched { slot, score, name })
            }
            confirm::SUCCESS => {
                warn!(params = %hex::encode(&resp), "match ack with short parameters");
                self.feedback(led::RED, Duration::from_millis(400), 3).await;
                Ok(IdentifyOutcome::NoMatch)
            }
            confirm::NO_MATCH => {
                debug!("no fingerprint match");
                self.feedback(led::RED, Duration::from_millis(400), 3).await;
                Ok(IdentifyOutcome::NoMatch)
            }
            // Nobody touched the sensor within the module's window
            confirm::DEVICE_TIMEOUT => Ok(IdentifyOutcome::NoMatch),
            code => {
                self.feedback(led::RED, Duration::from_millis(400), 3).await;
                Err(CoreError::device(code).into())
            }
        }
    }

    /// Delete the template in `slot` and drop its registry entry
    pub async fn delete(&mut self, slot: u16) -> Result<()> {
        if slot >= self.capacity {
            return Err(CoreError::SlotOutOfRange {
                slot,
                capacity: self.capacity,
            }
            .into());
        }

        let mut params = BytesMut::with_capacity(4);
        params.put_u16(slot);
        params.put_u16(1); // delete a single template

        let (code, _) = self.exchange(Command::DeleteTemplate, &params).await?;

        if code != confirm::SUCCESS {
            return Err(CoreError::device(code).into());
        }

        if self.registry.remove(slot).is_none() {
            warn!(slot, "template deleted on module but slot missing from registry");
        }

        info!(slot, "fingerprint deleted");
        Ok(())
    }

    /// Ask the module to abort an in-flight auto operation
    pub async fn cancel_operation(&mut self) -> Result<()> {
        let (code, _) = self.exchange(Command::Cancel, &[]).await?;

        if code != confirm::SUCCESS {
            warn!(code = format!("0x{code:02X}"), "module rejected cancel");
            return Err(CoreError::device(code).into());
        }

        debug!("cancel acknowledged by module");
        Ok(())
    }

    /// Read the module's 32-byte chip serial number as uppercase hex
    pub async fn read_chip_sn(&mut self) -> Result<String> {
        let (code, resp) = self.exchange(Command::ReadChipSn, &[]).await?;

        if code != confirm::SUCCESS {
            return Err(CoreError::device(code).into());
        }
        if resp.len() < constants::CHIP_SN_LEN {
            return Err(CoreError::Protocol(format!(
                "short serial-number response: {} bytes",
                resp.len()
            ))
            .into());
        }

        Ok(hex::encode_upper(&resp[..constants::CHIP_SN_LEN]))
    }

    /// Assign a new device address; subsequent frames use it
    pub async fn set_address(&mut self, address: u32) -> Result<()> {
        let mut params = BytesMut::with_capacity(4);
        params.put_u32(address);

        let (code, _) = self.exchange(Command::SetAddress, &params).await?;

        if code != confirm::SUCCESS {
            return Err(CoreError::device(code).into());
        }

        self.address = address;
        info!(address = format!("0x{address:08X}"), "device address updated");
        Ok(())
    }

    /// Soft-reset the module
    pub async fn reset(&mut self) -> Result<()> {
        let (code, _) = self.exchange(Command::Reset, &[]).await?;

        if code != confirm::SUCCESS {
            return Err(CoreError::device(code).into());
        }
        Ok(())
    }

    /// Turn the ring LED off
    pub async fn led_off(&mut self) -> Result<()> {
        let (code, _) = self
            .exchange(Command::LedControl, &[led::FUNC_OFF, 0x00, 0x00, 0x00])
            .await?;

        if code != confirm::SUCCESS {
            return Err(CoreError::device(code).into());
        }
        Ok(())
    }

    /// Blink the ring LED `count` times for `duration` each
    pub async fn blink_led(&mut self, color: u8, duration: Duration, count: u8) -> Result<()> {
        // Module time units are 100 ms
        let time_param = (duration.as_millis() / 100).clamp(1, 100) as u8;
        let params = [led::FUNC_BLINK, color, led::DUTY_DEFAULT, count, time_param];

        let (code, _) = self.exchange(Command::LedControl, &params).await?;

        if code != confirm::SUCCESS {
            return Err(CoreError::device(code).into());
        }
        Ok(())
    }

    /// LED feedback is best-effort; a failure never fails the operation
    async fn feedback(&mut self, color: u8, duration: Duration, count: u8) {
        if let Err(e) = self.blink_led(color, duration, count).await {
            debug!(error = %e, "led feedback failed");
        }
    }

    /// One command, one acknowledgement
    pub(crate) async fn exchange(
        &mut self,
        command: Command,
        params: &[u8],
    ) -> Result<(u8, Bytes)> {
        let packet = Packet::command(self.address, command, params);
        self.send_packet(&packet).await?;
        self.read_ack().await
    }

    pub(crate) async fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        trace!("sending {:?}", packet);

        let data = packet.encode();
        self.transport.send(&data).await?;

        Ok(())
    }

    /// Read one ack and split it into confirm code and parameters
    pub(crate) async fn read_ack(&mut self) -> Result<(u8, Bytes)> {
        let packet = self.read_packet().await?;
        let code = packet.confirm_code()?;
        let params = packet.payload.slice(1..);

        Ok((code, params))
    }

    /// Staged frame read: head+address, type+length, then the declared body
    ///
    /// Each stage has the full read deadline; a short read is a typed
    /// timeout so callers can distinguish a silent device from corruption.
    async fn read_packet(&mut self) -> Result<Packet> {
        let head_addr = self.read_exact(6).await?;

        let head = u16::from_be_bytes([head_addr[0], head_addr[1]]);
        if head != PACKET_HEAD {
            return Err(CoreError::BadMagic { found: head }.into());
        }

        let type_len = self.read_exact(3).await?;
        let length = u16::from_be_bytes([type_len[1], type_len[2]]);
        if length < 2 {
            return Err(CoreError::LengthMismatch { declared: length }.into());
        }

        let body = self.read_exact(length as usize).await?;

        let mut frame = BytesMut::with_capacity(9 + length as usize);
        frame.extend_from_slice(&head_addr);
        frame.extend_from_slice(&type_len);
        frame.extend_from_slice(&body);

        let packet = Packet::decode(frame)?;
        trace!("received {:?}", packet);

        Ok(packet)
    }

    async fn read_exact(&mut self, n: usize) -> Result<BytesMut> {
        match self.transport.read_exact(n, self.read_timeout).await {
            Ok(buf) => Ok(buf),
            Err(TransportError::ReadTimeout) => Err(CoreError::Timeout {
                seconds: self.read_timeout.as_secs(),
            }
            .into()),
            Err(e) => Err(Error::Transport(e)),
        }
    }
}
