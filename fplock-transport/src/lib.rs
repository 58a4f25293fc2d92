//! Byte transport to the fingerprint sensor module
//!
//! The module speaks a framed protocol over its UART. The daemon reaches the
//! UART through whatever carries the bytes; the shipped implementation talks
//! to a serial-TCP bridge. The `Transport` trait keeps the protocol engine
//! independent of the carrier, and the mock implementation drives it with
//! scripted exchanges in tests.

pub mod error;
pub mod mock;
pub mod tcp;

pub use error::{Error, Result};
pub use mock::{MockHandle, MockTransport};
pub use tcp::TcpTransport;

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// Transport trait for the byte link to the sensor module
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the link
    async fn connect(&mut self) -> Result<()>;

    /// Tear the link down
    async fn disconnect(&mut self) -> Result<()>;

    /// Check if the link is up
    fn is_connected(&self) -> bool;

    /// Send raw bytes
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Read exactly `n` bytes within `deadline`
    ///
    /// A device silent (or short) past the deadline yields
    /// [`Error::ReadTimeout`]; the caller decides whether that is fatal.
    async fn read_exact(&mut self, n: usize, deadline: Duration) -> Result<BytesMut>;

    /// Describe the remote end for logging
    fn remote_addr(&self) -> String;
}
