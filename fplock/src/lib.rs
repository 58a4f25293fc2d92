//! # fplock
//!
//! Fingerprint access-control daemon: drives a serial-attached fingerprint
//! sensor module, a servo door lock, and an HTTP control API.
//!
//! The pieces:
//! - [`sensor`] — the device protocol engine (enroll/identify/delete state
//!   machines over the framed packet protocol)
//! - [`registry`] — slot-to-name mapping, JSON-persisted
//! - [`monitor`] — the background identification loop and its pause gate
//! - [`servo`] — the door lock wrapper
//! - [`api`] — the control-plane request server
//!
//! All device I/O is serialized through one `Arc<Mutex<Sensor>>`; the
//! monitoring gate only schedules who gets the device next.

pub mod api;
pub mod cancel;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod registry;
pub mod sensor;
pub mod servo;

pub use cancel::CancelToken;
pub use config::Config;
pub use error::{Error, Result};
pub use monitor::MonitorControl;
pub use registry::Registry;
pub use sensor::Sensor;
pub use servo::ServoLock;
