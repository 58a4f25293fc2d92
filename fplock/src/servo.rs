//! Door lock servo wrapper
//!
//! The actuator itself is a collaborator behind the `LockActuator` seam; the
//! core only flips between the two lock positions and tracks which one the
//! door is in. Angle sweeping/easing belongs to the actuator, not here.

use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use fplock_types::LockState;

pub type Result<T> = std::result::Result<T, ServoError>;

#[derive(Debug, thiserror::Error)]
pub enum ServoError {
    #[error("actuator I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hardware seam: something that can hold a servo at an angle
#[async_trait]
pub trait LockActuator: Send + Sync {
    async fn move_to(&mut self, angle: u16) -> Result<()>;
}

/// Sysfs PWM actuator: 50 Hz, 0.5-2.5 ms pulse width over 0-180 degrees
pub struct SysfsPwmActuator {
    duty_cycle_path: PathBuf,
}

impl SysfsPwmActuator {
    const MIN_PULSE_NS: u64 = 500_000;
    const MAX_PULSE_NS: u64 = 2_500_000;

    pub fn new(channel_dir: impl Into<PathBuf>) -> Self {
        Self {
            duty_cycle_path: channel_dir.into().join("duty_cycle"),
        }
    }

    fn pulse_ns(angle: u16) -> u64 {
        let angle = angle.min(180) as u64;
        Self::MIN_PULSE_NS + (Self::MAX_PULSE_NS - Self::MIN_PULSE_NS) * angle / 180
    }
}

#[async_trait]
impl LockActuator for SysfsPwmActuator {
    async fn move_to(&mut self, angle: u16) -> Result<()> {
        let pulse = Self::pulse_ns(angle);
        debug!(angle, pulse, "setting servo duty cycle");

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .open(&self.duty_cycle_path)?;
        write!(file, "{}", pulse)?;

        Ok(())
    }
}

/// No-hardware actuator for development hosts
#[derive(Default)]
pub struct NullActuator;

#[async_trait]
impl LockActuator for NullActuator {
    async fn move_to(&mut self, angle: u16) -> Result<()> {
        debug!(angle, "null actuator move");
        Ok(())
    }
}

/// Lock/unlock wrapper owning the current lock state
pub struct ServoLock {
    actuator: tokio::sync::Mutex<Box<dyn LockActuator>>,
    state: Mutex<LockState>,
    unlock_angle: u16,
    lock_angle: u16,
}

impl ServoLock {
    pub fn new(actuator: Box<dyn LockActuator>, unlock_angle: u16, lock_angle: u16) -> Self {
        Self {
            actuator: tokio::sync::Mutex::new(actuator),
            state: Mutex::new(LockState::Locked),
            unlock_angle,
            lock_angle,
        }
    }

    /// Move to the unlock position
    pub async fn unlock(&self) -> Result<LockState> {
        self.actuator.lock().await.move_to(self.unlock_angle).await?;
        *self.state.lock() = LockState::Unlocked;
        info!("door unlocked");
        Ok(LockState::Unlocked)
    }

    /// Move to the lock position
    pub async fn lock(&self) -> Result<LockState> {
        self.actuator.lock().await.move_to(self.lock_angle).await?;
        *self.state.lock() = LockState::Locked;
        info!("door locked");
        Ok(LockState::Locked)
    }

    /// Current lock state
    pub fn state(&self) -> LockState {
        *self.state.lock()
    }
}
