//! Service-level error type

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("protocol error: {0}")]
    Core(#[from] fplock_core::Error),

    #[error("transport error: {0}")]
    Transport(#[from] fplock_transport::Error),

    #[error("lock actuator error: {0}")]
    Servo(#[from] crate::servo::ServoError),
}

impl Error {
    /// Device confirm code carried by this error, if any
    pub fn device_code(&self) -> Option<u8> {
        match self {
            Self::Core(fplock_core::Error::Device { code, .. }) => Some(*code),
            _ => None,
        }
    }

    /// Failures the monitoring loop recovers from with a backoff
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Core(e) => e.is_recoverable(),
            Self::Transport(_) => true,
            Self::Servo(_) => false,
        }
    }
}
