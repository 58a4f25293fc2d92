//! Daemon configuration
//!
//! TOML file with serde defaults for every field, so a missing file (first
//! run) and a partial file (older installs) both work. Parse errors are
//! fatal at boot; silently running with half a config is worse.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use fplock_core::constants;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub bridge: BridgeConfig,
    pub api: ApiConfig,
    pub lock: LockConfig,
    pub monitor: MonitorConfig,
    pub logs: LogConfig,
    pub registry: RegistryConfig,
}

/// Sensor module parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// 4-byte device address on the serial bus
    pub address: u32,

    /// Expected chip serial number; unset skips the boot check
    pub chip_sn: Option<String>,

    /// Template library capacity (slots 0..capacity)
    pub capacity: u16,

    /// Captures per enrollment
    pub enroll_count: u8,

    /// Minimum match score level for 1:N identification (1-5)
    pub score_level: u8,

    /// Per-read device timeout in seconds
    pub read_timeout_secs: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: fplock_core::DEFAULT_DEVICE_ADDRESS,
            chip_sn: None,
            capacity: constants::DEFAULT_CAPACITY,
            enroll_count: constants::DEFAULT_ENROLL_COUNT,
            score_level: constants::DEFAULT_SCORE_LEVEL,
            read_timeout_secs: constants::DEFAULT_READ_TIMEOUT,
        }
    }
}

impl DeviceConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

/// Serial-TCP bridge fronting the module's UART
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3333,
        }
    }
}

/// Control API listener
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Static bearer token; an empty token rejects every request
    pub token: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            token: String::new(),
        }
    }
}

/// Door lock servo
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Sysfs PWM channel directory; unset runs with a no-op actuator
    pub pwm_path: Option<PathBuf>,

    pub unlock_angle: u16,
    pub lock_angle: u16,

    /// Seconds the door stays unlocked after a match
    pub auto_lock_delay_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            pwm_path: None,
            unlock_angle: 145,
            lock_angle: 0,
            auto_lock_delay_secs: 3,
        }
    }
}

impl LockConfig {
    pub fn auto_lock_delay(&self) -> Duration {
        Duration::from_secs(self.auto_lock_delay_secs)
    }
}

/// Background identification loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub enabled_on_start: bool,

    /// Delay between polls when nothing matched (milliseconds)
    pub poll_delay_ms: u64,

    /// Backoff after a protocol failure (milliseconds)
    pub error_backoff_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled_on_start: true,
            poll_delay_ms: 200,
            error_backoff_ms: 5000,
        }
    }
}

impl MonitorConfig {
    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

/// Rotating log files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub prefix: String,

    /// Daily files kept before the oldest is pruned
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            prefix: "fplock".to_string(),
            max_files: 20,
        }
    }
}

/// Name registry persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub path: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("fingerprint_db.json"),
        }
    }
}

impl Config {
    /// Load from a TOML file; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;

        toml::from_str(&text)
            .with_context(|| format!("failed to parse config at {}", path.display()))
    }
}
