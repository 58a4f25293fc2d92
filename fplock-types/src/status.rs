//! Lock and monitoring status types

use std::fmt;

use serde::Serialize;

/// Door lock state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockState {
    Locked,
    Unlocked,
}

impl LockState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Background identification loop status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonitorStatus {
    /// Whether monitoring is switched on
    pub enabled: bool,

    /// Whether the loop is actually scanning (false while suspended)
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_state_json() {
        assert_eq!(
            serde_json::to_string(&LockState::Unlocked).unwrap(),
            "\"unlocked\""
        );
        assert_eq!(LockState::Locked.to_string(), "locked");
    }

    #[test]
    fn test_monitor_status_json() {
        let status = MonitorStatus {
            enabled: true,
            active: false,
        };
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["enabled"], true);
        assert_eq!(json["active"], false);
    }
}
