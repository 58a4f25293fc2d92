//! Fingerprint registry records

use serde::{Deserialize, Serialize};

/// One enrolled fingerprint: a sensor slot and the person it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    /// Sensor library slot (unique key)
    pub slot: u16,

    /// Human-readable name
    pub name: String,
}

impl FingerprintRecord {
    pub fn new(slot: u16, name: impl Into<String>) -> Self {
        Self {
            slot,
            name: name.into(),
        }
    }
}
