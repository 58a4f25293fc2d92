//! Enrollment stream events
//!
//! One event per device acknowledgement, serialized verbatim onto the SSE
//! stream the control API exposes. The `status` tag and field names are part
//! of the wire contract with clients.

use serde::Serialize;

/// One step of an enrollment exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EnrollEvent {
    /// Non-terminal acknowledgement: the capture cycle is advancing
    Progress {
        message: String,
        code: u8,
        param1: u8,
        param2: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_capture: Option<u8>,
        total_captures: u8,
    },

    /// Template stored and registry updated
    Success { message: String, id: u16 },

    /// Terminal failure; `code` carries the device confirm code when one exists
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<u8>,
    },

    /// Enrollment stopped by a cancel request before completion
    Cancelled { message: String },
}

impl EnrollEvent {
    /// Terminal events end the stream
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_progress_json_shape() {
        let event = EnrollEvent::Progress {
            message: "Place finger for capture 2/6.".to_string(),
            code: 0x00,
            param1: 0x01,
            param2: 0x02,
            current_capture: Some(2),
            total_captures: 6,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"], "progress");
        assert_eq!(json["current_capture"], 2);
        assert_eq!(json["total_captures"], 6);
    }

    #[test]
    fn test_error_json_omits_missing_code() {
        let event = EnrollEvent::Error {
            message: "timed out".to_string(),
            code: None,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json.get("code").is_none());
    }

    #[test]
    fn test_terminal_classification() {
        assert!(EnrollEvent::Success {
            message: String::new(),
            id: 3
        }
        .is_terminal());
        assert!(EnrollEvent::Cancelled {
            message: String::new()
        }
        .is_terminal());
        assert!(!EnrollEvent::Progress {
            message: String::new(),
            code: 0,
            param1: 0,
            param2: 0,
            current_capture: None,
            total_captures: 6,
        }
        .is_terminal());
    }
}
