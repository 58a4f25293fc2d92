//! Confirm-code table
//!
//! Every acknowledgement carries a 1-byte confirm code; 0x00 is success.
//! The table follows pages 7-8 of the module manual.

/// Command executed
pub const SUCCESS: u8 = 0x00;

/// 1:N search found no matching template
pub const NO_MATCH: u8 = 0x09;

/// Library slot address out of range
pub const ADDRESS_OUT_OF_RANGE: u8 = 0x0B;

/// Template library is full
pub const LIBRARY_FULL: u8 = 0x1F;

/// Module-side operation timeout
pub const DEVICE_TIMEOUT: u8 = 0x26;

/// Fingerprint already enrolled
pub const DUPLICATE: u8 = 0x27;

/// Map a confirm code to its manual description
///
/// Unknown codes produce a generic message carrying the raw value so nothing
/// is silently swallowed.
pub fn message(code: u8) -> String {
    let text = match code {
        0x00 => "command execution OK",
        0x01 => "data packet reception error",
        0x02 => "no finger on sensor",
        0x03 => "fingerprint image entry failed",
        0x04 => "fingerprint image too dry or light to generate features",
        0x05 => "fingerprint image too wet or smudged to generate features",
        0x06 => "fingerprint image too messy to generate features",
        0x07 => "too few feature points to generate features",
        0x08 => "fingerprints do not match",
        0x09 => "fingerprint not found",
        0x0A => "feature merging failed",
        0x0B => "library access address out of range",
        0x0C => "error reading template from library or template invalid",
        0x0D => "feature upload failed",
        0x0E => "module cannot receive subsequent data packets",
        0x0F => "image upload failed",
        0x10 => "template deletion failed",
        0x11 => "fingerprint library clearing failed",
        0x13 => "incorrect password",
        0x15 => "no valid original image in buffer",
        0x17 => "residual fingerprint or finger not moved between collections",
        0x18 => "error reading or writing flash",
        0x1A => "invalid register number",
        0x1B => "register setting content error",
        0x1C => "notepad page number error",
        0x1F => "fingerprint library full",
        0x20 => "address code incorrect",
        0x21 => "password must be verified",
        0x22 => "fingerprint template not empty",
        0x23 => "fingerprint template is empty",
        0x24 => "fingerprint library is empty",
        0x25 => "enrollment count setting error",
        0x26 => "timeout",
        0x27 => "fingerprint already exists",
        0x29 => "sensor operation failed",
        0x31 => "function does not match encryption level",
        0x32 => "key is locked",
        0x33 => "image area too small",
        0x34 => "image unavailable",
        0x35 => "illegal data",
        _ => return format!("unknown confirm code 0x{:02X}", code),
    };
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(message(SUCCESS), "command execution OK");
        assert_eq!(message(ADDRESS_OUT_OF_RANGE), "library access address out of range");
        assert_eq!(message(LIBRARY_FULL), "fingerprint library full");
        assert_eq!(message(DEVICE_TIMEOUT), "timeout");
    }

    #[test]
    fn test_unknown_code_carries_raw_value() {
        assert_eq!(message(0xEE), "unknown confirm code 0xEE");
    }
}
