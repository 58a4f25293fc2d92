//! Protocol constants

/// Wildcard slot for 1:N searches over the whole library
pub const WILDCARD_SLOT: u16 = 0xFFFF;

/// Default template library capacity
pub const DEFAULT_CAPACITY: u16 = 100;

/// Default number of captures per enrollment
pub const DEFAULT_ENROLL_COUNT: u8 = 6;

/// Default minimum match score level for 1:N identification (1-5)
pub const DEFAULT_SCORE_LEVEL: u8 = 5;

/// Default per-read device timeout (seconds)
pub const DEFAULT_READ_TIMEOUT: u64 = 30;

/// Chip serial number length in bytes
pub const CHIP_SN_LEN: usize = 32;

/// Ring LED parameters for PS_ControlBLN
pub mod led {
    /// Blink function code
    pub const FUNC_BLINK: u8 = 0x02;

    /// Always-off function code
    pub const FUNC_OFF: u8 = 0x04;

    /// 3:8 high-to-low duty ratio used for every blink
    pub const DUTY_DEFAULT: u8 = 0x82;

    pub const BLUE: u8 = 0x01;
    pub const GREEN: u8 = 0x02;
    pub const RED: u8 = 0x04;
    pub const RED_BLUE: u8 = 0x05;
    pub const RED_GREEN: u8 = 0x06;
    pub const WHITE: u8 = 0x07;
}

/// Enrollment phase tags reported in the first status byte of each ack
pub mod enroll_phase {
    /// Command accepted, capture cycle about to start
    pub const ACCEPTED: u8 = 0x00;

    /// Awaiting finger placement for capture n
    pub const AWAITING_FINGER: u8 = 0x01;

    /// Extracting features for capture n
    pub const EXTRACTING: u8 = 0x02;

    /// Finger lift confirmed for capture n
    pub const LIFT_CONFIRMED: u8 = 0x03;

    /// Merging captures into a template (second byte 0xF0)
    pub const MERGING: u8 = 0x04;

    /// Duplicate-template check (second byte 0xF1)
    pub const DUP_CHECK: u8 = 0x05;

    /// Template stored (second byte 0xF2); terminal success
    pub const STORED: u8 = 0x06;

    pub const MERGING_SUB: u8 = 0xF0;
    pub const DUP_CHECK_SUB: u8 = 0xF1;
    pub const STORED_SUB: u8 = 0xF2;
}
