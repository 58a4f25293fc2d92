//! Parameter words for the composite auto commands
//!
//! Both PS_AutoEnroll and PS_AutoIdentify take a 16-bit parameter word.
//! Bit semantics are inverted in places in the manual (a set bit sometimes
//! disables a behaviour), so the flag names here describe what a SET bit does.

use bitflags::bitflags;

bitflags! {
    /// PS_AutoEnroll parameter word
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EnrollFlags: u16 {
        /// Turn the ring LED off after each successful image capture
        const LED_OFF_AFTER_CAPTURE = 1 << 0;

        /// Do not report per-step acknowledgements
        const SUPPRESS_STEP_ACKS = 1 << 2;

        /// Allow overwriting an occupied slot
        const ALLOW_OVERWRITE = 1 << 3;

        /// Reject a finger already present in the library
        const REJECT_DUPLICATE = 1 << 4;

        /// Do not require the finger to be lifted between captures
        const SKIP_FINGER_LIFT = 1 << 5;
    }
}

bitflags! {
    /// PS_AutoIdentify parameter word
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IdentifyFlags: u16 {
        /// Keep the ring LED off during the search
        const LED_OFF = 1 << 0;

        /// Do not report per-step acknowledgements
        const SUPPRESS_STEP_ACKS = 1 << 2;
    }
}

impl EnrollFlags {
    /// Parameter word the daemon enrolls with: LED off, report every step
    pub fn daemon_default() -> Self {
        Self::LED_OFF_AFTER_CAPTURE
    }
}

impl IdentifyFlags {
    /// Parameter word the daemon identifies with: one final acknowledgement only
    pub fn daemon_default() -> Self {
        Self::SUPPRESS_STEP_ACKS
    }
}
