//! Fallback profile for vendor identifiers nobody registered.
//!
//! Assumes the most common CLI dialect: unprivileged `>` sessions are
//! elevated with `enable` and the configuration is printed with
//! `show running-config`.

use crate::platform::{ENABLE_COMMAND, VendorProfile};

/// Create the fallback profile.
pub fn profile() -> VendorProfile {
    VendorProfile::new(0, "generic", "show running-config").with_elevation(ENABLE_COMMAND)
}
