//! Cisco IOS / IOS-XE profile.
//!
//! # Prompt Examples
//!
//! ```text
//! switch>                  # user EXEC, needs `enable`
//! switch#                  # privileged EXEC
//! ```

use crate::platform::{ENABLE_COMMAND, VendorProfile};

/// Vendor identifier for Cisco.
pub const ID: u8 = 2;

/// Create the Cisco IOS profile.
pub fn profile() -> VendorProfile {
    VendorProfile::new(ID, "cisco_ios", "show running-config").with_elevation(ENABLE_COMMAND)
}
