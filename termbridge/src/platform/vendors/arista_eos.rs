//! Arista EOS profile.

use crate::platform::{ENABLE_COMMAND, VendorProfile};

/// Vendor identifier for Arista.
pub const ID: u8 = 4;

/// Create the Arista EOS profile.
pub fn profile() -> VendorProfile {
    VendorProfile::new(ID, "arista_eos", "show running-config").with_elevation(ENABLE_COMMAND)
}
