//! Juniper JUNOS profile.
//!
//! Operational mode (`user@router>`) can print the configuration without
//! elevation. `| no-more` keeps the pager out of the way.

use crate::platform::VendorProfile;

/// Vendor identifier for Juniper.
pub const ID: u8 = 1;

/// Create the Juniper JUNOS profile.
pub fn profile() -> VendorProfile {
    VendorProfile::new(ID, "juniper_junos", "show configuration | no-more")
}
