//! Huawei VRP profile.
//!
//! # Prompt Examples
//!
//! ```text
//! <HUAWEI>                 # user view
//! [~HUAWEI]                # system view
//! [HUAWEI-GigabitEthernet0/0/1]
//! ```
//!
//! `display current-configuration` works from either view, so no elevation
//! is needed and bracket prompts are accepted.

use crate::platform::VendorProfile;

/// Vendor identifier for Huawei.
pub const ID: u8 = 3;

/// Create the Huawei VRP profile.
pub fn profile() -> VendorProfile {
    VendorProfile::new(ID, "huawei_vrp", "display current-configuration").with_bracket_prompts()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_prompts_direct() {
        let profile = profile();
        assert!(!profile.requires_elevation());
        assert!(profile.bracket_prompts);
        assert_eq!(profile.show_command, "display current-configuration");
    }
}
