//! Vendor command table keyed by vendor identifier.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

use super::profile::VendorProfile;
use super::vendors;

/// Built-in vendor table.
static BUILTIN: Lazy<VendorTable> = Lazy::new(|| {
    let mut table = VendorTable::new(vendors::generic::profile());
    table.register_builtin_vendors();
    table
});

/// Map from vendor identifier to [`VendorProfile`], with a fallback for
/// identifiers nobody registered.
#[derive(Debug, Clone)]
pub struct VendorTable {
    vendors: IndexMap<u8, VendorProfile>,
    fallback: VendorProfile,
}

impl VendorTable {
    /// Create an empty table with the given fallback profile.
    pub fn new(fallback: VendorProfile) -> Self {
        Self {
            vendors: IndexMap::new(),
            fallback,
        }
    }

    /// The built-in table.
    pub fn builtin() -> &'static VendorTable {
        &BUILTIN
    }

    fn register_builtin_vendors(&mut self) {
        self.register(vendors::juniper_junos::profile());
        self.register(vendors::cisco_ios::profile());
        self.register(vendors::huawei_vrp::profile());
        self.register(vendors::arista_eos::profile());
    }

    /// Register a profile, returning the one it replaced.
    pub fn register(&mut self, profile: VendorProfile) -> Option<VendorProfile> {
        self.vendors.insert(profile.id, profile)
    }

    /// Look up a vendor, falling back to the default profile.
    pub fn lookup(&self, id: u8) -> &VendorProfile {
        self.vendors.get(&id).unwrap_or(&self.fallback)
    }

    /// Get a vendor only if it was registered.
    pub fn get(&self, id: u8) -> Option<&VendorProfile> {
        self.vendors.get(&id)
    }

    /// Check if a vendor is registered.
    pub fn contains(&self, id: u8) -> bool {
        self.vendors.contains_key(&id)
    }

    /// Registered profiles in registration order.
    pub fn profiles(&self) -> impl Iterator<Item = &VendorProfile> {
        self.vendors.values()
    }

    /// The profile used for unknown identifiers.
    pub fn fallback(&self) -> &VendorProfile {
        &self.fallback
    }
}

impl Default for VendorTable {
    fn default() -> Self {
        Self::builtin().clone()
    }
}
