//! Vendor profiles for multi-vendor support.
//!
//! A [`VendorProfile`] says which command prints the configuration, whether
//! an unprivileged session must be elevated first, and which prompt styles
//! the vendor uses. Profiles live in a [`VendorTable`] keyed by the numeric
//! vendor id clients send.

mod profile;
mod registry;
pub mod vendors;

pub use profile::{ENABLE_COMMAND, VendorProfile};
pub use registry::VendorTable;
