//! Built-in vendor profiles.

pub mod arista_eos;
pub mod cisco_ios;
pub mod generic;
pub mod huawei_vrp;
pub mod juniper_junos;
