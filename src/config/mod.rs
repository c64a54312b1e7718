// file: src/config/mod.rs
// version: 1.0.0
// guid: a3c07b91-d2e5-4861-90f4-5b28c6d1e073

//! Configuration module for the install agent
//!
//! Holds the validated install request and the fixed filesystem/network
//! locations the provisioning stages operate on.

pub mod paths;
pub mod request;

pub use request::{parse_bool_like, InstallRequest, ReservePolicy, TlsPolicy};
