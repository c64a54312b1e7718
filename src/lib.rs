// file: src/lib.rs
// version: 1.1.0
// guid: 8c1d94f2-6b3e-4a70-9d25-e417f80a2c61

//! # Pterodactyl Install Agent
//!
//! Automated installation of the Pterodactyl panel and its wings node
//! daemon on Ubuntu 22.04. The agent runs a fixed, strictly ordered
//! sequence of provisioning stages, shelling out to the system package
//! manager, database engine, certificate client, reverse proxy, and the
//! panel's own CLI, with idempotence guards so an interrupted run can be
//! safely repeated.

pub mod cli;
pub mod config;
pub mod error;
pub mod installer;
pub mod logging;
pub mod network;
pub mod stages;
pub mod template;
pub mod utils;

pub use error::{InstallError, Result};

/// Version information for the agent
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
