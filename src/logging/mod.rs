// file: src/logging/mod.rs
// version: 1.0.0
// guid: 2e95a7c3-1f40-48d6-b8a1-c5d30e6f9142

//! Logging module

pub mod logger;
