// file: src/utils/mod.rs
// version: 1.0.0
// guid: 5b7e29c1-84f0-4d36-a9b2-e60c318d74f5

//! Utility modules

pub mod system;
