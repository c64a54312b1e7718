// file: src/cli/mod.rs
// version: 1.0.0
// guid: 4f92c6d1-08e7-4a35-b1d9-63c0f8a5e274

//! Command line interface module

pub mod args;
pub mod commands;
