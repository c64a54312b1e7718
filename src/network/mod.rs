// file: src/network/mod.rs
// version: 1.0.0
// guid: 1c6d53e9-f082-4b74-a5d1-39e8c27a06b4

//! Network module

pub mod download;

pub use download::NetworkDownloader;
