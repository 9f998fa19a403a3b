//! Reelserve - self-hosted movie streaming server
//!
//! This library crate exposes the core functionality for integration testing.

pub mod catalog;
pub mod config;
pub mod error;
pub mod server;
pub mod streaming;
pub mod thumbnails;
