//! Collectforge - collection cataloging with pluggable item modules
//!
//! This library crate exposes the module registry and the provider lookup
//! engine used by the `collectforge` binary and the integration tests.

pub mod config;
pub mod modules;
pub mod providers;
