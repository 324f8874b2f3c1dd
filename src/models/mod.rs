//! Data models for wine-chroot.
//!
//! Everything here is a plain value type: the typed configuration tree and
//! the records the desktop integration reports back to the CLI.

pub mod config;

pub use config::{ChrootSection, Config, DesktopSection, ExecutionSection, WineSection};
