// wine-chroot - Run Windows applications on ARM64 Linux through Wine
// inside an emulated Debian amd64 chroot.
//
// This is the library crate containing the core business logic and data
// structures. The binary crate (main.rs) provides the CLI entry point.

pub mod cli;
pub mod config;
pub mod exit_codes;
pub mod logging;
pub mod models;
pub mod paths;
pub mod services;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::Config;
pub use services::{
    ChrootBootstrapper, CommandRunner, DependencyChecker, DesktopManager, SystemRunner, WineRunner,
};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
