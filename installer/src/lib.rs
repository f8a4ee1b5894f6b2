// src/lib.rs
// ────────────────────────────────────────────────────────────────────────────
// Public library entry point.  Re-export everything for both `main.rs` and
// integration tests.

mod macros;

pub mod config;
pub mod deploy;
pub mod error;
pub mod helper;
pub mod host;
pub mod installer;
pub mod platform;
pub mod registry;
pub mod service;
pub mod signing;

#[cfg(windows)]
pub mod win;

pub use error::{InstallFailure, InstallerError};
pub use helper::{install_driver, uninstall_driver, InstallResult};
pub use installer::{InstallLayout, InstallOutcome, Installer};
