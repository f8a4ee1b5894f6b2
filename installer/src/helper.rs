// src/helper.rs

//! Entry points for callers that want a verdict rather than an error.

use log::Level;

use crate::error::{InstallFailure, InstallerError};
use crate::host::Host;
use crate::installer::Installer;
use crate::installer_log;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallResult {
    Success,
    SuccessNeedReboot,
    Failure,
    /// The driver service refused to start; nothing is left installed.
    Aborted,
}

/// Install, and on a failure after the driver file was copied, run an
/// uninstall pass to clean up.
pub fn install_driver<H: Host>(installer: &Installer<H>) -> InstallResult {
    match installer.install() {
        Ok(outcome) if outcome.reboot_required => InstallResult::SuccessNeedReboot,
        Ok(_) => InstallResult::Success,
        Err(InstallFailure { needs_rollback, error }) => {
            if needs_rollback {
                installer_log!(Level::Warn, "helper", "Rolling back partial install");
                if let Err(e) = installer.uninstall() {
                    installer_log!(Level::Error, "helper", "Rollback failed: {}", e);
                }
            }
            match error {
                InstallerError::InstallAborted => InstallResult::Aborted,
                _ => InstallResult::Failure,
            }
        }
    }
}

pub fn uninstall_driver<H: Host>(installer: &Installer<H>) -> bool {
    match installer.uninstall() {
        Ok(()) => true,
        Err(e) => {
            installer_log!(Level::Error, "helper", "Uninstall failed: {}", e);
            false
        }
    }
}
