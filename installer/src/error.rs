// src/error.rs

//! Error types raised by the installer components.

use std::{io, path::PathBuf};
use thiserror::Error;

use shared::constants::ERROR_EXE_MACHINE_TYPE_MISMATCH;

/// Win32 error code as returned by `GetLastError` or a registry/SCM call.
pub type OsCode = u32;

/// All the ways an install or uninstall step can fail
#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("running a 32-bit package on a 64-bit OS is not supported")]
    PlatformMismatch,

    #[error("cannot resolve the current directory: {0}")]
    CurrentDirectory(#[source] io::Error),

    #[error("copying {} to {} failed: {source}", from.display(), to.display())]
    FileCopy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("deleting {} failed: {source}", path.display())]
    FileDelete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("registry {op} failed with error {code}")]
    RegistryOperation { op: &'static str, code: OsCode },

    #[error("service {op} failed with error {code}")]
    ServiceOperation { op: &'static str, code: OsCode },

    #[error("co-installer {op} failed with error {code}")]
    CoInstaller { op: &'static str, code: OsCode },

    #[error("device reset failed with error {code}")]
    DeviceReset { code: OsCode },

    #[error("installation aborted: the driver service could not be started")]
    InstallAborted,
}

impl InstallerError {
    /// Underlying Win32 code, when the failure carries one.
    pub fn os_code(&self) -> Option<OsCode> {
        match self {
            Self::PlatformMismatch => Some(ERROR_EXE_MACHINE_TYPE_MISMATCH),
            Self::CurrentDirectory(e) => e.raw_os_error().map(|c| c as OsCode),
            Self::FileCopy { source, .. } | Self::FileDelete { source, .. } => {
                source.raw_os_error().map(|c| c as OsCode)
            }
            Self::RegistryOperation { code, .. }
            | Self::ServiceOperation { code, .. }
            | Self::CoInstaller { code, .. }
            | Self::DeviceReset { code } => Some(*code),
            Self::InstallAborted => None,
        }
    }
}

/// A failed `install`, together with whether partial state was left behind.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct InstallFailure {
    /// Set once the driver binary has been copied; the caller owes an
    /// uninstall pass.
    pub needs_rollback: bool,
    #[source]
    pub error: InstallerError,
}

pub type Result<T, E = InstallerError> = std::result::Result<T, E>;
