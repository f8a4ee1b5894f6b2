// src/service.rs

//! Driver service record lifecycle on top of [`ServiceControl`].

use log::Level;
use std::path::Path;

use shared::constants::{
    ERROR_DRIVER_BLOCKED, ERROR_DRIVER_FAILED_PRIOR_UNLOAD, ERROR_SERVICE_DISABLED,
    ERROR_SERVICE_DOES_NOT_EXIST,
};

use crate::error::{InstallerError, OsCode, Result};
use crate::host::ServiceControl;
use crate::installer_log;

/// Start failures that still leave a usable install: the driver is not yet
/// attached to a device, or a policy/unload transition settles on reboot.
pub const EXPECTED_START_FAILURES: [OsCode; 3] = [
    ERROR_SERVICE_DISABLED,
    ERROR_DRIVER_BLOCKED,
    ERROR_DRIVER_FAILED_PRIOR_UNLOAD,
];

pub fn is_expected_start_failure(code: OsCode) -> bool {
    EXPECTED_START_FAILURES.contains(&code)
}

fn service_err(op: &'static str) -> impl FnOnce(OsCode) -> InstallerError {
    move |code| InstallerError::ServiceOperation { op, code }
}

pub struct ServiceRegistrar<'a, S: ServiceControl + ?Sized> {
    scm: &'a S,
}

impl<'a, S: ServiceControl + ?Sized> ServiceRegistrar<'a, S> {
    pub fn new(scm: &'a S) -> Self {
        Self { scm }
    }

    /// Any failure, including an already existing record, is an error.
    pub fn create(&self, name: &str, binary_path: &Path) -> Result<()> {
        self.scm.create(name, binary_path).map_err(service_err("create"))?;
        installer_log!(Level::Info, "service", "Created service {} -> {}", name, binary_path.display());
        Ok(())
    }

    pub fn start(&self, name: &str) -> Result<()> {
        self.scm.start(name).map_err(service_err("start"))
    }

    pub fn stop(&self, name: &str) -> Result<()> {
        self.scm.stop(name).map_err(service_err("stop"))
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        self.scm.delete(name).map_err(service_err("delete"))
    }

    /// Delete for the uninstall path: an absent record is already deleted.
    pub fn delete_if_present(&self, name: &str) -> Result<()> {
        match self.scm.delete(name) {
            Ok(()) => {
                installer_log!(Level::Info, "service", "Deleted service {}", name);
                Ok(())
            }
            Err(ERROR_SERVICE_DOES_NOT_EXIST) => {
                installer_log!(Level::Debug, "service", "Service {} not registered", name);
                Ok(())
            }
            Err(code) => Err(InstallerError::ServiceOperation { op: "delete", code }),
        }
    }

    /// Start then stop the freshly created service.
    ///
    /// Expected start failures are tolerated. Anything else removes the
    /// service record (best effort) and aborts the installation.
    pub fn verify(&self, name: &str) -> Result<()> {
        let outcome = self.scm.start(name).and_then(|()| self.scm.stop(name));
        let code = match outcome {
            Ok(()) => {
                installer_log!(Level::Info, "service", "Service {} started and stopped", name);
                return Ok(());
            }
            Err(code) => code,
        };

        if is_expected_start_failure(code) {
            installer_log!(Level::Info, "service", "Service {} start deferred (error {})", name, code);
            return Ok(());
        }

        installer_log!(Level::Error, "service", "Service {} failed to start (error {})", name, code);
        if let Err(e) = self.delete(name) {
            installer_log!(Level::Warn, "service", "Cleanup of {} failed: {}", name, e);
        }
        Err(InstallerError::InstallAborted)
    }
}
