// src/installer.rs

//! Install / uninstall orchestration.
//!
//! Install order, each failure ending the call except the last:
//!
//! 1. platform check (before anything is touched)
//! 2. signing policy remediation
//! 3. driver file copy (from here on the caller owes a rollback)
//! 4. co-installer pre-install
//! 5. service record creation
//! 6. start/stop verification
//! 7. co-installer post-install
//! 8. filter chain: driver appended last
//! 9. host controller reset, unless a reboot is already due; a reset that
//!    fails or leaves a device pending turns into a reboot request
//!
//! Uninstall walks the same ground backwards and treats anything already
//! missing as done.

use log::Level;
use std::path::{Path, PathBuf};

use shared::constants::{
    SYSTEM32_DRIVERS, UPPER_FILTER_SUBTREE, UPPER_FILTER_VALUE, USB_HOST_CONTROLLER_INTERFACE,
};

use crate::config::Config;
use crate::deploy::DriverDeployer;
use crate::error::{InstallFailure, InstallerError, Result};
use crate::host::Host;
use crate::installer_log;
use crate::platform;
use crate::registry::{self, ValueLocation};
use crate::service::ServiceRegistrar;
use crate::signing::{SigningOutcome, SigningRemediator};

/// The USB class `UpperFilters` value.
pub const UPPER_FILTERS: ValueLocation<'static> =
    ValueLocation { subkey: UPPER_FILTER_SUBTREE, value: UPPER_FILTER_VALUE };

/// Directories an install reads from and writes to.
#[derive(Debug, Clone)]
pub struct InstallLayout {
    /// Holds the driver binary, its INF and the co-installer.
    pub package_dir: PathBuf,
    /// `%windir%\System32\Drivers`
    pub drivers_dir: PathBuf,
}

impl InstallLayout {
    /// Package in the current directory, drivers under `windows_dir`.
    pub fn from_current_dir(windows_dir: &Path) -> Result<Self> {
        Ok(Self {
            package_dir: std::env::current_dir().map_err(InstallerError::CurrentDirectory)?,
            drivers_dir: windows_dir.join(SYSTEM32_DRIVERS),
        })
    }
}

/// Result of a completed install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub reboot_required: bool,
    pub signing: SigningOutcome,
}

pub struct Installer<H: Host> {
    host: H,
    config: Config,
    layout: InstallLayout,
}

impl<H: Host> Installer<H> {
    pub fn new(host: H, config: Config, layout: InstallLayout) -> Self {
        Self { host, config, layout }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    fn deployer(&self) -> DriverDeployer {
        DriverDeployer::new(&self.layout.package_dir, &self.layout.drivers_dir)
    }

    fn inf_path(&self) -> PathBuf {
        self.layout.package_dir.join(&self.config.driver.inf)
    }

    /// Install the driver. On failure, `InstallFailure::needs_rollback` says
    /// whether the driver file was already copied.
    pub fn install(&self) -> Result<InstallOutcome, InstallFailure> {
        let mut needs_rollback = false;
        let result = self.run_install(&mut needs_rollback);
        result.map_err(|error| {
            installer_log!(Level::Error, "installer", "Install failed: {} (rollback needed: {})", error, needs_rollback);
            InstallFailure { needs_rollback, error }
        })
    }

    fn run_install(&self, needs_rollback: &mut bool) -> Result<InstallOutcome> {
        platform::validate(&self.host)?;

        let driver = &self.config.driver;
        installer_log!(Level::Info, "installer", "Installing {}", driver.name);

        let signing = SigningRemediator::new(&self.host, &self.config.signing).evaluate();
        let mut reboot_required = signing.reboot_required();

        let driver_path = self.deployer().deploy(&driver.file)?;
        *needs_rollback = true;

        let inf = self.inf_path();
        if self.host.pre_device_install(&inf)? {
            installer_log!(Level::Info, "installer", "Co-installer requests a reboot");
            reboot_required = true;
        }

        let services = ServiceRegistrar::new(&self.host);
        services.create(&driver.name, &driver_path)?;
        services.verify(&driver.name)?;

        self.host.post_device_install(&inf)?;
        self.add_to_filter_chain()?;

        if reboot_required {
            installer_log!(Level::Info, "installer", "{} installed, reboot required", driver.name);
            return Ok(InstallOutcome { reboot_required, signing });
        }

        // Everything is in place; a failed reset only defers activation.
        let reset_clean = match self.host.reset_devices_by_class(USB_HOST_CONTROLLER_INTERFACE) {
            Ok(clean) => clean,
            Err(e) => {
                installer_log!(Level::Warn, "installer", "Host controller reset failed: {}", e);
                false
            }
        };
        installer_log!(
            Level::Info,
            "installer",
            "{} installed, host controllers reset (reboot required: {})",
            driver.name,
            !reset_clean
        );
        Ok(InstallOutcome { reboot_required: !reset_clean, signing })
    }

    /// Remove every trace of the driver. Safe on a machine where it was never
    /// (or only partly) installed, and safe to repeat.
    pub fn uninstall(&self) -> Result<()> {
        platform::validate(&self.host)?;

        let driver = &self.config.driver;
        installer_log!(Level::Info, "installer", "Uninstalling {}", driver.name);

        self.remove_from_filter_chain()?;

        match self.host.reset_devices_by_class(USB_HOST_CONTROLLER_INTERFACE) {
            Ok(true) => {}
            Ok(false) => installer_log!(Level::Info, "installer", "Host controller reset needs a reboot"),
            Err(e) => installer_log!(Level::Warn, "installer", "Host controller reset failed: {}", e),
        }

        let deployer = self.deployer();
        deployer.remove(&deployer.destination(&driver.file))?;

        let inf = self.inf_path();
        self.host.pre_device_remove(&inf)?;
        ServiceRegistrar::new(&self.host).delete_if_present(&driver.name)?;
        self.host.post_device_remove(&inf)?;

        installer_log!(Level::Info, "installer", "{} uninstalled", driver.name);
        Ok(())
    }

    fn add_to_filter_chain(&self) -> Result<()> {
        let current = registry::read_filter_names(&self.host, UPPER_FILTERS)?;
        let chain = registry::append_unique(&current, &self.config.driver.name);
        registry::write_filter_names(&self.host, UPPER_FILTERS, &chain)?;
        installer_log!(Level::Info, "installer", "UpperFilters now {:?}", chain);
        Ok(())
    }

    /// A failed write is logged and swallowed so that the file and service
    /// still get removed.
    fn remove_from_filter_chain(&self) -> Result<()> {
        let Some(raw) = self.host.read_multi_sz(UPPER_FILTERS.subkey, UPPER_FILTERS.value)? else {
            installer_log!(Level::Debug, "installer", "No UpperFilters value");
            return Ok(());
        };
        let chain = registry::remove_name(&registry::decode_multi_sz(&raw), &self.config.driver.name);
        match registry::write_filter_names(&self.host, UPPER_FILTERS, &chain) {
            Ok(()) => installer_log!(Level::Info, "installer", "UpperFilters now {:?}", chain),
            Err(e) => installer_log!(Level::Warn, "installer", "Leaving UpperFilters as is: {}", e),
        }
        Ok(())
    }
}
