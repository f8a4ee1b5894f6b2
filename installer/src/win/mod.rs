//! Windows implementations of the [`crate::host`] traits.
//!
//! Every OS handle acquired here is owned by a guard that releases it on
//! drop, so early returns never leak.

pub mod coinstaller;
pub mod devices;
pub mod platform;
pub mod registry;
pub mod service;

use std::{
    ffi::OsStr,
    os::windows::prelude::OsStrExt,
    path::{Path, PathBuf},
};

use crate::config::DriverConfig;
use crate::error::{OsCode, Result};
use crate::host::{ArchitectureProbe, CoInstaller, DeviceReset, RegistryAccess, ServiceControl};
use coinstaller::WdfCoInstaller;

/// Build a null‑terminated UTF‑16 string for Win32 APIs.
pub(crate) fn wide(s: impl AsRef<OsStr>) -> Vec<u16> {
    s.as_ref().encode_wide().chain(Some(0)).collect()
}

/// The live machine.
pub struct WindowsHost {
    coinstaller: WdfCoInstaller,
}

impl WindowsHost {
    /// The co-installer DLL is looked up in `package_dir`.
    pub fn new(package_dir: &Path, driver: &DriverConfig) -> Self {
        Self {
            coinstaller: WdfCoInstaller::new(package_dir.join(&driver.coinstaller), &driver.inf_section),
        }
    }

    pub fn windows_dir() -> std::io::Result<PathBuf> {
        platform::windows_directory()
    }
}

impl RegistryAccess for WindowsHost {
    fn read_multi_sz(&self, subkey: &str, value: &str) -> Result<Option<Vec<u16>>> {
        registry::read_multi_sz(subkey, value)
    }
    fn write_multi_sz(&self, subkey: &str, value: &str, data: &[u16]) -> Result<()> {
        registry::write_multi_sz(subkey, value, data)
    }
    fn read_string(&self, subkey: &str, value: &str) -> Result<Option<String>> {
        registry::read_string(subkey, value)
    }
    fn read_dword(&self, subkey: &str, value: &str) -> Result<Option<u32>> {
        registry::read_dword(subkey, value)
    }
}

impl ServiceControl for WindowsHost {
    fn create(&self, name: &str, binary_path: &Path) -> Result<(), OsCode> {
        service::create(name, binary_path)
    }
    fn start(&self, name: &str) -> Result<(), OsCode> {
        service::start(name)
    }
    fn stop(&self, name: &str) -> Result<(), OsCode> {
        service::stop(name)
    }
    fn delete(&self, name: &str) -> Result<(), OsCode> {
        service::delete(name)
    }
}

impl CoInstaller for WindowsHost {
    fn pre_device_install(&self, inf_path: &Path) -> Result<bool> {
        self.coinstaller.pre_device_install(inf_path)
    }
    fn post_device_install(&self, inf_path: &Path) -> Result<()> {
        self.coinstaller.post_device_install(inf_path)
    }
    fn pre_device_remove(&self, inf_path: &Path) -> Result<()> {
        self.coinstaller.pre_device_remove(inf_path)
    }
    fn post_device_remove(&self, inf_path: &Path) -> Result<()> {
        self.coinstaller.post_device_remove(inf_path)
    }
}

impl DeviceReset for WindowsHost {
    fn reset_devices_by_class(&self, interface_class: &str) -> Result<bool> {
        devices::reset_devices_by_class(interface_class)
    }
}

impl ArchitectureProbe for WindowsHost {
    fn machines(&self) -> Option<(u16, u16)> {
        platform::wow64_machines()
    }
    fn legacy_wow64(&self) -> Option<bool> {
        platform::is_wow64_process()
    }
}
