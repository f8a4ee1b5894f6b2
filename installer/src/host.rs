// src/host.rs

//! Seams to the operating system facilities the installer drives.
//!
//! The orchestrator never touches the OS directly: each facility is a trait
//! here, implemented for real in `crate::win` and by in-memory fakes in the
//! integration tests.

use std::path::Path;

use crate::error::{OsCode, Result};

/// Registry value access, scoped under HKLM.
pub trait RegistryAccess {
    /// Raw `REG_MULTI_SZ` contents as UTF-16 code units; `Ok(None)` when the
    /// value (or its key) does not exist.
    fn read_multi_sz(&self, subkey: &str, value: &str) -> Result<Option<Vec<u16>>>;

    /// Replace the value with `data` in a single write.
    fn write_multi_sz(&self, subkey: &str, value: &str, data: &[u16]) -> Result<()>;

    fn read_string(&self, subkey: &str, value: &str) -> Result<Option<String>>;

    fn read_dword(&self, subkey: &str, value: &str) -> Result<Option<u32>>;
}

/// Service control manager, by service name. Errors carry the OS code.
pub trait ServiceControl {
    /// Register a demand-start kernel driver service.
    fn create(&self, name: &str, binary_path: &Path) -> Result<(), OsCode>;
    fn start(&self, name: &str) -> Result<(), OsCode>;
    fn stop(&self, name: &str) -> Result<(), OsCode>;
    fn delete(&self, name: &str) -> Result<(), OsCode>;
}

/// WDF co-installer hooks, all driven by the driver's INF file.
pub trait CoInstaller {
    /// Returns `true` when the framework update needs a reboot.
    fn pre_device_install(&self, inf_path: &Path) -> Result<bool>;
    fn post_device_install(&self, inf_path: &Path) -> Result<()>;
    fn pre_device_remove(&self, inf_path: &Path) -> Result<()>;
    fn post_device_remove(&self, inf_path: &Path) -> Result<()>;
}

/// Restart of every present device exposing an interface class.
pub trait DeviceReset {
    /// `Ok(true)` when every device restarted in place, `Ok(false)` when at
    /// least one of them needs a reboot.
    fn reset_devices_by_class(&self, interface_class: &str) -> Result<bool>;
}

/// Process/OS architecture queries.
pub trait ArchitectureProbe {
    /// `(process machine, native machine)` from `IsWow64Process2`, or `None`
    /// when that query is unavailable.
    fn machines(&self) -> Option<(u16, u16)>;

    /// Legacy `IsWow64Process` answer, `None` when unavailable or failing.
    fn legacy_wow64(&self) -> Option<bool>;
}

/// Everything the orchestrator needs from the machine it runs on.
pub trait Host: RegistryAccess + ServiceControl + CoInstaller + DeviceReset + ArchitectureProbe {}

impl<T> Host for T where
    T: RegistryAccess + ServiceControl + CoInstaller + DeviceReset + ArchitectureProbe
{
}
