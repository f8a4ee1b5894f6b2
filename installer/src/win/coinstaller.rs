//! WDF co-installer hooks, resolved from `WdfCoInstallerXXXXX.dll` at call time.

use log::Level;
use std::{
    ffi::CStr,
    io, mem,
    path::{Path, PathBuf},
};
use windows_sys::Win32::{
    Foundation::{FreeLibrary, BOOL, ERROR_SUCCESS, FALSE, HMODULE},
    System::LibraryLoader::{GetProcAddress, LoadLibraryW},
};

use shared::constants::{ERROR_GEN_FAILURE, ERROR_SUCCESS_REBOOT_REQUIRED};

use super::wide;
use crate::error::{InstallerError, Result};
use crate::installer_log;

/// WDF_COINSTALLER_INSTALL_OPTIONS
#[repr(C)]
struct InstallOptions {
    size: u32,
    show_reboot_prompt: BOOL,
}

type PreInstallExFn = unsafe extern "system" fn(*const u16, *const u16, *mut InstallOptions) -> u32;
type HookFn = unsafe extern "system" fn(*const u16, *const u16) -> u32;

/// Loaded co-installer module; freed on drop.
struct Library(HMODULE);

impl Library {
    fn load(path: &Path) -> io::Result<Self> {
        let module = unsafe { LoadLibraryW(wide(path).as_ptr()) };
        if module.is_null() {
            return Err(io::Error::last_os_error());
        }
        Ok(Self(module))
    }

    fn symbol(&self, name: &CStr) -> io::Result<unsafe extern "system" fn() -> isize> {
        unsafe { GetProcAddress(self.0, name.as_ptr().cast()) }.ok_or_else(io::Error::last_os_error)
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        unsafe { FreeLibrary(self.0) };
    }
}

pub struct WdfCoInstaller {
    dll: PathBuf,
    section: Vec<u16>,
}

impl WdfCoInstaller {
    pub fn new(dll: PathBuf, inf_section: &str) -> Self {
        Self { dll, section: wide(inf_section) }
    }

    fn load(&self, op: &'static str) -> Result<Library> {
        Library::load(&self.dll).map_err(|e| {
            installer_log!(Level::Error, "coinstaller", "Cannot load {}: {}", self.dll.display(), e);
            coinstaller_err(op, e)
        })
    }

    /// `Ok(true)` when the framework update needs a reboot.
    pub fn pre_device_install(&self, inf: &Path) -> Result<bool> {
        const OP: &str = "WdfPreDeviceInstallEx";
        let lib = self.load(OP)?;
        let entry = lib.symbol(c"WdfPreDeviceInstallEx").map_err(|e| coinstaller_err(OP, e))?;
        let entry: PreInstallExFn = unsafe { mem::transmute(entry) };

        let mut options = InstallOptions {
            size: mem::size_of::<InstallOptions>() as u32,
            show_reboot_prompt: FALSE,
        };
        let inf = wide(inf);
        match unsafe { entry(inf.as_ptr(), self.section.as_ptr(), &mut options) } {
            ERROR_SUCCESS => Ok(false),
            ERROR_SUCCESS_REBOOT_REQUIRED => Ok(true),
            code => Err(InstallerError::CoInstaller { op: OP, code }),
        }
    }

    pub fn post_device_install(&self, inf: &Path) -> Result<()> {
        self.call_hook("WdfPostDeviceInstall", c"WdfPostDeviceInstall", inf)
    }

    pub fn pre_device_remove(&self, inf: &Path) -> Result<()> {
        self.call_hook("WdfPreDeviceRemove", c"WdfPreDeviceRemove", inf)
    }

    pub fn post_device_remove(&self, inf: &Path) -> Result<()> {
        self.call_hook("WdfPostDeviceRemove", c"WdfPostDeviceRemove", inf)
    }

    fn call_hook(&self, op: &'static str, symbol: &CStr, inf: &Path) -> Result<()> {
        let lib = self.load(op)?;
        let entry = lib.symbol(symbol).map_err(|e| coinstaller_err(op, e))?;
        let entry: HookFn = unsafe { mem::transmute(entry) };

        let inf = wide(inf);
        match unsafe { entry(inf.as_ptr(), self.section.as_ptr()) } {
            ERROR_SUCCESS => {
                installer_log!(Level::Debug, "coinstaller", "{} succeeded", op);
                Ok(())
            }
            code => Err(InstallerError::CoInstaller { op, code }),
        }
    }
}

fn coinstaller_err(op: &'static str, e: io::Error) -> InstallerError {
    let code = e.raw_os_error().map_or(ERROR_GEN_FAILURE, |c| c as u32);
    InstallerError::CoInstaller { op, code }
}
