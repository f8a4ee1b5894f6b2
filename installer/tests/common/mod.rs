// tests/common/mod.rs

//! In-memory stand-in for the Windows machine the installer drives.
//!
//! Every mutating call lands in `journal`, so tests can assert both the
//! order of operations and the absence of side effects.

#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

use installer::{
    config::Config,
    error::{InstallerError, OsCode, Result},
    host::{ArchitectureProbe, CoInstaller, DeviceReset, RegistryAccess, ServiceControl},
    registry::{decode_multi_sz, encode_multi_sz},
    InstallLayout, Installer,
};
use shared::constants::{
    CI_POLICY_SUBTREE, CURRENT_BUILD_VALUE, CURRENT_VERSION_SUBTREE, ERROR_SERVICE_DOES_NOT_EXIST,
    ERROR_SERVICE_EXISTS, IMAGE_FILE_MACHINE_AMD64, TEST_SIGNING_VALUE, UPPER_FILTER_SUBTREE,
    UPPER_FILTER_VALUE,
};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq)]
pub enum RegValue {
    MultiSz(Vec<u16>),
    Sz(String),
    Dword(u32),
}

fn key(subkey: &str, value: &str) -> (String, String) {
    (subkey.to_owned(), value.to_owned())
}

pub struct FakeHost {
    pub values: RefCell<HashMap<(String, String), RegValue>>,
    /// Registered services: name -> binary path.
    pub services: RefCell<BTreeMap<String, PathBuf>>,
    pub journal: RefCell<Vec<String>>,

    pub start_error: Cell<Option<OsCode>>,
    pub registry_write_error: Cell<Option<OsCode>>,
    pub coinstaller_wants_reboot: Cell<bool>,
    pub reset_is_clean: Cell<bool>,
    pub reset_error: Cell<Option<OsCode>>,
    pub machines: Cell<Option<(u16, u16)>>,
    pub legacy_wow64: Cell<Option<bool>>,
}

impl Default for FakeHost {
    /// A 64-bit Windows 11 box with test signing already on.
    fn default() -> Self {
        let host = Self {
            values: RefCell::default(),
            services: RefCell::default(),
            journal: RefCell::default(),
            start_error: Cell::new(None),
            registry_write_error: Cell::new(None),
            coinstaller_wants_reboot: Cell::new(false),
            reset_is_clean: Cell::new(true),
            reset_error: Cell::new(None),
            machines: Cell::new(Some((0, IMAGE_FILE_MACHINE_AMD64))),
            legacy_wow64: Cell::new(Some(false)),
        };
        host.set(CURRENT_VERSION_SUBTREE, CURRENT_BUILD_VALUE, RegValue::Sz("22631".into()));
        host.set(CI_POLICY_SUBTREE, TEST_SIGNING_VALUE, RegValue::Dword(1));
        host
    }
}

impl FakeHost {
    pub fn set(&self, subkey: &str, value: &str, data: RegValue) {
        self.values.borrow_mut().insert(key(subkey, value), data);
    }

    pub fn remove(&self, subkey: &str, value: &str) {
        self.values.borrow_mut().remove(&key(subkey, value));
    }

    pub fn set_filters(&self, names: &[&str]) {
        self.set(UPPER_FILTER_SUBTREE, UPPER_FILTER_VALUE, RegValue::MultiSz(encode_multi_sz(names)));
    }

    /// `None` when the value does not exist.
    pub fn filters(&self) -> Option<Vec<String>> {
        match self.values.borrow().get(&key(UPPER_FILTER_SUBTREE, UPPER_FILTER_VALUE)) {
            Some(RegValue::MultiSz(raw)) => Some(decode_multi_sz(raw)),
            Some(other) => panic!("UpperFilters has the wrong type: {other:?}"),
            None => None,
        }
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.borrow().clone()
    }

    pub fn has_service(&self, name: &str) -> bool {
        self.services.borrow().contains_key(name)
    }

    fn log(&self, entry: impl Into<String>) {
        self.journal.borrow_mut().push(entry.into());
    }
}

impl RegistryAccess for FakeHost {
    fn read_multi_sz(&self, subkey: &str, value: &str) -> Result<Option<Vec<u16>>> {
        match self.values.borrow().get(&key(subkey, value)) {
            Some(RegValue::MultiSz(raw)) => Ok(Some(raw.clone())),
            Some(_) => Err(InstallerError::RegistryOperation { op: "read", code: 13 }),
            None => Ok(None),
        }
    }

    fn write_multi_sz(&self, subkey: &str, value: &str, data: &[u16]) -> Result<()> {
        self.log(format!("reg write {value}"));
        if let Some(code) = self.registry_write_error.get() {
            return Err(InstallerError::RegistryOperation { op: "write", code });
        }
        self.set(subkey, value, RegValue::MultiSz(data.to_vec()));
        Ok(())
    }

    fn read_string(&self, subkey: &str, value: &str) -> Result<Option<String>> {
        match self.values.borrow().get(&key(subkey, value)) {
            Some(RegValue::Sz(s)) => Ok(Some(s.clone())),
            Some(_) => Err(InstallerError::RegistryOperation { op: "read", code: 13 }),
            None => Ok(None),
        }
    }

    fn read_dword(&self, subkey: &str, value: &str) -> Result<Option<u32>> {
        match self.values.borrow().get(&key(subkey, value)) {
            Some(RegValue::Dword(v)) => Ok(Some(*v)),
            Some(_) => Err(InstallerError::RegistryOperation { op: "read", code: 13 }),
            None => Ok(None),
        }
    }
}

impl ServiceControl for FakeHost {
    fn create(&self, name: &str, binary_path: &Path) -> Result<(), OsCode> {
        self.log(format!("service create {name}"));
        let mut services = self.services.borrow_mut();
        if services.contains_key(name) {
            return Err(ERROR_SERVICE_EXISTS);
        }
        services.insert(name.into(), binary_path.to_owned());
        Ok(())
    }

    fn start(&self, name: &str) -> Result<(), OsCode> {
        self.log(format!("service start {name}"));
        if !self.has_service(name) {
            return Err(ERROR_SERVICE_DOES_NOT_EXIST);
        }
        self.start_error.get().map_or(Ok(()), Err)
    }

    fn stop(&self, name: &str) -> Result<(), OsCode> {
        self.log(format!("service stop {name}"));
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<(), OsCode> {
        self.log(format!("service delete {name}"));
        match self.services.borrow_mut().remove(name) {
            Some(_) => Ok(()),
            None => Err(ERROR_SERVICE_DOES_NOT_EXIST),
        }
    }
}

impl CoInstaller for FakeHost {
    fn pre_device_install(&self, _: &Path) -> Result<bool> {
        self.log("coinstaller pre-install");
        Ok(self.coinstaller_wants_reboot.get())
    }
    fn post_device_install(&self, _: &Path) -> Result<()> {
        self.log("coinstaller post-install");
        Ok(())
    }
    fn pre_device_remove(&self, _: &Path) -> Result<()> {
        self.log("coinstaller pre-remove");
        Ok(())
    }
    fn post_device_remove(&self, _: &Path) -> Result<()> {
        self.log("coinstaller post-remove");
        Ok(())
    }
}

impl DeviceReset for FakeHost {
    fn reset_devices_by_class(&self, _: &str) -> Result<bool> {
        self.log("reset host controllers");
        if let Some(code) = self.reset_error.get() {
            return Err(InstallerError::DeviceReset { code });
        }
        Ok(self.reset_is_clean.get())
    }
}

impl ArchitectureProbe for FakeHost {
    fn machines(&self) -> Option<(u16, u16)> {
        self.machines.get()
    }
    fn legacy_wow64(&self) -> Option<bool> {
        self.legacy_wow64.get()
    }
}

/// A package directory holding `UsbDk.sys` and an empty drivers directory.
pub struct Sandbox {
    pub package: TempDir,
    pub drivers: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let package = tempfile::tempdir().unwrap();
        fs::write(package.path().join("UsbDk.sys"), b"MZ driver image").unwrap();
        Self { package, drivers: tempfile::tempdir().unwrap() }
    }

    pub fn layout(&self) -> InstallLayout {
        InstallLayout {
            package_dir: self.package.path().to_owned(),
            drivers_dir: self.drivers.path().to_owned(),
        }
    }

    pub fn deployed_driver(&self) -> PathBuf {
        self.drivers.path().join("UsbDk.sys")
    }

    pub fn installer(&self, host: FakeHost) -> Installer<FakeHost> {
        self.installer_with(host, Config::default())
    }

    pub fn installer_with(&self, host: FakeHost, config: Config) -> Installer<FakeHost> {
        Installer::new(host, config, self.layout())
    }
}
