//! Restart every present device exposing an interface class, via SetupAPI
//! property-change requests.

use log::Level;
use std::{io, mem, ptr};
use windows_sys::{
    core::GUID,
    Win32::{
        Devices::DeviceAndDriverInstallation::{
            SetupDiCallClassInstaller, SetupDiDestroyDeviceInfoList, SetupDiEnumDeviceInfo,
            SetupDiGetClassDevsW, SetupDiGetDeviceInstallParamsW, SetupDiSetClassInstallParamsW,
            DICS_FLAG_CONFIGSPECIFIC, DICS_PROPCHANGE, DIF_PROPERTYCHANGE, DIGCF_DEVICEINTERFACE,
            DIGCF_PRESENT, DI_NEEDREBOOT, DI_NEEDRESTART, HDEVINFO, SP_CLASSINSTALL_HEADER,
            SP_DEVINFO_DATA, SP_DEVINSTALL_PARAMS_W, SP_PROPCHANGE_PARAMS,
        },
        Foundation::{ERROR_NO_MORE_ITEMS, INVALID_HANDLE_VALUE},
    },
};

use shared::constants::ERROR_GEN_FAILURE;
use crate::error::{InstallerError, Result};
use crate::installer_log;

/// `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}` to a GUID.
pub fn parse_guid(text: &str) -> Option<GUID> {
    let hex: String = text
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .chars()
        .filter(|&c| c != '-')
        .collect();
    if hex.len() != 32 {
        return None;
    }
    u128::from_str_radix(&hex, 16).ok().map(GUID::from_u128)
}

fn last_error() -> u32 {
    io::Error::last_os_error().raw_os_error().map_or(ERROR_GEN_FAILURE, |c| c as u32)
}

/// Device information set; destroyed on drop.
struct DeviceInfoSet(HDEVINFO);

impl DeviceInfoSet {
    fn present_with_interface(class: &GUID) -> Result<Self> {
        let set = unsafe {
            SetupDiGetClassDevsW(class, ptr::null(), ptr::null_mut(), DIGCF_PRESENT | DIGCF_DEVICEINTERFACE)
        };
        if set as isize == INVALID_HANDLE_VALUE as isize {
            return Err(InstallerError::DeviceReset { code: last_error() });
        }
        Ok(Self(set))
    }

    fn device(&self, index: u32) -> Result<Option<SP_DEVINFO_DATA>> {
        let mut data: SP_DEVINFO_DATA = unsafe { mem::zeroed() };
        data.cbSize = mem::size_of::<SP_DEVINFO_DATA>() as u32;
        if unsafe { SetupDiEnumDeviceInfo(self.0, index, &mut data) } != 0 {
            return Ok(Some(data));
        }
        match last_error() {
            ERROR_NO_MORE_ITEMS => Ok(None),
            code => Err(InstallerError::DeviceReset { code }),
        }
    }

    /// `Ok(true)` when the device restarted without needing a reboot.
    fn restart(&self, device: &SP_DEVINFO_DATA) -> Result<bool> {
        let params = SP_PROPCHANGE_PARAMS {
            ClassInstallHeader: SP_CLASSINSTALL_HEADER {
                cbSize: mem::size_of::<SP_CLASSINSTALL_HEADER>() as u32,
                InstallFunction: DIF_PROPERTYCHANGE,
            },
            StateChange: DICS_PROPCHANGE,
            Scope: DICS_FLAG_CONFIGSPECIFIC,
            HwProfile: 0,
        };
        let ok = unsafe {
            SetupDiSetClassInstallParamsW(
                self.0,
                device,
                (&params as *const SP_PROPCHANGE_PARAMS).cast::<SP_CLASSINSTALL_HEADER>(),
                mem::size_of::<SP_PROPCHANGE_PARAMS>() as u32,
            ) != 0
                && SetupDiCallClassInstaller(DIF_PROPERTYCHANGE, self.0, device) != 0
        };
        if !ok {
            return Err(InstallerError::DeviceReset { code: last_error() });
        }

        let mut install: SP_DEVINSTALL_PARAMS_W = unsafe { mem::zeroed() };
        install.cbSize = mem::size_of::<SP_DEVINSTALL_PARAMS_W>() as u32;
        if unsafe { SetupDiGetDeviceInstallParamsW(self.0, device, &mut install) } == 0 {
            return Err(InstallerError::DeviceReset { code: last_error() });
        }
        Ok(install.Flags & (DI_NEEDREBOOT | DI_NEEDRESTART) == 0)
    }
}

impl Drop for DeviceInfoSet {
    fn drop(&mut self) {
        unsafe { SetupDiDestroyDeviceInfoList(self.0) };
    }
}

pub fn reset_devices_by_class(interface_class: &str) -> Result<bool> {
    let class = parse_guid(interface_class)
        .ok_or(InstallerError::DeviceReset { code: ERROR_GEN_FAILURE })?;
    let set = DeviceInfoSet::present_with_interface(&class)?;

    let mut all_clean = true;
    let mut index = 0;
    while let Some(device) = set.device(index)? {
        match set.restart(&device) {
            Ok(true) => {}
            Ok(false) => all_clean = false,
            Err(e) => {
                installer_log!(Level::Warn, "devices", "Device {} of {} not restarted: {}", index, interface_class, e);
                all_clean = false;
            }
        }
        index += 1;
    }
    installer_log!(Level::Debug, "devices", "Reset {} device(s) of {}, clean={}", index, interface_class, all_clean);
    Ok(all_clean)
}
