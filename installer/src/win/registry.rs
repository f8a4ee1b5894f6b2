//! HKLM value access through `RegGetValueW` / `RegSetKeyValueW`.

use std::{mem, ptr};
use windows_sys::Win32::{
    Foundation::{ERROR_FILE_NOT_FOUND, ERROR_MORE_DATA, ERROR_SUCCESS},
    System::Registry::{
        RegGetValueW, RegSetKeyValueW, HKEY_LOCAL_MACHINE, REG_MULTI_SZ, RRF_RT_REG_DWORD,
        RRF_RT_REG_MULTI_SZ, RRF_RT_REG_SZ,
    },
};

use super::wide;
use crate::error::{InstallerError, Result};

fn registry_err(op: &'static str, code: u32) -> InstallerError {
    InstallerError::RegistryOperation { op, code }
}

/// Query a value into a UTF-16 buffer, growing it if the value changes size
/// between the size probe and the read.
fn get_wide(subkey: &str, value: &str, flags: u32) -> Result<Option<Vec<u16>>> {
    let key = wide(subkey);
    let name = wide(value);
    let query = |data: *mut u16, size: &mut u32| unsafe {
        RegGetValueW(HKEY_LOCAL_MACHINE, key.as_ptr(), name.as_ptr(), flags, ptr::null_mut(), data.cast(), size)
    };

    let mut size = 0u32;
    loop {
        match query(ptr::null_mut(), &mut size) {
            ERROR_SUCCESS => {}
            ERROR_FILE_NOT_FOUND => return Ok(None),
            code => return Err(registry_err("size query", code)),
        }

        let mut buf = vec![0u16; (size as usize).div_ceil(2)];
        match query(buf.as_mut_ptr(), &mut size) {
            ERROR_SUCCESS => {
                buf.truncate(size as usize / 2);
                return Ok(Some(buf));
            }
            ERROR_MORE_DATA => continue,
            ERROR_FILE_NOT_FOUND => return Ok(None),
            code => return Err(registry_err("read", code)),
        }
    }
}

pub fn read_multi_sz(subkey: &str, value: &str) -> Result<Option<Vec<u16>>> {
    get_wide(subkey, value, RRF_RT_REG_MULTI_SZ)
}

pub fn write_multi_sz(subkey: &str, value: &str, data: &[u16]) -> Result<()> {
    let key = wide(subkey);
    let name = wide(value);
    let rc = unsafe {
        RegSetKeyValueW(
            HKEY_LOCAL_MACHINE,
            key.as_ptr(),
            name.as_ptr(),
            REG_MULTI_SZ,
            data.as_ptr().cast(),
            mem::size_of_val(data) as u32,
        )
    };
    match rc {
        ERROR_SUCCESS => Ok(()),
        code => Err(registry_err("write", code)),
    }
}

pub fn read_string(subkey: &str, value: &str) -> Result<Option<String>> {
    Ok(get_wide(subkey, value, RRF_RT_REG_SZ)?.map(|buf| {
        let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
        String::from_utf16_lossy(&buf[..end])
    }))
}

pub fn read_dword(subkey: &str, value: &str) -> Result<Option<u32>> {
    let key = wide(subkey);
    let name = wide(value);
    let mut data = 0u32;
    let mut size = mem::size_of::<u32>() as u32;
    let rc = unsafe {
        RegGetValueW(
            HKEY_LOCAL_MACHINE,
            key.as_ptr(),
            name.as_ptr(),
            RRF_RT_REG_DWORD,
            ptr::null_mut(),
            (&mut data as *mut u32).cast(),
            &mut size,
        )
    };
    match rc {
        ERROR_SUCCESS => Ok(Some(data)),
        ERROR_FILE_NOT_FOUND => Ok(None),
        code => Err(registry_err("read", code)),
    }
}
