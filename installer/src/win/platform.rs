//! Architecture queries and well-known directories.

use std::{
    ffi::{CStr, OsString},
    io, mem,
    os::windows::ffi::OsStringExt,
    path::PathBuf,
};
use windows_sys::Win32::{
    Foundation::{BOOL, HANDLE, MAX_PATH},
    System::{
        LibraryLoader::{GetModuleHandleW, GetProcAddress},
        SystemInformation::GetWindowsDirectoryW,
        Threading::GetCurrentProcess,
    },
};

use super::wide;

type IsWow64Process2Fn = unsafe extern "system" fn(HANDLE, *mut u16, *mut u16) -> BOOL;
type IsWow64ProcessFn = unsafe extern "system" fn(HANDLE, *mut BOOL) -> BOOL;

/// Resolve a kernel32 export that may not exist on older systems.
fn kernel32_export(name: &CStr) -> Option<unsafe extern "system" fn() -> isize> {
    let module = unsafe { GetModuleHandleW(wide("kernel32").as_ptr()) };
    if module.is_null() {
        return None;
    }
    unsafe { GetProcAddress(module, name.as_ptr().cast()) }
}

/// `(process machine, native machine)`; `None` before Windows 10 1511.
pub fn wow64_machines() -> Option<(u16, u16)> {
    let query: IsWow64Process2Fn = unsafe { mem::transmute(kernel32_export(c"IsWow64Process2")?) };
    let (mut process, mut native) = (0u16, 0u16);
    let ok = unsafe { query(GetCurrentProcess(), &mut process, &mut native) };
    (ok != 0).then_some((process, native))
}

pub fn is_wow64_process() -> Option<bool> {
    let query: IsWow64ProcessFn = unsafe { mem::transmute(kernel32_export(c"IsWow64Process")?) };
    let mut wow64: BOOL = 0;
    let ok = unsafe { query(GetCurrentProcess(), &mut wow64) };
    (ok != 0).then_some(wow64 != 0)
}

/// `%windir%`, e.g. `C:\Windows`.
pub fn windows_directory() -> io::Result<PathBuf> {
    let mut buf = [0u16; MAX_PATH as usize];
    let len = unsafe { GetWindowsDirectoryW(buf.as_mut_ptr(), buf.len() as u32) } as usize;
    if len == 0 || len > buf.len() {
        return Err(io::Error::last_os_error());
    }
    Ok(PathBuf::from(OsString::from_wide(&buf[..len])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_directory_is_a_real_directory() {
        let dir = windows_directory().unwrap();
        assert!(dir.is_absolute(), "{}", dir.display());
        assert!(dir.join("System32").is_dir(), "{}", dir.display());
    }
}
