// src/registry.rs

//! Upper-filter chain editing.
//!
//! The chain lives in one `REG_MULTI_SZ` value: every name followed by a NUL,
//! the list closed by one extra NUL. An empty list is stored as two NULs.
//! The value is always read whole, rebuilt and written back whole.

use log::Level;

use crate::error::Result;
use crate::host::RegistryAccess;
use crate::installer_log;

/// Where a multi-string value lives (under HKLM).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueLocation<'a> {
    pub subkey: &'a str,
    pub value: &'a str,
}

/// Split a raw multi-string into its entries, stopping at the first empty one.
/// A buffer missing its final terminator is decoded up to its end.
pub fn decode_multi_sz(raw: &[u16]) -> Vec<String> {
    raw.split(|&c| c == 0)
        .take_while(|entry| !entry.is_empty())
        .map(String::from_utf16_lossy)
        .collect()
}

/// Inverse of [`decode_multi_sz`], bit-exact with what the OS expects.
pub fn encode_multi_sz<S: AsRef<str>>(names: &[S]) -> Vec<u16> {
    let mut raw: Vec<u16> = Vec::new();
    for name in names {
        raw.extend(name.as_ref().encode_utf16());
        raw.push(0);
    }
    if raw.is_empty() {
        raw.push(0);
    }
    raw.push(0);
    raw
}

/// Read the chain; a missing value is an empty chain.
pub fn read_filter_names<R: RegistryAccess + ?Sized>(
    registry: &R,
    at: ValueLocation<'_>,
) -> Result<Vec<String>> {
    let names = match registry.read_multi_sz(at.subkey, at.value)? {
        Some(raw) => decode_multi_sz(&raw),
        None => Vec::new(),
    };
    installer_log!(Level::Debug, "registry", "{} = {:?}", at.value, names);
    Ok(names)
}

/// Replace the chain with `names` in one write.
pub fn write_filter_names<R: RegistryAccess + ?Sized, S: AsRef<str>>(
    registry: &R,
    at: ValueLocation<'_>,
    names: &[S],
) -> Result<()> {
    registry.write_multi_sz(at.subkey, at.value, &encode_multi_sz(names))
}

/// `names` without any occurrence of `target`, order preserved.
pub fn remove_name(names: &[String], target: &str) -> Vec<String> {
    names.iter().filter(|n| *n != target).cloned().collect()
}

/// `names` with `target` present exactly once, as the last entry.
pub fn append_unique(names: &[String], target: &str) -> Vec<String> {
    let mut out = remove_name(names, target);
    out.push(target.to_owned());
    out
}
