// src/platform.rs

//! Refuses to install from a 32-bit process on a 64-bit OS.

use log::Level;

use shared::constants::{
    IMAGE_FILE_MACHINE_AMD64, IMAGE_FILE_MACHINE_ARM64, IMAGE_FILE_MACHINE_ARMNT,
    IMAGE_FILE_MACHINE_I386,
};

use crate::error::{InstallerError, Result};
use crate::host::ArchitectureProbe;
use crate::installer_log;

/// x86 on x64, or ARM32 on ARM64.
pub fn is_32_on_64(process_machine: u16, native_machine: u16) -> bool {
    matches!(
        (process_machine, native_machine),
        (IMAGE_FILE_MACHINE_I386, IMAGE_FILE_MACHINE_AMD64)
            | (IMAGE_FILE_MACHINE_ARMNT, IMAGE_FILE_MACHINE_ARM64)
    )
}

/// Prefer the exact machine pair; fall back to the WOW64 flag on systems
/// that predate `IsWow64Process2`.
pub fn is_emulated_32bit<P: ArchitectureProbe + ?Sized>(probe: &P) -> bool {
    match probe.machines() {
        Some((process, native)) => is_32_on_64(process, native),
        None => probe.legacy_wow64().unwrap_or(false),
    }
}

pub fn validate<P: ArchitectureProbe + ?Sized>(probe: &P) -> Result<()> {
    if is_emulated_32bit(probe) {
        installer_log!(Level::Error, "platform", "32-bit installer running on a 64-bit OS");
        return Err(InstallerError::PlatformMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe(Option<(u16, u16)>, Option<bool>);

    impl ArchitectureProbe for Probe {
        fn machines(&self) -> Option<(u16, u16)> {
            self.0
        }
        fn legacy_wow64(&self) -> Option<bool> {
            self.1
        }
    }

    /// IMAGE_FILE_MACHINE_UNKNOWN: the process is not under WOW64.
    const NATIVE: u16 = 0;

    #[test]
    fn machine_pairs() {
        assert!(is_32_on_64(IMAGE_FILE_MACHINE_I386, IMAGE_FILE_MACHINE_AMD64));
        assert!(is_32_on_64(IMAGE_FILE_MACHINE_ARMNT, IMAGE_FILE_MACHINE_ARM64));
        assert!(!is_32_on_64(NATIVE, IMAGE_FILE_MACHINE_AMD64));
        // x86 under ARM64 emulation is not a rejected pair
        assert!(!is_32_on_64(IMAGE_FILE_MACHINE_I386, IMAGE_FILE_MACHINE_ARM64));
    }

    #[test]
    fn exact_query_wins_over_legacy() {
        let probe = Probe(Some((NATIVE, IMAGE_FILE_MACHINE_AMD64)), Some(true));
        assert!(validate(&probe).is_ok());
    }

    #[test]
    fn legacy_fallback_and_unknown() {
        assert!(matches!(validate(&Probe(None, Some(true))), Err(InstallerError::PlatformMismatch)));
        assert!(validate(&Probe(None, Some(false))).is_ok());
        assert!(validate(&Probe(None, None)).is_ok());
    }
}
