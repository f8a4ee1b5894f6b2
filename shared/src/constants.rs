//! Constants shared between the installer and any other UsbDk tooling.

/*────────── driver identity ─────────*/

pub const DRIVER_NAME: &str = "UsbDk";
pub const DRIVER_FILE_NAME: &str = "UsbDk.sys";
pub const DRIVER_INF_NAME: &str = "UsbDk.inf";
pub const DRIVER_INF_SECTION: &str = "UsbDk.NT.Wdf";
pub const COINSTALLER_DLL_NAME: &str = "WdfCoInstaller01011.dll";

/// Relative to the Windows directory.
pub const SYSTEM32_DRIVERS: &str = r"System32\Drivers";

/*────────── registry (all under HKLM) ─────────*/

/// USB device setup class.
pub const UPPER_FILTER_SUBTREE: &str =
    r"System\CurrentControlSet\Control\Class\{36FC9E60-C465-11CF-8056-444553540000}";
pub const UPPER_FILTER_VALUE: &str = "UpperFilters";

pub const CURRENT_VERSION_SUBTREE: &str = r"Software\Microsoft\Windows NT\CurrentVersion";
pub const CURRENT_BUILD_VALUE: &str = "CurrentBuild";

pub const CI_POLICY_SUBTREE: &str = r"System\CurrentControlSet\Control\CI\Policy";
pub const TEST_SIGNING_VALUE: &str = "TestSigning";

/// Windows 10 1607, the first build enforcing attestation signing.
pub const STRICT_SIGNING_MIN_BUILD: u32 = 14393;

/*────────── device classes ─────────*/

/// GUID_DEVINTERFACE_USB_HOST_CONTROLLER
pub const USB_HOST_CONTROLLER_INTERFACE: &str = "{3ABF6F2D-71C4-462A-8A92-1E6861E6AF27}";

/*────────── Win32 error codes ─────────*/

pub const ERROR_GEN_FAILURE: u32 = 31;
pub const ERROR_EXE_MACHINE_TYPE_MISMATCH: u32 = 216;
pub const ERROR_DRIVER_FAILED_PRIOR_UNLOAD: u32 = 0x28C;
pub const ERROR_SERVICE_DISABLED: u32 = 1058;
pub const ERROR_SERVICE_DOES_NOT_EXIST: u32 = 1060;
pub const ERROR_SERVICE_EXISTS: u32 = 1073;
pub const ERROR_DRIVER_BLOCKED: u32 = 0x4E6;
pub const ERROR_SUCCESS_REBOOT_REQUIRED: u32 = 3010;

/*────────── IMAGE_FILE_MACHINE_* ─────────*/

pub const IMAGE_FILE_MACHINE_I386: u16 = 0x014c;
pub const IMAGE_FILE_MACHINE_ARMNT: u16 = 0x01c4;
pub const IMAGE_FILE_MACHINE_AMD64: u16 = 0x8664;
pub const IMAGE_FILE_MACHINE_ARM64: u16 = 0xAA64;
