//! Integration tests for the install / uninstall orchestration.
//!
//! These drive `Installer` against the in-memory `FakeHost` and a pair of
//! temporary directories standing in for the package and
//! `System32\Drivers`.

mod common;

use common::{FakeHost, RegValue, Sandbox};
use installer::{
    config::Config, install_driver, signing::SigningOutcome, uninstall_driver, InstallResult,
    InstallerError,
};
use shared::constants::{
    CI_POLICY_SUBTREE, ERROR_DRIVER_BLOCKED, ERROR_DRIVER_FAILED_PRIOR_UNLOAD,
    ERROR_SERVICE_DISABLED, IMAGE_FILE_MACHINE_AMD64, IMAGE_FILE_MACHINE_I386, TEST_SIGNING_VALUE,
};

#[test]
fn install_then_uninstall_restores_the_chain() {
    let sandbox = Sandbox::new();
    let host = FakeHost::default();
    host.set_filters(&["OtherFilter"]);
    let installer = sandbox.installer(host);

    let outcome = installer.install().expect("install failed");
    assert!(!outcome.reboot_required);
    assert_eq!(installer.host().filters().unwrap(), ["OtherFilter", "UsbDk"]);
    assert!(installer.host().has_service("UsbDk"));
    assert!(sandbox.deployed_driver().exists());

    installer.uninstall().expect("uninstall failed");
    assert_eq!(installer.host().filters().unwrap(), ["OtherFilter"]);
    assert!(!installer.host().has_service("UsbDk"));
    assert!(!sandbox.deployed_driver().exists());
}

#[test]
fn install_runs_steps_in_order() {
    let sandbox = Sandbox::new();
    let installer = sandbox.installer(FakeHost::default());
    installer.install().unwrap();

    assert_eq!(
        installer.host().journal(),
        [
            "coinstaller pre-install",
            "service create UsbDk",
            "service start UsbDk",
            "service stop UsbDk",
            "coinstaller post-install",
            "reg write UpperFilters",
            "reset host controllers",
        ]
    );
}

#[test]
fn uninstall_runs_steps_in_order() {
    let sandbox = Sandbox::new();
    let host = FakeHost::default();
    host.set_filters(&["UsbDk"]);
    let installer = sandbox.installer(host);
    installer.uninstall().unwrap();

    assert_eq!(
        installer.host().journal(),
        [
            "reg write UpperFilters",
            "reset host controllers",
            "coinstaller pre-remove",
            "service delete UsbDk",
            "coinstaller post-remove",
        ]
    );
    assert_eq!(installer.host().filters().unwrap(), Vec::<String>::new());
}

#[test]
fn install_creates_chain_when_value_is_absent() {
    let sandbox = Sandbox::new();
    let installer = sandbox.installer(FakeHost::default());
    installer.install().unwrap();
    assert_eq!(installer.host().filters().unwrap(), ["UsbDk"]);
}

#[test]
fn stale_entry_is_moved_to_the_end_once() {
    let sandbox = Sandbox::new();
    let host = FakeHost::default();
    host.set_filters(&["UsbDk", "A", "UsbDk", "B"]);
    let installer = sandbox.installer(host);
    installer.install().unwrap();
    assert_eq!(installer.host().filters().unwrap(), ["A", "B", "UsbDk"]);
}

#[test]
fn wow64_process_is_rejected_before_any_side_effect() {
    let sandbox = Sandbox::new();
    let host = FakeHost::default();
    host.machines.set(Some((IMAGE_FILE_MACHINE_I386, IMAGE_FILE_MACHINE_AMD64)));
    host.set_filters(&["OtherFilter"]);
    let installer = sandbox.installer(host);

    let failure = installer.install().unwrap_err();
    assert!(matches!(failure.error, InstallerError::PlatformMismatch));
    assert!(!failure.needs_rollback);
    assert!(installer.host().journal().is_empty());
    assert!(!sandbox.deployed_driver().exists());
    assert_eq!(installer.host().filters().unwrap(), ["OtherFilter"]);
}

#[test]
fn legacy_wow64_query_is_used_when_exact_one_is_missing() {
    let sandbox = Sandbox::new();
    let host = FakeHost::default();
    host.machines.set(None);
    host.legacy_wow64.set(Some(true));
    let installer = sandbox.installer(host);

    assert!(matches!(installer.install().unwrap_err().error, InstallerError::PlatformMismatch));
    assert!(installer.host().journal().is_empty());
}

#[test]
fn expected_start_failures_complete_the_install() {
    for code in [ERROR_SERVICE_DISABLED, ERROR_DRIVER_BLOCKED, ERROR_DRIVER_FAILED_PRIOR_UNLOAD] {
        let sandbox = Sandbox::new();
        let host = FakeHost::default();
        host.start_error.set(Some(code));
        let installer = sandbox.installer(host);

        installer.install().unwrap_or_else(|f| panic!("code {code}: {f}"));
        assert!(installer.host().has_service("UsbDk"), "code {code}");
        assert!(!installer.host().journal().contains(&"service delete UsbDk".to_string()));
    }
}

#[test]
fn unknown_start_failure_aborts_and_removes_the_service() {
    let sandbox = Sandbox::new();
    let host = FakeHost::default();
    host.start_error.set(Some(577)); // ERROR_INVALID_IMAGE_HASH
    host.set_filters(&["OtherFilter"]);
    let installer = sandbox.installer(host);

    let failure = installer.install().unwrap_err();
    assert!(matches!(failure.error, InstallerError::InstallAborted));
    assert!(failure.needs_rollback, "copied driver file still needs cleanup");
    assert!(!installer.host().has_service("UsbDk"));
    assert!(installer.host().journal().contains(&"service delete UsbDk".to_string()));
    // nothing past verification ran
    assert_eq!(installer.host().filters().unwrap(), ["OtherFilter"]);
    assert!(sandbox.deployed_driver().exists());
}

#[test]
fn failed_copy_does_not_ask_for_rollback() {
    let sandbox = Sandbox::new();
    std::fs::remove_file(sandbox.package.path().join("UsbDk.sys")).unwrap();
    let installer = sandbox.installer(FakeHost::default());

    let failure = installer.install().unwrap_err();
    assert!(matches!(failure.error, InstallerError::FileCopy { .. }));
    assert!(!failure.needs_rollback);
    assert!(installer.host().journal().is_empty());
}

#[test]
fn existing_service_fails_install_after_copy() {
    let sandbox = Sandbox::new();
    let host = FakeHost::default();
    host.services.borrow_mut().insert("UsbDk".into(), "C:\\old\\UsbDk.sys".into());
    let installer = sandbox.installer(host);

    let failure = installer.install().unwrap_err();
    assert!(failure.needs_rollback);
    assert!(matches!(failure.error, InstallerError::ServiceOperation { op: "create", .. }));
}

#[test]
fn coinstaller_reboot_skips_device_reset() {
    let sandbox = Sandbox::new();
    let host = FakeHost::default();
    host.coinstaller_wants_reboot.set(true);
    let installer = sandbox.installer(host);

    assert!(installer.install().unwrap().reboot_required);
    assert!(!installer.host().journal().contains(&"reset host controllers".to_string()));
    assert_eq!(installer.host().filters().unwrap(), ["UsbDk"]);
}

#[test]
fn unclean_device_reset_reports_reboot() {
    let sandbox = Sandbox::new();
    let host = FakeHost::default();
    host.reset_is_clean.set(false);
    let installer = sandbox.installer(host);
    assert!(installer.install().unwrap().reboot_required);
}

#[test]
fn failed_device_reset_keeps_the_install_and_asks_for_reboot() {
    let sandbox = Sandbox::new();
    let host = FakeHost::default();
    host.set_filters(&["OtherFilter"]);
    host.reset_error.set(Some(5));
    let installer = sandbox.installer(host);

    assert_eq!(install_driver(&installer), InstallResult::SuccessNeedReboot);
    assert_eq!(installer.host().filters().unwrap(), ["OtherFilter", "UsbDk"]);
    assert!(installer.host().has_service("UsbDk"));
    assert!(sandbox.deployed_driver().exists());
    assert!(!installer.host().journal().contains(&"coinstaller pre-remove".to_string()));
}

#[test]
fn uninstall_survives_device_reset_failure() {
    let sandbox = Sandbox::new();
    let host = FakeHost::default();
    host.set_filters(&["OtherFilter", "UsbDk"]);
    host.reset_error.set(Some(5));
    let installer = sandbox.installer(host);

    assert!(uninstall_driver(&installer));
    assert_eq!(installer.host().filters().unwrap(), ["OtherFilter"]);
    assert!(installer.host().journal().contains(&"coinstaller post-remove".to_string()));
}

#[test]
fn uninstall_on_fresh_system_succeeds_twice() {
    let sandbox = Sandbox::new();
    let installer = sandbox.installer(FakeHost::default());

    installer.uninstall().expect("first uninstall");
    installer.uninstall().expect("second uninstall");
    assert!(installer.host().filters().is_none(), "absent value must not be created");
    assert!(!installer.host().journal().contains(&"reg write UpperFilters".to_string()));
}

#[test]
fn uninstall_survives_filter_write_failure() {
    let sandbox = Sandbox::new();
    let host = FakeHost::default();
    host.set_filters(&["OtherFilter", "UsbDk"]);
    host.registry_write_error.set(Some(5));
    let installer = sandbox.installer(host);

    installer.install().ok();
    installer.uninstall().expect("write failure must not block uninstall");
    assert!(!installer.host().has_service("UsbDk"));
    assert!(!sandbox.deployed_driver().exists());
}

#[test]
fn install_fails_on_filter_write_failure() {
    let sandbox = Sandbox::new();
    let host = FakeHost::default();
    host.registry_write_error.set(Some(5));
    let installer = sandbox.installer(host);

    let failure = installer.install().unwrap_err();
    assert!(failure.needs_rollback);
    assert_eq!(failure.error.os_code(), Some(5));
}

#[test]
fn helper_rolls_back_after_abort() {
    let sandbox = Sandbox::new();
    let host = FakeHost::default();
    host.start_error.set(Some(577));
    let installer = sandbox.installer(host);

    assert_eq!(install_driver(&installer), InstallResult::Aborted);
    assert!(!sandbox.deployed_driver().exists(), "rollback removes the copied driver");
    assert!(installer.host().journal().contains(&"coinstaller post-remove".to_string()));
}

#[test]
fn helper_does_not_roll_back_before_copy() {
    let sandbox = Sandbox::new();
    let host = FakeHost::default();
    host.legacy_wow64.set(Some(true));
    host.machines.set(None);
    let installer = sandbox.installer(host);

    assert_eq!(install_driver(&installer), InstallResult::Failure);
    assert!(installer.host().journal().is_empty());
}

#[test]
fn helper_verdicts() {
    let sandbox = Sandbox::new();
    let installer = sandbox.installer(FakeHost::default());
    assert_eq!(install_driver(&installer), InstallResult::Success);
    assert!(uninstall_driver(&installer));

    let sandbox = Sandbox::new();
    let host = FakeHost::default();
    host.reset_is_clean.set(false);
    let installer = sandbox.installer(host);
    assert_eq!(install_driver(&installer), InstallResult::SuccessNeedReboot);
}

#[test]
fn remediation_switched_off_skips_signing_checks() {
    let sandbox = Sandbox::new();
    let host = FakeHost::default();
    host.set(CI_POLICY_SUBTREE, TEST_SIGNING_VALUE, RegValue::Dword(0));
    let mut config = Config::default();
    config.signing.enabled = false;
    let installer = sandbox.installer_with(host, config);

    let outcome = installer.install().unwrap();
    assert!(!outcome.reboot_required);
    assert_eq!(outcome.signing, SigningOutcome::Disabled);
}
