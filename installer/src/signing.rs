// src/signing.rs

//! Driver signing policy check and test-signing remediation.
//!
//! Runs once per install:
//!
//!   build number ─▶ strict policy? ─▶ test signing on? ─▶ bcdedit /set testsigning on
//!
//! Every state other than a successful `bcdedit` lets the install continue
//! without a reboot: an unreadable build, an old OS, test signing already on,
//! or a failed attempt (the package may be properly signed after all).

use log::Level;
use std::{
    fmt, io,
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

use shared::constants::{
    CI_POLICY_SUBTREE, CURRENT_BUILD_VALUE, CURRENT_VERSION_SUBTREE, TEST_SIGNING_VALUE,
};

use crate::config::SigningConfig;
use crate::host::RegistryAccess;
use crate::installer_log;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Where the remediation state machine stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningOutcome {
    /// Remediation switched off in the config.
    Disabled,
    /// `CurrentBuild` missing or not a number.
    UnknownBuild,
    /// Build predates the strict policy.
    NotRequired { build: u32 },
    AlreadyEnabled { build: u32 },
    /// Test signing turned on; takes effect after a reboot.
    Enabled { build: u32 },
    EnableFailed { build: u32, reason: LaunchFailure },
}

impl SigningOutcome {
    pub fn reboot_required(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }
}

/// Why the boot configuration editor did not report success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchFailure {
    Spawn(String),
    ExitCode(Option<i32>),
    TimedOut(Duration),
    Wait(String),
}

impl fmt::Display for LaunchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(e) => write!(f, "could not be launched: {e}"),
            Self::ExitCode(Some(code)) => write!(f, "exited with code {code}"),
            Self::ExitCode(None) => write!(f, "was terminated by a signal"),
            Self::TimedOut(t) => write!(f, "did not finish within {t:?}"),
            Self::Wait(e) => write!(f, "could not be waited on: {e}"),
        }
    }
}

/// Owns a spawned child. Dropping it kills the child if it is still running
/// and reaps it, releasing the process handles.
pub struct ScopedChild {
    child: Child,
    reaped: bool,
}

impl ScopedChild {
    pub fn spawn(command: &mut Command) -> io::Result<Self> {
        Ok(Self { child: command.spawn()?, reaped: false })
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Poll for exit until `timeout` elapses. `Ok(None)` means the child is
    /// still running; it is killed when the guard is dropped. A timeout too
    /// large to represent waits without a deadline.
    pub fn wait_timeout(&mut self, timeout: Duration) -> io::Result<Option<ExitStatus>> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if let Some(status) = self.child.try_wait()? {
                self.reaped = true;
                return Ok(Some(status));
            }
            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    POLL_INTERVAL.min(deadline - now)
                }
                None => POLL_INTERVAL,
            };
            thread::sleep(pause);
        }
    }
}

impl Drop for ScopedChild {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        if let Err(e) = self.child.kill() {
            installer_log!(Level::Debug, "signing", "kill of pid {} failed: {}", self.child.id(), e);
        }
        let _ = self.child.wait();
    }
}

/// Run `program args..` with no console and at most `timeout` of waiting.
pub fn run_bounded(program: &str, args: &[String], timeout: Duration) -> Result<(), LaunchFailure> {
    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(CREATE_NO_WINDOW);
    }

    let mut child = ScopedChild::spawn(&mut command).map_err(|e| LaunchFailure::Spawn(e.to_string()))?;
    installer_log!(Level::Debug, "signing", "Launched {} (pid {})", program, child.id());

    match child.wait_timeout(timeout) {
        Ok(Some(status)) if status.success() => Ok(()),
        Ok(Some(status)) => Err(LaunchFailure::ExitCode(status.code())),
        Ok(None) => Err(LaunchFailure::TimedOut(timeout)),
        Err(e) => Err(LaunchFailure::Wait(e.to_string())),
    }
}

/// `CurrentBuild` as a number, if readable.
pub fn read_build_number<R: RegistryAccess + ?Sized>(registry: &R) -> Option<u32> {
    match registry.read_string(CURRENT_VERSION_SUBTREE, CURRENT_BUILD_VALUE) {
        Ok(Some(text)) => text.trim().parse().ok(),
        Ok(None) => None,
        Err(e) => {
            installer_log!(Level::Debug, "signing", "CurrentBuild unreadable: {}", e);
            None
        }
    }
}

/// The CI policy `TestSigning` flag; missing or unreadable reads as off.
pub fn is_test_signing_enabled<R: RegistryAccess + ?Sized>(registry: &R) -> bool {
    matches!(registry.read_dword(CI_POLICY_SUBTREE, TEST_SIGNING_VALUE), Ok(Some(v)) if v != 0)
}

pub struct SigningRemediator<'a, R: RegistryAccess + ?Sized> {
    registry: &'a R,
    cfg: &'a SigningConfig,
}

impl<'a, R: RegistryAccess + ?Sized> SigningRemediator<'a, R> {
    pub fn new(registry: &'a R, cfg: &'a SigningConfig) -> Self {
        Self { registry, cfg }
    }

    /// Walk the state machine. Never fails: problems degrade to "proceed".
    pub fn evaluate(&self) -> SigningOutcome {
        let outcome = self.run();
        match &outcome {
            SigningOutcome::Enabled { .. } => {
                installer_log!(Level::Warn, "signing", "Test signing enabled, reboot required")
            }
            SigningOutcome::EnableFailed { reason, .. } => installer_log!(
                Level::Warn,
                "signing",
                "Could not enable test signing: {} {}; continuing",
                self.cfg.command,
                reason
            ),
            other => installer_log!(Level::Info, "signing", "No remediation needed: {:?}", other),
        }
        outcome
    }

    fn run(&self) -> SigningOutcome {
        if !self.cfg.enabled {
            return SigningOutcome::Disabled;
        }
        let Some(build) = read_build_number(self.registry) else {
            return SigningOutcome::UnknownBuild;
        };
        if build < self.cfg.min_build {
            return SigningOutcome::NotRequired { build };
        }
        installer_log!(Level::Debug, "signing", "Build {} has strict signing, checking test signing", build);
        if is_test_signing_enabled(self.registry) {
            return SigningOutcome::AlreadyEnabled { build };
        }
        match run_bounded(&self.cfg.command, &self.cfg.args, self.cfg.timeout) {
            Ok(()) => SigningOutcome::Enabled { build },
            Err(reason) => SigningOutcome::EnableFailed { build, reason },
        }
    }
}
