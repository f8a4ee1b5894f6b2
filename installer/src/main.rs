// src/main.rs

//! UsbDk installer entry-point.
//!
//! 1. Load `installer.toml` next to the executable (optional)
//! 2. Set up structured logging
//! 3. Run `install` or `uninstall` against the live machine
//! 4. Map the verdict to the process exit code
//!

// ───── std / 3rd-party imports ──────────────────────────────────────────────
use anyhow::Context;
use chrono::Local;
use fern::Dispatch;
use log::LevelFilter;
use std::{
    path::{Path, PathBuf},
    process, thread,
};

// ───── local imports ────────────────────────────────────────────────────────
use installer::config::{self, Config};

// ───── exit codes ───────────────────────────────────────────────────────────
const EXIT_FAILURE: i32 = 1;
#[cfg(windows)]
const EXIT_ABORTED: i32 = 2;
const EXIT_USAGE: i32 = 64;
/// ERROR_SUCCESS_REBOOT_REQUIRED, as msiexec reports it.
#[cfg(windows)]
const EXIT_REBOOT: i32 = 3010;

// ───── helpers ──────────────────────────────────────────────────────────────

/// Print an error with context and terminate the process.
macro_rules! fatal {
    ($ctx:expr, $($arg:tt)+) => {{
        eprintln!(
            "[{}][ERROR][{}] {}",
            chrono::Local::now().to_rfc3339(),
            $ctx,
            format!($($arg)+)
        );
        std::process::exit(EXIT_FAILURE);
    }};
}

/// Directory that contains the running executable.
fn exe_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot determine exe path")?;
    exe.parent()
        .map(Path::to_path_buf)
        .context("executable must live in some directory")
}

/// Configure global logging as requested in `cfg.logging`.
fn setup_logging(exe_dir: &Path, cfg: &Config) -> Result<(), fern::InitError> {
    let level = match cfg.logging.level.to_uppercase().as_str() {
        "ERROR" => LevelFilter::Error,
        "WARN" => LevelFilter::Warn,
        "DEBUG" => LevelFilter::Debug,
        "TRACE" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    let log_path = cfg
        .logging
        .enable
        .then(|| exe_dir.join(cfg.logging.file.as_deref().unwrap_or("usbdk-installer.log")));

    let mut dispatch = Dispatch::new()
        .format(|out, msg, record| {
            out.finish(format_args!(
                "[{}][{:5}][{}][pid={}][tid={:?}] {}",
                Local::now().to_rfc3339(),
                record.level(),
                record.target(),
                process::id(),
                thread::current().id(),
                msg
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    if let Some(path) = log_path {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Install,
    Uninstall,
}

fn parse_action(arg: Option<&str>) -> Option<Action> {
    match arg?.to_ascii_lowercase().as_str() {
        "install" | "-i" => Some(Action::Install),
        "uninstall" | "-u" => Some(Action::Uninstall),
        _ => None,
    }
}

// ───── installer logic ──────────────────────────────────────────────────────

#[cfg(windows)]
fn run(action: Action, cfg: Config) -> anyhow::Result<i32> {
    use installer::{
        install_driver, uninstall_driver, win::WindowsHost, InstallLayout, InstallResult, Installer,
    };

    let windows_dir = WindowsHost::windows_dir().context("cannot resolve the Windows directory")?;
    let layout = InstallLayout::from_current_dir(&windows_dir)?;
    let host = WindowsHost::new(&layout.package_dir, &cfg.driver);
    let installer = Installer::new(host, cfg, layout);

    Ok(match action {
        Action::Install => match install_driver(&installer) {
            InstallResult::Success => 0,
            InstallResult::SuccessNeedReboot => EXIT_REBOOT,
            InstallResult::Failure => EXIT_FAILURE,
            InstallResult::Aborted => EXIT_ABORTED,
        },
        Action::Uninstall => {
            if uninstall_driver(&installer) { 0 } else { EXIT_FAILURE }
        }
    })
}

#[cfg(not(windows))]
fn run(_action: Action, _cfg: Config) -> anyhow::Result<i32> {
    anyhow::bail!("the UsbDk driver can only be installed on Windows")
}

fn main() {
    let arg = std::env::args().nth(1);
    let Some(action) = parse_action(arg.as_deref()) else {
        eprintln!("usage: usbdk-installer <install|uninstall>");
        process::exit(EXIT_USAGE);
    };

    // 1 ─ Context
    let exe_dir = exe_dir().unwrap_or_else(|e| fatal!("main", "{:#}", e));
    let cfg = config::load_or_default(&exe_dir.join("installer.toml"))
        .unwrap_or_else(|e| fatal!("config", "{}", e));

    // 2 ─ Logging
    setup_logging(&exe_dir, &cfg).unwrap_or_else(|e| fatal!("logging", "{}", e));
    log::info!("{:?} requested", action);

    // 3 ─ Work
    match run(action, cfg) {
        Ok(code) => process::exit(code),
        Err(e) => fatal!("main", "{:#}", e),
    }
}
