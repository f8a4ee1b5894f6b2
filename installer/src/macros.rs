/// Logs a line tagged with the installer component that produced it.
/// Usage:
/// ```ignore
/// installer_log!(Level::Info, "service", "Service {} created", name);
/// installer_log!(Level::Warn, "signing", "bcdedit timed out");
/// ```
/// The component becomes the log target, so the fern format in `main.rs`
/// renders it as:
/// [2025-04-25T16:32:10+02:00][INFO ][service][pid=4568][tid=ThreadId(1)] Service UsbDk created
#[macro_export]
macro_rules! installer_log {
    ($level:expr, $component:expr, $fmt:expr $(, $($arg:tt)+)?) => {
        log::log!(target: $component, $level, $fmt $(, $($arg)+)?)
    };
}
