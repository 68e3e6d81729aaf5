//! Debug output and logging
//!
//! `kprint!`/`kprintln!` write straight to the compile-time selected
//! console. [`KernelLogger`] routes the `log` facade through the same
//! console with a level tag, so kernel modules only ever use `log::*!`.
//!
//! The maximum level comes from the `log-*` features (most verbose wins),
//! defaulting to info.

use crate::config;
use core::fmt;
use log::{LevelFilter, Log, Metadata, Record};

/// Debug writer (uses the kernel console)
pub struct DebugWriter;

impl fmt::Write for DebugWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        use crate::components::console::Console;
        config::console().puts(s);
        Ok(())
    }
}

/// Print macro for kernel
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => ({
        use core::fmt::Write;
        let _ = write!($crate::debug::DebugWriter, $($arg)*);
    });
}

/// Print with newline macro for kernel
#[macro_export]
macro_rules! kprintln {
    () => ($crate::kprint!("\n"));
    ($($arg:tt)*) => ({
        use core::fmt::Write;
        let _ = writeln!($crate::debug::DebugWriter, $($arg)*);
    });
}

/// `log` backend writing to the kernel console
pub struct KernelLogger;

static LOGGER: KernelLogger = KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            crate::kprintln!("{:<5} {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Level selected by the `log-*` features
pub const fn max_level() -> LevelFilter {
    if cfg!(feature = "log-trace") {
        LevelFilter::Trace
    } else if cfg!(feature = "log-debug") {
        LevelFilter::Debug
    } else if cfg!(feature = "log-info") {
        LevelFilter::Info
    } else if cfg!(feature = "log-warn") {
        LevelFilter::Warn
    } else if cfg!(feature = "log-error") {
        LevelFilter::Error
    } else {
        LevelFilter::Info
    }
}

/// Install [`KernelLogger`] as the `log` backend
///
/// # Safety
/// Must be called once, during boot, before interrupts can reach the
/// kernel. The core has no atomic compare-and-swap, so installation is not
/// synchronized.
pub unsafe fn init_logger() {
    if log::set_logger_racy(&LOGGER).is_ok() {
        log::set_max_level_racy(max_level());
    }
}
