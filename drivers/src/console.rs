//! Diagnostic console.
//!
//! One process-wide text sink (any [`fmt::Write`]), the `dprint!` /
//! `dprintln!` macros writing to it, and a [`log`] backend that formats
//! records onto it. Output is dropped while no sink is installed.

use alloc::boxed::Box;
use core::fmt;

use common::sync::SpinLock;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

type Sink = Box<dyn fmt::Write + Send>;

static SINK: SpinLock<Option<Sink>> = SpinLock::new(None);

/// Install `sink` as the console, returning the previous one.
pub fn set_sink(sink: Sink) -> Option<Sink> {
    SINK.lock().replace(sink)
}

/// Remove the console sink.
pub fn take_sink() -> Option<Sink> {
    SINK.lock().take()
}

/// Write formatted text to the console.
///
/// Uses `try_lock`: output from a handler that interrupted a console
/// write is dropped rather than deadlocking.
pub fn console_fmt(args: fmt::Arguments<'_>) {
    if let Some(mut sink) = SINK.try_lock() {
        if let Some(sink) = sink.as_mut() {
            let _ = sink.write_fmt(args);
        }
    }
}

// ============================================================================
// Print Macros
// ============================================================================

/// Print to console without newline
#[macro_export]
macro_rules! dprint {
    ($($arg:tt)*) => {{
        $crate::console::console_fmt(format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! dprintln {
    () => { $crate::dprint!("\n") };
    ($($arg:tt)*) => {{
        $crate::dprint!($($arg)*);
        $crate::dprint!("\n");
    }};
}

// ============================================================================
// Logger
// ============================================================================

/// [`log`] backend writing `[LEVEL target] message` lines to the console.
pub struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            crate::dprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Route `log` records to the console at `level` and above.
pub fn init_logger(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::String;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<String>>);

    impl fmt::Write for Shared {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            self.0.lock().map_err(|_| fmt::Error)?.push_str(s);
            Ok(())
        }
    }

    #[test]
    fn macros_write_to_installed_sink() {
        let out = Shared::default();
        set_sink(Box::new(out.clone()));
        crate::dprint!("TIC1={:04X}", 0x1234);
        crate::dprintln!();
        crate::dprintln!("done");
        take_sink();
        crate::dprintln!("dropped");

        assert_eq!(*out.0.lock().unwrap(), "TIC1=1234\ndone\n");
    }
}
