use core::{fmt, fmt::Write, panic::Location};

/// A simple logger that use the architecture's console.
struct Logger {}

impl log::Log for Logger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            _ = writeln!(Console, "{} {}", prefix(record.level()), record.args());
        }
    }

    fn flush(&self) {}
}

/// The console of the architecture, written to directly.
pub struct Console;

impl fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        write(s);
        Ok(())
    }
}

/// The colored marker printed before every message of the given level.
#[must_use]
pub const fn prefix(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "\x1B[1m\x1b[31m[!]\x1b[0m",
        log::Level::Warn => "\x1B[1m\x1b[33m[-]\x1b[0m",
        log::Level::Info => "\x1B[1m\x1b[32m[*]\x1b[0m",
        log::Level::Debug => "\x1B[1m\x1b[34m[#]\x1b[0m",
        log::Level::Trace => "\x1B[1m\x1b[35m[~]\x1b[0m",
    }
}

/// Setup the logging subsystem. All log submitted to the logging subsystem
/// will be ignored until this function is called. Calling it more than once
/// has no effect.
#[cfg(feature = "logging")]
pub fn setup() {
    if log::set_logger(&Logger {}).is_ok() {
        log::set_max_level(log::LevelFilter::Info);
        log::trace!("Logger initialized");
    }
}

/// Write a message to the console, bypassing the logger. This is used by
/// the logger itself and by code that must print something even when the
/// logger is not set up (early boot, panics).
pub fn write(message: &str) {
    crate::arch::target::log::write(message);
}

/// Report a kernel panic straight on the console. It does not go through
/// the logger, so it is printed even when the `logging` feature is disabled
/// or the logger is not set up yet.
pub fn report_panic(location: Option<&Location<'_>>, message: &dyn fmt::Display) {
    let marker = prefix(log::Level::Error);
    _ = match location {
        Some(location) => writeln!(
            Console,
            "{marker} Kernel panic at {}:{}: {message}",
            location.file(),
            location.line()
        ),
        None => writeln!(Console, "{marker} Kernel panic: {message}"),
    };
}
