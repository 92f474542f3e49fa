//! A logging implementation which forwards formatted records to a host provided write function
use core::fmt;
use core::fmt::Write;

use log::{Level, Log, Metadata, Record, SetLoggerError};

/// The sink a [`KernelLogger`] writes its formatted records to.
pub type WriteFn = fn(fmt::Arguments);

pub struct KernelLogger {
    pub initial_log_level: Level,
    write: WriteFn,
}

impl KernelLogger {
    pub const fn new(max_log_level: Level, write: WriteFn) -> KernelLogger {
        KernelLogger {
            initial_log_level: max_log_level,
            write,
        }
    }

    pub fn install(&'static self) -> Result<(), SetLoggerError> {
        log::set_logger(self).map(|_| log::set_max_level(self.initial_log_level.to_level_filter()))
    }

    /// Change the global maximum level.
    ///
    /// Records above `initial_log_level` stay filtered by the logger itself, so this can only lower verbosity.
    pub fn update_log_level(&self, level: Level) {
        log::set_max_level(level.min(self.initial_log_level).to_level_filter());
    }
}

/// Format a single record the way [`KernelLogger`] prints it.
pub fn format_record(w: &mut impl Write, record: &Record) -> fmt::Result {
    let level_moji = match record.level() {
        Level::Error => "❌",
        Level::Warn => "⚠️",
        Level::Info => "ℹ️",
        Level::Debug => "🛠️",
        Level::Trace => "👣",
    };
    w.write_fmt(format_args!(
        "{}  {}: {}\n",
        level_moji,
        record.target(),
        record.args(),
    ))
}

/// Adapter that turns [`fmt::Write`] calls into calls of a [`WriteFn`]
struct FnWriter(WriteFn);

impl Write for FnWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        (self.0)(format_args!("{}", s));
        Ok(())
    }
}

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.initial_log_level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            // FnWriter never fails
            let _ = format_record(&mut FnWriter(self.write), record);
        }
    }

    fn flush(&self) {}
}
