//! `log::Log` implementor backed by the COM1 serial writer.
//!
//! Every component that the base spec describes as "logging" something
//! (PIC mask readback, PIT divisor, thread-creation failures, exception
//! vectors, keyboard ring overflow, scheduler milestones) goes through
//! `log::info!`/`log::warn!`/`log::error!`, which end up here.

use core::fmt::Write;

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::drivers::serial::COM1;
use crate::io::CriticalSection;

struct SerialLogger;

impl Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    /// Wrapped in a `CriticalSection`: both ISRs (keyboard ring overflow,
    /// exception vectors) and thread context log through here onto the
    /// same `COM1` spinlock. Without disabling interrupts first, a thread
    /// holding the lock when an IRQ fires would leave that IRQ's own log
    /// call spinning on a lock its holder can never resume to release.
    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _cs = CriticalSection::enter();
        let mut serial = COM1.lock();
        let _ = writeln!(serial, "[{:>5} {}] {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: SerialLogger = SerialLogger;

/// Installs the logger. Must run after `drivers::serial::init()` and
/// before anything calls `log::info!`/etc.
pub fn init() {
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(LevelFilter::Info))
        .expect("logger already initialized");
}
