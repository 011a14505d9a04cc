//! `print!`/`println!` on top of the COM1 writer, for the handful of call
//! sites (the boot banner) that want unconditional output rather than a
//! leveled log line.

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ({
        use core::fmt::Write;
        // See `logger::SerialLogger::log` for why `COM1` is only ever
        // locked under a `CriticalSection`.
        let _cs = $crate::io::CriticalSection::enter();
        let _ = write!($crate::drivers::serial::COM1.lock(), $($arg)*);
    });
}

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($fmt:expr) => ($crate::print!(concat!($fmt, "\n")));
    ($fmt:expr, $($arg:tt)*) => ($crate::print!(concat!($fmt, "\n"), $($arg)*));
}
