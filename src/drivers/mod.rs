//! Hardware drivers: PIC, PIT, keyboard, serial, VGA text mode.

pub mod keyboard;
pub mod pic;
pub mod pit;
pub mod serial;
pub mod vga;
