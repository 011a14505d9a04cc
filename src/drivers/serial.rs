//! 16550 UART driver for the COM1 debug channel (port 0x3F8). This is the
//! kernel's only output path until (and after) VGA text mode is up; the
//! logger and the `print!` family both write through it.

use bitflags::bitflags;

use crate::config::COM1_BASE;
use crate::io::{Io, Pio, ReadOnly};

bitflags! {
    struct LineStsFlags: u8 {
        const INPUT_FULL = 1;
        const OUTPUT_EMPTY = 1 << 5;
    }
}

pub struct SerialPort {
    data: Pio<u8>,
    int_en: Pio<u8>,
    fifo_ctrl: Pio<u8>,
    line_ctrl: Pio<u8>,
    modem_ctrl: Pio<u8>,
    line_sts: ReadOnly<Pio<u8>>,
}

impl SerialPort {
    pub const fn new(base: u16) -> Self {
        SerialPort {
            data: Pio::new(base),
            int_en: Pio::new(base + 1),
            fifo_ctrl: Pio::new(base + 2),
            line_ctrl: Pio::new(base + 3),
            modem_ctrl: Pio::new(base + 4),
            line_sts: ReadOnly::new(Pio::new(base + 5)),
        }
    }

    pub fn init(&mut self) {
        self.int_en.write(0x00);
        self.line_ctrl.write(0x80);
        self.data.write(0x01);
        self.int_en.write(0x00);
        self.line_ctrl.write(0x03);
        self.fifo_ctrl.write(0xC7);
        self.modem_ctrl.write(0x0B);
        self.int_en.write(0x01);
    }

    fn line_sts(&self) -> LineStsFlags {
        LineStsFlags::from_bits_truncate(self.line_sts.read())
    }

    fn send(&mut self, byte: u8) {
        while !self.line_sts().contains(LineStsFlags::OUTPUT_EMPTY) {}
        self.data.write(byte);
    }

    pub fn write_byte(&mut self, byte: u8) {
        match byte {
            8 | 0x7F => {
                self.send(8);
                self.send(b' ');
                self.send(8);
            }
            b'\n' => {
                self.send(b'\r');
                self.send(b'\n');
            }
            _ => self.send(byte),
        }
    }
}

impl core::fmt::Write for SerialPort {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
        Ok(())
    }
}

use lazy_static::lazy_static;
use spin::Mutex;

lazy_static! {
    pub static ref COM1: Mutex<SerialPort> = Mutex::new(SerialPort::new(COM1_BASE));
}

/// Initializes COM1. Safe to call before the IDT is loaded: this is
/// polled I/O, no IRQ involved.
pub fn init() {
    COM1.lock().init();
}
