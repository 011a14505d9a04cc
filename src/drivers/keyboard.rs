//! PS/2 keyboard driver: IRQ1 handler, scan-code translation, the
//! producer/consumer ring, and the blocking read APIs built on top of it
//! (§4.4).
//!
//! The translation tables and the shift-tracking algorithm are hand
//! rolled rather than pulled from a general keymap crate: the two fixed
//! 58-entry US-layout tables below are the exact contract callers depend
//! on, and a general keymap state machine would not reproduce it.

use spin::Mutex;

use crate::config::{KEYBOARD_RING_CAPACITY, KEYBOARD_VECTOR};
use crate::io::{CriticalSection, Io, Pio};
use crate::sched::BlockReason;

const DATA_PORT: u16 = 0x60;
const STATUS_PORT: u16 = 0x64;
const STATUS_OUTPUT_FULL: u8 = 0x01;
const RELEASE_MASK: u8 = 0x80;
const SCANCODE_LEFT_SHIFT: u8 = 0x2A;
const SCANCODE_RIGHT_SHIFT: u8 = 0x36;

/// Unshifted US-layout scan-code to ASCII table, indices 0..=57.
const SCANCODE_TO_ASCII: [u8; 58] = [
    0, 27, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', 8, 9, b'q',
    b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', 10, 0, b'a', b's', b'd',
    b'f', b'g', b'h', b'j', b'k', b'l', b';', 39, b'`', 0, 92, b'z', b'x', b'c', b'v', b'b', b'n',
    b'm', b',', b'.', b'/', 0, b'*', 0, b' ',
];

/// Shift-held variant of the same table.
const SCANCODE_TO_ASCII_SHIFT: [u8; 58] = [
    0, 27, b'!', b'@', b'#', b'$', b'%', b'^', b'&', b'*', b'(', b')', b'_', b'+', 8, 9, b'Q',
    b'W', b'E', b'R', b'T', b'Y', b'U', b'I', b'O', b'P', b'{', b'}', 10, 0, b'A', b'S', b'D',
    b'F', b'G', b'H', b'J', b'K', b'L', b':', 34, b'~', 0, b'|', b'Z', b'X', b'C', b'V', b'B',
    b'N', b'M', b'<', b'>', b'?', 0, b'*', 0, b' ',
];

struct Ring {
    buf: [u8; KEYBOARD_RING_CAPACITY],
    head: usize,
    tail: usize,
}

impl Ring {
    const fn new() -> Self {
        Ring {
            buf: [0; KEYBOARD_RING_CAPACITY],
            head: 0,
            tail: 0,
        }
    }

    fn push(&mut self, byte: u8) {
        let next = (self.head + 1) % KEYBOARD_RING_CAPACITY;
        if next == self.tail {
            log::warn!("keyboard: ring buffer full, dropping byte {:#04x}", byte);
            return;
        }
        self.buf[self.head] = byte;
        self.head = next;
    }

    fn pop(&mut self) -> Option<u8> {
        if self.head == self.tail {
            return None;
        }
        let byte = self.buf[self.tail];
        self.tail = (self.tail + 1) % KEYBOARD_RING_CAPACITY;
        Some(byte)
    }
}

static RING: Mutex<Ring> = Mutex::new(Ring::new());
static SHIFT_PRESSED: Mutex<bool> = Mutex::new(false);

/// Drains any scan code left sitting in the PS/2 output buffer from before
/// this kernel took over (bring-up step 5). `RING`/`SHIFT_PRESSED` start
/// zeroed by construction, so there is nothing else to reset here; this
/// exists purely to discard stale hardware state before IRQ1 is unmasked.
pub fn init() {
    for _ in 0..16 {
        if Pio::<u8>::new(STATUS_PORT).read() & STATUS_OUTPUT_FULL == 0 {
            break;
        }
        let _ = Pio::<u8>::new(DATA_PORT).read();
    }
}

/// IRQ1 handler (§4.4 steps 1-7). Called from the naked ISR stub with
/// interrupts disabled.
pub fn handle_irq1() {
    crate::drivers::pic::end_of_interrupt(KEYBOARD_VECTOR);

    let status = Pio::<u8>::new(STATUS_PORT).read();
    if status & STATUS_OUTPUT_FULL == 0 {
        return;
    }

    let scancode = Pio::<u8>::new(DATA_PORT).read();

    if scancode & RELEASE_MASK != 0 {
        let key = scancode & 0x7F;
        if key == SCANCODE_LEFT_SHIFT || key == SCANCODE_RIGHT_SHIFT {
            *SHIFT_PRESSED.lock() = false;
        }
        return;
    }

    if scancode == SCANCODE_LEFT_SHIFT || scancode == SCANCODE_RIGHT_SHIFT {
        *SHIFT_PRESSED.lock() = true;
        return;
    }

    let shifted = *SHIFT_PRESSED.lock();
    let table = if shifted { &SCANCODE_TO_ASCII_SHIFT } else { &SCANCODE_TO_ASCII };
    let ascii = match table.get(scancode as usize) {
        Some(&0) | None => return,
        Some(&byte) => byte,
    };

    RING.lock().push(ascii);
    crate::sched::wake_keyboard_waiters();
}

/// Blocks the calling thread until a byte is available, then returns it.
/// Every `RING` access here runs under a `CriticalSection`: `handle_irq1`
/// locks the same spinlock from ISR context without disabling interrupts
/// first (it doesn't need to — hardware already cleared IF on entry), so a
/// thread-context caller that held the lock across an IRQ1 would leave the
/// ISR spinning on a lock its holder can never resume to release. The
/// empty-check and the block call additionally share one `CriticalSection`
/// so IRQ1 cannot slip a byte in between them and leave the thread blocked
/// on data that already arrived.
pub fn getchar_blocking() -> u8 {
    loop {
        let _cs = CriticalSection::enter();
        if let Some(byte) = RING.lock().pop() {
            return byte;
        }
        crate::sched::block_current_thread(BlockReason::Keyboard, 0);
        drop(_cs);
        crate::sched::schedule();
    }
}

/// Reads a line into `buffer`, stopping at CR/LF or when `buffer.len() - 1`
/// bytes have been accepted. Accepts printable ASCII 32..=126, handles
/// backspace (byte 8) by stepping the write position back, and
/// null-terminates the result. Returns the number of bytes written,
/// excluding the terminator.
pub fn read_line(buffer: &mut [u8]) -> usize {
    if buffer.len() <= 1 {
        return 0;
    }
    let max = buffer.len() - 1;
    let mut pos = 0usize;

    loop {
        let c = getchar_blocking();
        match c {
            10 | 13 => break,
            8 if pos > 0 => {
                pos -= 1;
                log::info!("keyboard: backspace");
            }
            32..=126 if pos < max => {
                buffer[pos] = c;
                pos += 1;
            }
            _ => {}
        }
    }

    buffer[pos] = 0;
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_push_pop_is_fifo() {
        let mut ring = Ring::new();
        ring.push(b'a');
        ring.push(b'b');
        assert_eq!(ring.pop(), Some(b'a'));
        assert_eq!(ring.pop(), Some(b'b'));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn ring_drops_on_full() {
        let mut ring = Ring::new();
        for _ in 0..KEYBOARD_RING_CAPACITY + 10 {
            ring.push(b'x');
        }
        // Capacity is usable slots = CAPACITY - 1 under this head/tail scheme.
        let mut count = 0;
        while ring.pop().is_some() {
            count += 1;
        }
        assert_eq!(count, KEYBOARD_RING_CAPACITY - 1);
    }

    #[test]
    fn scancode_tables_translate_known_keys() {
        assert_eq!(SCANCODE_TO_ASCII[30], b'a');
        assert_eq!(SCANCODE_TO_ASCII_SHIFT[30], b'A');
        assert_eq!(SCANCODE_TO_ASCII[2], b'1');
        assert_eq!(SCANCODE_TO_ASCII_SHIFT[2], b'!');
    }

    #[test]
    fn unmapped_high_scancode_has_no_entry() {
        assert_eq!(SCANCODE_TO_ASCII.get(100), None);
    }
}
