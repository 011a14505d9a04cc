//! Interrupt descriptor table: a fixed 256-entry gate array, populated only
//! at the vectors this kernel actually serves (0, 3, 6, 13, 14, 32, 33).
//!
//! Every other gate is left present-clear, matching the base spec's "all
//! other gates are present-clear (unused)".

pub mod context_switch;
pub mod stubs;

use lazy_static::lazy_static;

use crate::config::{KERNEL_CODE_SELECTOR, KEYBOARD_VECTOR, TIMER_VECTOR};

pub const IDT_ENTRY_COUNT: usize = 256;

/// Present, ring 0, 32-bit interrupt gate.
const GATE_PRESENT_INTERRUPT32: u8 = 0x8E;

/// One 32-bit IDT descriptor (a "gate"). Layout matches the x86 architectural
/// interrupt-gate descriptor exactly; `repr(C, packed)` so Rust never pads it.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct IdtEntry {
    offset_low: u16,
    selector: u16,
    zero: u8,
    type_attr: u8,
    offset_high: u16,
}

impl IdtEntry {
    const fn missing() -> Self {
        IdtEntry {
            offset_low: 0,
            selector: 0,
            zero: 0,
            type_attr: 0,
            offset_high: 0,
        }
    }

    fn set(&mut self, handler: unsafe extern "C" fn(), selector: u16, type_attr: u8) {
        let addr = handler as usize as u32;
        self.offset_low = (addr & 0xFFFF) as u16;
        self.offset_high = (addr >> 16) as u16;
        self.selector = selector;
        self.zero = 0;
        self.type_attr = type_attr;
    }
}

#[repr(C)]
pub struct Idt {
    entries: [IdtEntry; IDT_ENTRY_COUNT],
}

impl Idt {
    fn new() -> Self {
        let mut idt = Idt {
            entries: [IdtEntry::missing(); IDT_ENTRY_COUNT],
        };
        idt.entries[0].set(stubs::isr_divide_error, KERNEL_CODE_SELECTOR, GATE_PRESENT_INTERRUPT32);
        idt.entries[3].set(stubs::isr_breakpoint, KERNEL_CODE_SELECTOR, GATE_PRESENT_INTERRUPT32);
        idt.entries[6].set(stubs::isr_invalid_opcode, KERNEL_CODE_SELECTOR, GATE_PRESENT_INTERRUPT32);
        idt.entries[13].set(stubs::isr_general_protection, KERNEL_CODE_SELECTOR, GATE_PRESENT_INTERRUPT32);
        idt.entries[14].set(stubs::isr_page_fault, KERNEL_CODE_SELECTOR, GATE_PRESENT_INTERRUPT32);
        idt.entries[TIMER_VECTOR as usize].set(stubs::isr_timer, KERNEL_CODE_SELECTOR, GATE_PRESENT_INTERRUPT32);
        idt.entries[KEYBOARD_VECTOR as usize].set(stubs::isr_keyboard, KERNEL_CODE_SELECTOR, GATE_PRESENT_INTERRUPT32);
        idt
    }

    fn load(&'static self) {
        let ptr = x86::dtables::DescriptorTablePointer::new_from_slice(&self.entries);
        unsafe { crate::io::load_idt(&ptr) };
    }
}

lazy_static! {
    static ref IDT: Idt = Idt::new();
}

/// Builds the gate table and loads it with `lidt`. Must run before
/// interrupts are enabled (bring-up step 4).
pub fn init() {
    IDT.load();
    log::info!("idt: loaded, {} gates populated", 7);
}
