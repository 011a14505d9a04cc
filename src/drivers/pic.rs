//! 8259 PIC driver: thin logged wrapper around the `pic8259` crate's
//! `ChainedPics`, which already performs the mask-preserving remap
//! sequence this kernel's contract requires (§4.2).

use pic8259::ChainedPics;
use spin::Mutex;

use crate::config::{KEYBOARD_VECTOR, PIC_1_OFFSET, PIC_2_OFFSET, TIMER_VECTOR};

/// Only IRQ0 (timer) and IRQ1 (keyboard) are ever unmasked; every other
/// line stays disabled for the life of the kernel.
const MASK_TIMER_KEYBOARD_ONLY: u8 = 0b1111_1100;
const MASK_ALL_DISABLED: u8 = 0xFF;

static PICS: Mutex<ChainedPics> =
    Mutex::new(unsafe { ChainedPics::new(PIC_1_OFFSET, PIC_2_OFFSET) });

/// Remaps both controllers and masks everything but the timer and
/// keyboard lines. Must run before interrupts are enabled (bring-up step).
///
/// # Safety
/// Must be called exactly once, with interrupts disabled, before any IRQ
/// this kernel serves can legally fire.
pub unsafe fn init() {
    let mut pics = PICS.lock();
    pics.initialize();
    pics.write_masks(MASK_TIMER_KEYBOARD_ONLY, MASK_ALL_DISABLED);
    log::info!(
        "pic: remapped to {:#04x}/{:#04x}, masks={:#010b}/{:#010b}",
        PIC_1_OFFSET,
        PIC_2_OFFSET,
        MASK_TIMER_KEYBOARD_ONLY,
        MASK_ALL_DISABLED
    );
}

/// Issues end-of-interrupt for the vector that was just serviced.
/// Only ever called with `TIMER_VECTOR` or `KEYBOARD_VECTOR`, both on the
/// master controller, but routed through `ChainedPics` so a future slave
/// IRQ would be handled correctly too.
pub fn end_of_interrupt(vector: u8) {
    debug_assert!(vector == TIMER_VECTOR || vector == KEYBOARD_VECTOR);
    unsafe { PICS.lock().notify_end_of_interrupt(vector) };
}
