//! Low-level hardware primitives: port I/O, interrupt enable/disable, halt,
//! and the scoped critical-section guard built on top of them.

pub mod pio;

pub use pio::{Io, Pio, ReadOnly};

/// Halts the CPU until the next interrupt.
#[inline(always)]
pub fn halt() {
    unsafe { x86::halt() };
}

/// Disables maskable interrupts (`cli`).
///
/// # Safety
/// Leaves the CPU unable to respond to any IRQ until a matching `enable_interrupts`.
/// Prefer `CriticalSection::enter` over calling this directly.
#[inline(always)]
pub unsafe fn disable_interrupts() {
    x86::irq::disable();
}

/// Enables maskable interrupts (`sti`).
///
/// # Safety
/// See `disable_interrupts`.
#[inline(always)]
pub unsafe fn enable_interrupts() {
    x86::irq::enable();
}

/// Loads the interrupt descriptor table register.
///
/// # Safety
/// `ptr` must describe a live, correctly laid out IDT for as long as
/// interrupts remain enabled.
#[inline(always)]
pub unsafe fn load_idt(ptr: &x86::dtables::DescriptorTablePointer<crate::interrupts::IdtEntry>) {
    x86::dtables::lidt(ptr);
}

/// A scoped critical section: disables interrupts on construction, restores
/// the prior interrupt-enable state on drop.
///
/// Every mutation of the ready list, blocked list, or kernel context must
/// happen inside one of these (directly, or because the caller is already
/// running inside an interrupt gate, which clears IF on entry).
pub struct CriticalSection {
    was_enabled: bool,
}

impl CriticalSection {
    /// Enters a critical section, disabling interrupts if they were enabled.
    pub fn enter() -> Self {
        let was_enabled = interrupts_enabled();
        unsafe { disable_interrupts() };
        CriticalSection { was_enabled }
    }
}

impl Drop for CriticalSection {
    fn drop(&mut self) {
        if self.was_enabled {
            unsafe { enable_interrupts() };
        }
    }
}

/// Reads the CPU flags register and reports whether IF is set.
#[inline(always)]
fn interrupts_enabled() -> bool {
    (unsafe { x86::flags::flags() }.bits() & x86::flags::Flags::FLAGS_IF.bits()) != 0
}
