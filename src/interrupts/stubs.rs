//! Assembly ISR stubs and the language-level handlers they call into.
//!
//! Exception stubs push a (possibly synthetic) error code and the vector
//! number, then fall into a common `pusha`-based save sequence before
//! calling the Rust handler with a pointer to the saved frame — matching
//! the base spec's "exception trampoline". The timer and keyboard stubs
//! carry no frame; their handlers take no arguments.

use core::arch::naked_asm;

use crate::config::KERNEL_CODE_SELECTOR;

/// Register and vector state saved by an exception stub, read ascending
/// from the post-`pusha` stack pointer. Field order mirrors exactly what
/// `pusha` leaves in memory, followed by the vector/error words this stub
/// pushed, followed by what the CPU itself pushed on interrupt entry.
#[repr(C)]
pub struct ExceptionFrame {
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub esp_dummy: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub vector: u32,
    pub error_code: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
}

/// Default exception handler: log `vec=N err=E` and return. No fault
/// recovery is attempted — vectors 0 and 14 will typically refault
/// immediately on `iret`, which is accepted (see design notes).
extern "C" fn exception_trampoline(frame: *const ExceptionFrame) {
    let frame = unsafe { &*frame };
    log::error!("exception: vec={} err={}", frame.vector, frame.error_code);
}

/// The language-level timer handler (§4.7): EOI, tick increment, and a
/// slice-gated scheduler invocation. May not return if it decides to
/// context-switch away — it resumes here later when this thread is
/// rescheduled.
extern "C" fn timer_entry() {
    crate::sched::on_timer_interrupt();
}

/// The language-level keyboard handler (§4.4).
extern "C" fn keyboard_entry() {
    crate::drivers::keyboard::handle_irq1();
}

macro_rules! exception_stub_with_error_code {
    ($name:ident, $vector:expr) => {
        #[unsafe(naked)]
        pub unsafe extern "C" fn $name() {
            naked_asm!(
                "push {vector}",
                "pusha",
                "push esp",
                "call {trampoline}",
                "add esp, 4",
                "popa",
                "add esp, 8", // discard vector + real error code
                "iretd",
                vector = const $vector,
                trampoline = sym exception_trampoline,
            );
        }
    };
}

macro_rules! exception_stub_no_error_code {
    ($name:ident, $vector:expr) => {
        #[unsafe(naked)]
        pub unsafe extern "C" fn $name() {
            naked_asm!(
                "push 0", // synthetic error code
                "push {vector}",
                "pusha",
                "push esp",
                "call {trampoline}",
                "add esp, 4",
                "popa",
                "add esp, 8", // discard vector + synthetic error code
                "iretd",
                vector = const $vector,
                trampoline = sym exception_trampoline,
            );
        }
    };
}

exception_stub_no_error_code!(isr_divide_error, 0);
exception_stub_no_error_code!(isr_breakpoint, 3);
exception_stub_no_error_code!(isr_invalid_opcode, 6);
exception_stub_with_error_code!(isr_general_protection, 13);
exception_stub_with_error_code!(isr_page_fault, 14);

/// IRQ0, vector 32. Carries no frame: the timer handler needs only to run,
/// not to inspect the interrupted register state.
#[unsafe(naked)]
pub unsafe extern "C" fn isr_timer() {
    naked_asm!(
        "pusha",
        "call {handler}",
        "popa",
        "iretd",
        handler = sym timer_entry,
    );
}

/// IRQ1, vector 33.
#[unsafe(naked)]
pub unsafe extern "C" fn isr_keyboard() {
    naked_asm!(
        "pusha",
        "call {handler}",
        "popa",
        "iretd",
        handler = sym keyboard_entry,
    );
}

#[allow(dead_code)]
const _ASSERT_SELECTOR_IS_CODE: u16 = KERNEL_CODE_SELECTOR;
