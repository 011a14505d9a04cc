//! Compile-time configuration constants.
//!
//! The kernel has no argv and no environment; every tunable lives here as a
//! `const` rather than behind a flag or an env var.

/// Maximum number of threads the static TCB array can hold.
pub const MAX_THREADS: usize = 5;

/// Per-thread stack size, in 32-bit machine words (≈ 4 KiB).
pub const STACK_WORDS: usize = 1024;

/// Ticks the running thread holds the CPU before the timer handler
/// reconsiders scheduling (≈ 100 ms at the default PIT rate).
pub const DEFAULT_SLICE_TICKS: u32 = 10;

/// Default PIT channel 0 frequency, in Hz.
pub const DEFAULT_PIT_HZ: u32 = 100;

/// PIT base oscillator frequency, in Hz.
pub const PIT_BASE_HZ: u32 = 1_193_182;

/// Capacity of the keyboard scan-code ring buffer.
pub const KEYBOARD_RING_CAPACITY: usize = 256;

/// Kernel code segment selector, as set up by the boot stub.
pub const KERNEL_CODE_SELECTOR: u16 = 0x08;

/// Kernel data segment selector, as set up by the boot stub.
pub const KERNEL_DATA_SELECTOR: u16 = 0x10;

/// Master PIC vector offset (IRQ0 -> this vector).
pub const PIC_1_OFFSET: u8 = 0x20;

/// Slave PIC vector offset (IRQ8 -> this vector).
pub const PIC_2_OFFSET: u8 = 0x28;

/// Timer interrupt vector (IRQ0).
pub const TIMER_VECTOR: u8 = PIC_1_OFFSET;

/// Keyboard interrupt vector (IRQ1).
pub const KEYBOARD_VECTOR: u8 = PIC_1_OFFSET + 1;

/// COM1 serial base I/O port.
pub const COM1_BASE: u16 = 0x3F8;
