//! Multiboot-1 entry stub (§1.1, §6). Outside the core budget: its only
//! job is to satisfy a multiboot-compliant loader's contract and hand
//! control to the Rust entry point with a flat stack, interrupts already
//! off, and segments already valid — exactly what `kernel_main` assumes.

use core::arch::global_asm;

const MULTIBOOT_MAGIC: u32 = 0x1BAD_B002;
const MULTIBOOT_FLAGS: u32 = 0x0000_0003; // align modules, provide memory map
const BOOT_STACK_BYTES: usize = 16 * 1024;

#[repr(align(16))]
struct BootStack([u8; BOOT_STACK_BYTES]);

static mut BOOT_STACK: BootStack = BootStack([0; BOOT_STACK_BYTES]);

global_asm!(
    ".section .multiboot_header, \"a\"",
    ".align 4",
    ".long {magic}",
    ".long {flags}",
    ".long -({magic} + {flags})", // checksum
    ".section .text",
    ".global _start",
    "_start:",
    "lea esp, [{stack} + {stack_bytes}]",
    "push 0",
    "popfd", // clear EFLAGS, including IF, before anything else can run
    "call {kernel_main}",
    "2:",
    "hlt",
    "jmp 2b",
    magic = const MULTIBOOT_MAGIC,
    flags = const MULTIBOOT_FLAGS,
    stack = sym BOOT_STACK,
    stack_bytes = const BOOT_STACK_BYTES,
    kernel_main = sym crate::kernel_main,
);
