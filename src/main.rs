//! Kernel entry point and bring-up sequence (§4.8).
//!
//! `#[cfg(test)]` builds compile as an ordinary host binary (via
//! `libtest`) so the colocated unit tests across `sched`, `drivers`, and
//! `io` can run on the host target; only non-test builds are freestanding.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test), no_main)]

#[cfg(not(test))]
extern crate rlibc;

#[cfg(not(test))]
mod boot;

pub mod config;
pub mod drivers;
pub mod error;
pub mod interrupts;
pub mod io;
#[macro_use]
pub mod macros;
pub mod logger;
pub mod sched;

#[cfg(test)]
mod tests;

use config::{DEFAULT_PIT_HZ, KEYBOARD_RING_CAPACITY};

/// The idle thread: the only thread this kernel creates as real payload.
/// Application workloads are integration-test fixtures (§1.2); this
/// binary's job is to demonstrate the kernel stays alive and responsive,
/// not to run a demo.
extern "C" fn idle_thread() -> ! {
    loop {
        io::halt();
    }
}

/// Runs the required bring-up order. Does not return: the final step
/// hands control to the scheduler, which never comes back here.
#[unsafe(no_mangle)]
pub extern "C" fn kernel_main() -> ! {
    drivers::serial::init();
    logger::init();

    drivers::vga::clear();
    drivers::vga::write_row(0, "rrkernel: bring-up");
    println!("rrkernel: bring-up starting");

    // Kernel context itself is lazily constructed on first touch by
    // `sched::KERNEL`; nothing to do for step 3 beyond that.

    interrupts::init();
    unsafe { drivers::pic::init() };
    drivers::pit::program(DEFAULT_PIT_HZ);

    drivers::keyboard::init();
    log::info!("keyboard: ring capacity {}", KEYBOARD_RING_CAPACITY);

    unsafe { io::enable_interrupts() };

    match sched::create_thread(idle_thread, 1, 0, drivers::vga::height()) {
        Ok(id) => log::info!("idle thread created, id={}", id),
        Err(e) => log::error!("failed to create idle thread: {}", e),
    }

    sched::schedule();

    // `schedule()` only returns here if the ready list was empty, which
    // cannot happen once the idle thread exists. Parking here is the
    // correct fallback if it somehow does.
    loop {
        io::halt();
    }
}

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    unsafe { io::disable_interrupts() };
    log::error!("panic: {}", info);
    loop {
        io::halt();
    }
}
