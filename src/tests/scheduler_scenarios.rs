//! Demo thread bodies matching the base spec's end-to-end scenarios
//! (S1-S6). These are not unit tests in the usual sense — running the
//! real scheduler end to end needs the naked context-switch routine and
//! real hardware timer IRQs, neither available on the host test target
//! (see the ambient-stack test-tooling note). They are kept here so the
//! shapes exist and are reviewable; verifying S1-S6 themselves is a
//! task for emulation, not `cargo test`.

use crate::sched::{self, BlockReason};

/// S1: a periodic thread that sleeps `period` ticks and bumps its own
/// work counter each time it wakes.
pub extern "C" fn periodic_counter_5() -> ! {
    loop {
        sched::sleep(5);
        bump_current_counter();
    }
}

pub extern "C" fn periodic_counter_10() -> ! {
    loop {
        sched::sleep(10);
        bump_current_counter();
    }
}

fn bump_current_counter() {
    sched::with_current_thread(|tcb| {
        *tcb.counter += 1;
    });
}

/// S2/S6: halts forever. Created whenever there is otherwise no runnable
/// work.
pub extern "C" fn idle() -> ! {
    loop {
        crate::io::halt();
    }
}

/// S3: blocks on keyboard input forever, discarding what it reads. Used
/// opposite a busy counter thread to demonstrate keyboard wake does not
/// disturb unrelated ready threads.
pub extern "C" fn keyboard_reader() -> ! {
    loop {
        let _byte = crate::drivers::keyboard::getchar_blocking();
        bump_current_counter();
    }
}

pub extern "C" fn busy_counter() -> ! {
    loop {
        bump_current_counter();
        sched::sleep(1);
    }
}

/// S5: deliberately traps so the exception trampoline has something to
/// log, then continues — matching the spec's "the faulting thread resumes
/// immediately after the `int 3`".
pub extern "C" fn breakpoint_prober() -> ! {
    loop {
        unsafe { core::arch::asm!("int3") };
        bump_current_counter();
        sched::sleep(50);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Not an end-to-end check (see module docs) — just confirms these
    /// fixture functions have the signature `create_thread` expects, so
    /// they stay usable as scenario fixtures if `sched::create_thread`'s
    /// signature ever changes.
    #[test]
    fn fixture_signatures_match_entry_point_type() {
        let _: extern "C" fn() -> ! = periodic_counter_5;
        let _: extern "C" fn() -> ! = periodic_counter_10;
        let _: extern "C" fn() -> ! = idle;
        let _: extern "C" fn() -> ! = keyboard_reader;
        let _: extern "C" fn() -> ! = busy_counter;
        let _: extern "C" fn() -> ! = breakpoint_prober;
    }

    #[test]
    fn block_reason_variants_used_by_fixtures_exist() {
        let _ = BlockReason::Timer;
        let _ = BlockReason::Keyboard;
    }
}
