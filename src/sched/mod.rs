//! The preemptive thread kernel: TCB array, ready/blocked index-lists,
//! round-robin scheduler, timer-driven preemption, sleep/block primitives.
//!
//! This is the core the rest of the kernel exists to serve. Everything here
//! is a single owned `KernelContext` behind one lock; every interrupt
//! handler and every thread-context caller reaches it through that one
//! path, never through scattered statics (§9).

pub mod thread;

use lazy_static::lazy_static;
use spin::Mutex;

use crate::config::{DEFAULT_SLICE_TICKS, MAX_THREADS};
use crate::error::{KernelError, KernelResult};
use crate::interrupts::context_switch::{build_initial_frame, context_switch, initial_context_switch};
use crate::io::CriticalSection;

pub use thread::{BlockReason, ThreadState};
use thread::Tcb;

/// Index into the static TCB array. `MAX_THREADS` is tiny, so a byte fits.
pub type ThreadIndex = u8;

struct KernelContext {
    threads: [Tcb; MAX_THREADS],
    thread_count: usize,
    current: Option<ThreadIndex>,
    ready_head: Option<ThreadIndex>,
    blocked_head: Option<ThreadIndex>,
    system_ticks: u32,
    last_slice_tick: u32,
    reentrancy: u32,
}

impl KernelContext {
    const fn new() -> Self {
        KernelContext {
            threads: [Tcb::EMPTY; MAX_THREADS],
            thread_count: 0,
            current: None,
            ready_head: None,
            blocked_head: None,
            system_ticks: 0,
            last_slice_tick: 0,
            reentrancy: 0,
        }
    }

    /// Appends `idx` to the tail of the circular ready list.
    fn ready_push_back(&mut self, idx: ThreadIndex) {
        match self.ready_head {
            None => {
                self.threads[idx as usize].next_ready = Some(idx);
                self.ready_head = Some(idx);
            }
            Some(head) => {
                let tail = self.ready_tail(head);
                self.threads[tail as usize].next_ready = Some(idx);
                self.threads[idx as usize].next_ready = Some(head);
            }
        }
    }

    fn ready_tail(&self, head: ThreadIndex) -> ThreadIndex {
        let mut cur = head;
        for _ in 0..MAX_THREADS {
            let next = self.threads[cur as usize].next_ready.unwrap_or(head);
            if next == head {
                return cur;
            }
            cur = next;
        }
        cur
    }

    /// Removes `idx` from the circular ready list, wherever it sits.
    fn ready_remove(&mut self, idx: ThreadIndex) {
        let Some(head) = self.ready_head else { return };
        if head == idx {
            let next = self.threads[idx as usize].next_ready.unwrap_or(idx);
            if next == idx {
                self.ready_head = None;
            } else {
                let tail = self.ready_tail(head);
                self.threads[tail as usize].next_ready = Some(next);
                self.ready_head = Some(next);
            }
            self.threads[idx as usize].next_ready = None;
            return;
        }
        let mut cur = head;
        for _ in 0..MAX_THREADS {
            let next = self.threads[cur as usize].next_ready.unwrap_or(head);
            if next == idx {
                let after = self.threads[idx as usize].next_ready.unwrap_or(head);
                self.threads[cur as usize].next_ready = Some(after);
                self.threads[idx as usize].next_ready = None;
                return;
            }
            cur = next;
            if cur == head {
                break;
            }
        }
    }

    /// Inserts into the blocked list: ascending `wake_up_tick` for TIMER
    /// blocks, FIFO-at-tail for everything else (KEYBOARD).
    fn blocked_insert(&mut self, idx: ThreadIndex) {
        let reason = self.threads[idx as usize].block_reason;
        self.threads[idx as usize].next_blocked = None;

        if reason != BlockReason::Timer {
            // FIFO append.
            match self.blocked_head {
                None => self.blocked_head = Some(idx),
                Some(head) => {
                    let mut cur = head;
                    loop {
                        match self.threads[cur as usize].next_blocked {
                            Some(next) => cur = next,
                            None => break,
                        }
                    }
                    self.threads[cur as usize].next_blocked = Some(idx);
                }
            }
            return;
        }

        let wake = self.threads[idx as usize].wake_up_tick;
        match self.blocked_head {
            None => self.blocked_head = Some(idx),
            Some(head) => {
                if self.threads[head as usize].block_reason == BlockReason::Timer
                    && self.threads[head as usize].wake_up_tick > wake
                {
                    self.threads[idx as usize].next_blocked = Some(head);
                    self.blocked_head = Some(idx);
                    return;
                }
                let mut cur = head;
                loop {
                    match self.threads[cur as usize].next_blocked {
                        Some(next)
                            if self.threads[next as usize].block_reason != BlockReason::Timer
                                || self.threads[next as usize].wake_up_tick <= wake =>
                        {
                            cur = next;
                        }
                        other => {
                            self.threads[idx as usize].next_blocked = other;
                            self.threads[cur as usize].next_blocked = Some(idx);
                            return;
                        }
                    }
                }
            }
        }
    }

    fn blocked_remove(&mut self, idx: ThreadIndex) {
        let Some(head) = self.blocked_head else { return };
        if head == idx {
            self.blocked_head = self.threads[idx as usize].next_blocked;
            self.threads[idx as usize].next_blocked = None;
            return;
        }
        let mut cur = head;
        loop {
            match self.threads[cur as usize].next_blocked {
                Some(next) if next == idx => {
                    self.threads[cur as usize].next_blocked = self.threads[idx as usize].next_blocked;
                    self.threads[idx as usize].next_blocked = None;
                    return;
                }
                Some(next) => cur = next,
                None => return,
            }
        }
    }

    /// Invariant check for `create_thread` (§7's `InvalidState`): walks the
    /// ready list looking for the head within `MAX_THREADS` steps. A link
    /// that never closes the loop means `next_ready` escaped the circular
    /// list, which should be structurally impossible but is checked before
    /// every insertion rather than assumed.
    fn ready_list_is_sane(&self) -> bool {
        let Some(head) = self.ready_head else { return true };
        let mut cur = head;
        for _ in 0..MAX_THREADS {
            match self.threads[cur as usize].next_ready {
                Some(next) if next == head => return true,
                Some(next) => cur = next,
                None => return false,
            }
        }
        false
    }

    /// Walks the blocked list, moving every entry matching `reason` (and,
    /// for TIMER, whose deadline has elapsed under the signed-difference
    /// wrap-safe compare — see design notes) back to the ready list.
    fn wake_matching(&mut self, reason: BlockReason, now: u32) {
        let mut cur = self.blocked_head;
        let mut woken = heapless::Vec::<ThreadIndex, MAX_THREADS>::new();
        while let Some(idx) = cur {
            cur = self.threads[idx as usize].next_blocked;
            let matches = match reason {
                BlockReason::Timer => {
                    self.threads[idx as usize].block_reason == BlockReason::Timer
                        && tick_due(now, self.threads[idx as usize].wake_up_tick)
                }
                _ => self.threads[idx as usize].block_reason == reason,
            };
            if matches {
                let _ = woken.push(idx);
            }
        }
        for idx in woken {
            self.blocked_remove(idx);
            self.threads[idx as usize].state = ThreadState::Ready;
            self.threads[idx as usize].block_reason = BlockReason::None;
            self.ready_push_back(idx);
        }
    }

    /// Core logic behind the public `create_thread` (§4.6). Split out so
    /// it can be driven directly against a local context in tests without
    /// touching the global `KERNEL` singleton or a `CriticalSection`.
    fn create_thread(
        &mut self,
        entry_point: extern "C" fn() -> !,
        delay_ticks: u32,
        display_row: u8,
        screen_height: u8,
    ) -> KernelResult<ThreadIndex> {
        if display_row >= screen_height {
            return Err(KernelError::InvalidParameter);
        }

        if self.thread_count >= MAX_THREADS {
            log::error!("thread creation: array full ({} threads)", MAX_THREADS);
            return Err(KernelError::OutOfMemory);
        }

        if !self.ready_list_is_sane() {
            log::error!("thread creation: ready list corrupt");
            return Err(KernelError::InvalidState);
        }

        let idx = self.thread_count as ThreadIndex;
        self.thread_count += 1;

        let delay_ticks = delay_ticks.max(1);
        let esp = build_initial_frame(&mut self.threads[idx as usize].stack, entry_point);

        let tcb = &mut self.threads[idx as usize];
        tcb.esp = esp;
        tcb.state = ThreadState::Ready;
        tcb.block_reason = BlockReason::None;
        tcb.counter = 0;
        tcb.delay_ticks = delay_ticks;
        tcb.last_tick = 0;
        tcb.wake_up_tick = 0;
        tcb.display_row = display_row;
        tcb.next_blocked = None;

        self.ready_push_back(idx);

        log::info!("thread {} created, row={} delay={}", idx, display_row, delay_ticks);
        Ok(idx)
    }
}

/// Signed-difference, wrap-safe deadline check (design notes, open
/// question #1): `now - deadline >= 0` computed in wrapping 32-bit
/// arithmetic and reinterpreted as signed.
fn tick_due(now: u32, deadline: u32) -> bool {
    (now.wrapping_sub(deadline) as i32) >= 0
}

lazy_static! {
    static ref KERNEL: Mutex<KernelContext> = Mutex::new(KernelContext::new());
}

/// What the scheduler decided to do, computed while holding the lock and
/// executed after releasing it — `context_switch` must never be called
/// with the lock held (see module docs).
enum SchedAction {
    None,
    Initial { new_esp: u32 },
    Switch { old_esp_out: *mut u32, new_esp: u32 },
}

/// Creates a thread during bring-up (§4.6). Not valid after the scheduler
/// has been handed control. A thin `CriticalSection` + lock wrapper around
/// `KernelContext::create_thread`, which holds the actual logic so it can
/// be exercised directly against a local context in tests, the way the
/// rest of this file's invariants are tested.
pub fn create_thread(
    entry_point: extern "C" fn() -> !,
    delay_ticks: u32,
    display_row: u8,
    screen_height: u8,
) -> KernelResult<ThreadIndex> {
    let _cs = CriticalSection::enter();
    let mut ctx = KERNEL.lock();
    ctx.create_thread(entry_point, delay_ticks, display_row, screen_height)
}

/// The scheduler (§4.7): one invocation. Computes the decision under the
/// lock, then performs the actual context switch (if any) after releasing
/// it. Never called with the lock already held by the caller.
pub fn schedule() {
    let action = {
        let _cs = CriticalSection::enter();
        let mut ctx = KERNEL.lock();

        if ctx.reentrancy > 0 {
            return;
        }
        ctx.reentrancy += 1;

        let now = ctx.system_ticks;
        ctx.wake_matching(BlockReason::Timer, now);

        let action = if ctx.ready_head.is_none() {
            SchedAction::None
        } else if ctx.current.is_none() {
            let next = ctx.ready_head.unwrap();
            ctx.threads[next as usize].state = ThreadState::Running;
            ctx.current = Some(next);
            SchedAction::Initial {
                new_esp: ctx.threads[next as usize].esp,
            }
        } else {
            let current = ctx.current.unwrap();
            if ctx.threads[current as usize].state == ThreadState::Blocked {
                let next = ctx.ready_head.unwrap();
                ctx.threads[next as usize].state = ThreadState::Running;
                ctx.current = Some(next);
                let old_esp_out = &mut ctx.threads[current as usize].esp as *mut u32;
                SchedAction::Switch {
                    old_esp_out,
                    new_esp: ctx.threads[next as usize].esp,
                }
            } else {
                match find_next_ready(&ctx, current) {
                    Some(next) if next != current => {
                        ctx.threads[current as usize].state = ThreadState::Ready;
                        ctx.threads[next as usize].state = ThreadState::Running;
                        ctx.current = Some(next);
                        let old_esp_out = &mut ctx.threads[current as usize].esp as *mut u32;
                        SchedAction::Switch {
                            old_esp_out,
                            new_esp: ctx.threads[next as usize].esp,
                        }
                    }
                    _ => SchedAction::None,
                }
            }
        };

        ctx.reentrancy -= 1;
        action
    };

    match action {
        SchedAction::None => {}
        SchedAction::Initial { new_esp } => unsafe { initial_context_switch(new_esp) },
        SchedAction::Switch { old_esp_out, new_esp } => unsafe {
            context_switch(old_esp_out, new_esp)
        },
    }
}

/// Scans the ready list starting immediately after `current` for the next
/// READY member, stopping if the scan loops back to `current` (§4.7's
/// round-robin fairness: a just-unblocked thread sits at the tail and is
/// reached before `current` is reconsidered).
fn find_next_ready(ctx: &KernelContext, current: ThreadIndex) -> Option<ThreadIndex> {
    let mut cur = ctx.threads[current as usize].next_ready?;
    for _ in 0..MAX_THREADS {
        if cur == current {
            return None;
        }
        if ctx.threads[cur as usize].state == ThreadState::Ready {
            return Some(cur);
        }
        cur = ctx.threads[cur as usize].next_ready?;
    }
    None
}

/// `block_current_thread(reason, data)` (§4.7).
pub fn block_current_thread(reason: BlockReason, data: u32) {
    let _cs = CriticalSection::enter();
    let mut ctx = KERNEL.lock();

    let Some(current) = ctx.current else { return };

    ctx.ready_remove(current);
    ctx.threads[current as usize].state = ThreadState::Blocked;
    ctx.threads[current as usize].block_reason = reason;
    ctx.threads[current as usize].next_blocked = None;
    if reason == BlockReason::Timer {
        ctx.threads[current as usize].wake_up_tick = data;
    }
    ctx.blocked_insert(current);
}

/// `sleep(ticks)` (§4.7): clamp, block on TIMER, invoke the scheduler.
pub fn sleep(ticks: u32) {
    let ticks = ticks.clamp(1, 65535);
    let deadline = {
        let _cs = CriticalSection::enter();
        let ctx = KERNEL.lock();
        ctx.system_ticks.wrapping_add(ticks)
    };
    block_current_thread(BlockReason::Timer, deadline);
    schedule();
}

/// Called from the keyboard IRQ handler after a byte is pushed into the
/// ring. Interrupts are already disabled (we are inside the ISR).
pub fn wake_keyboard_waiters() {
    let mut ctx = KERNEL.lock();
    ctx.wake_matching(BlockReason::Keyboard, ctx.system_ticks);
}

/// The timer handler's language-level half (§4.7). EOI has already been
/// issued by the caller (the asm stub calls this after issuing EOI — see
/// `crate::drivers::pic`).
pub fn on_timer_interrupt() {
    crate::drivers::pic::end_of_interrupt(crate::config::TIMER_VECTOR);

    let should_schedule = {
        let mut ctx = KERNEL.lock();
        ctx.system_ticks = ctx.system_ticks.wrapping_add(1);
        if ctx.system_ticks.wrapping_sub(ctx.last_slice_tick) >= DEFAULT_SLICE_TICKS {
            ctx.last_slice_tick = ctx.system_ticks;
            true
        } else {
            false
        }
    };

    if should_schedule {
        schedule();
    }
}

/// Current system tick count, for application threads' periodic bookkeeping.
///
/// Locking is bracketed by a `CriticalSection`: called from thread
/// context, so without disabling interrupts first, a timer IRQ landing
/// while the lock is held would have its handler spin forever trying to
/// re-acquire the same (non-reentrant) lock on this single core.
pub fn system_ticks() -> u32 {
    let _cs = CriticalSection::enter();
    KERNEL.lock().system_ticks
}

/// Per-thread bookkeeping accessors used by the demo workloads (display
/// row, work counter, last observed tick, delay interval). Not
/// interpreted by the scheduler itself (§3). See `system_ticks` for why
/// this is wrapped in a `CriticalSection`.
pub fn with_current_thread<R>(f: impl FnOnce(&mut ThreadBookkeeping) -> R) -> Option<R> {
    let _cs = CriticalSection::enter();
    let mut ctx = KERNEL.lock();
    let current = ctx.current?;
    let tcb = &mut ctx.threads[current as usize];
    Some(f(&mut ThreadBookkeeping {
        counter: &mut tcb.counter,
        delay_ticks: tcb.delay_ticks,
        last_tick: &mut tcb.last_tick,
        display_row: tcb.display_row,
    }))
}

pub struct ThreadBookkeeping<'a> {
    pub counter: &'a mut u32,
    pub delay_ticks: u32,
    pub last_tick: &'a mut u32,
    pub display_row: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> KernelContext {
        KernelContext::new()
    }

    #[test]
    fn ready_list_push_and_remove_is_circular() {
        let mut ctx = fresh();
        ctx.threads[0].next_ready = None;
        ctx.ready_push_back(0);
        ctx.ready_push_back(1);
        ctx.ready_push_back(2);
        assert_eq!(ctx.ready_head, Some(0));
        assert_eq!(ctx.ready_tail(0), 2);
        assert_eq!(ctx.threads[2].next_ready, Some(0));

        ctx.ready_remove(1);
        assert_eq!(ctx.threads[0].next_ready, Some(2));
        assert_eq!(ctx.threads[2].next_ready, Some(0));
    }

    #[test]
    fn ready_list_single_element_self_links() {
        let mut ctx = fresh();
        ctx.ready_push_back(0);
        assert_eq!(ctx.threads[0].next_ready, Some(0));
        ctx.ready_remove(0);
        assert_eq!(ctx.ready_head, None);
    }

    #[test]
    fn blocked_list_timer_entries_stay_sorted() {
        let mut ctx = fresh();
        ctx.threads[0].block_reason = BlockReason::Timer;
        ctx.threads[0].wake_up_tick = 50;
        ctx.threads[1].block_reason = BlockReason::Timer;
        ctx.threads[1].wake_up_tick = 10;
        ctx.threads[2].block_reason = BlockReason::Timer;
        ctx.threads[2].wake_up_tick = 30;

        ctx.blocked_insert(0);
        ctx.blocked_insert(1);
        ctx.blocked_insert(2);

        assert_eq!(ctx.blocked_head, Some(1));
        assert_eq!(ctx.threads[1].next_blocked, Some(2));
        assert_eq!(ctx.threads[2].next_blocked, Some(0));
        assert_eq!(ctx.threads[0].next_blocked, None);
    }

    #[test]
    fn keyboard_blocks_are_fifo_regardless_of_timer_entries() {
        let mut ctx = fresh();
        ctx.threads[0].block_reason = BlockReason::Timer;
        ctx.threads[0].wake_up_tick = 5;
        ctx.threads[1].block_reason = BlockReason::Keyboard;
        ctx.threads[2].block_reason = BlockReason::Keyboard;

        ctx.blocked_insert(0);
        ctx.blocked_insert(1);
        ctx.blocked_insert(2);

        assert_eq!(ctx.blocked_head, Some(0));
        assert_eq!(ctx.threads[0].next_blocked, Some(1));
        assert_eq!(ctx.threads[1].next_blocked, Some(2));
    }

    #[test]
    fn wake_matching_timer_moves_only_due_entries() {
        let mut ctx = fresh();
        ctx.threads[0].block_reason = BlockReason::Timer;
        ctx.threads[0].wake_up_tick = 10;
        ctx.threads[1].block_reason = BlockReason::Timer;
        ctx.threads[1].wake_up_tick = 20;
        ctx.blocked_insert(0);
        ctx.blocked_insert(1);

        ctx.wake_matching(BlockReason::Timer, 10);

        assert_eq!(ctx.threads[0].state, ThreadState::Ready);
        assert_eq!(ctx.threads[0].block_reason, BlockReason::None);
        assert_eq!(ctx.threads[1].state, ThreadState::Blocked);
        assert_eq!(ctx.blocked_head, Some(1));
        assert_eq!(ctx.ready_head, Some(0));
    }

    #[test]
    fn tick_due_handles_wraparound() {
        assert!(tick_due(5, 5));
        assert!(!tick_due(4, 5));
        // system_ticks just wrapped past u32::MAX; deadline set shortly
        // before the wrap is still "due" under the signed-difference form.
        assert!(tick_due(2, u32::MAX - 1));
        // A deadline far in the "future" relative to a just-wrapped now
        // must not appear due.
        assert!(!tick_due(0, 100));
    }

    #[test]
    fn ready_list_is_sane_accepts_empty_and_well_formed_lists() {
        let mut ctx = fresh();
        assert!(ctx.ready_list_is_sane());
        ctx.ready_push_back(0);
        ctx.ready_push_back(1);
        assert!(ctx.ready_list_is_sane());
    }

    #[test]
    fn ready_list_is_sane_rejects_a_broken_link() {
        let mut ctx = fresh();
        ctx.ready_push_back(0);
        ctx.ready_push_back(1);
        // Sever the loop: 1 should point back to 0, point it at a dead end.
        ctx.threads[1].next_ready = None;
        assert!(!ctx.ready_list_is_sane());
    }

    #[test]
    fn find_next_ready_stops_when_only_current_is_runnable() {
        let mut ctx = fresh();
        ctx.ready_push_back(0);
        ctx.threads[0].state = ThreadState::Running;
        ctx.current = Some(0);
        assert_eq!(find_next_ready(&ctx, 0), None);
    }

    extern "C" fn dummy_entry() -> ! {
        loop {}
    }

    /// `(thread_count, ready_head, ready list walked from the head)`, used
    /// to check that a failed `create_thread` call leaves everything as it
    /// found it.
    fn ready_snapshot(ctx: &KernelContext) -> (usize, Option<ThreadIndex>, heapless::Vec<ThreadIndex, MAX_THREADS>) {
        let mut list = heapless::Vec::new();
        if let Some(head) = ctx.ready_head {
            let mut cur = head;
            loop {
                let _ = list.push(cur);
                match ctx.threads[cur as usize].next_ready {
                    Some(next) if next == head => break,
                    Some(next) => cur = next,
                    None => break,
                }
            }
        }
        (ctx.thread_count, ctx.ready_head, list)
    }

    #[test]
    fn create_thread_rejects_out_of_range_display_row() {
        let mut ctx = fresh();
        assert_eq!(
            ctx.create_thread(dummy_entry, 1, 5, 5),
            Err(KernelError::InvalidParameter)
        );
        assert_eq!(ctx.thread_count, 0);
    }

    #[test]
    fn nth_plus_one_thread_creation_returns_out_of_memory_without_mutating_ready_list() {
        let mut ctx = fresh();
        for _ in 0..MAX_THREADS {
            assert!(ctx.create_thread(dummy_entry, 1, 0, 1).is_ok());
        }

        let before = ready_snapshot(&ctx);
        assert_eq!(before.0, MAX_THREADS);

        assert_eq!(
            ctx.create_thread(dummy_entry, 1, 0, 1),
            Err(KernelError::OutOfMemory)
        );

        assert_eq!(ready_snapshot(&ctx), before);
    }
}
