//! The thread control block and the small enums that describe its state.

use crate::config::STACK_WORDS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Ready,
    Running,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// Not blocked; the field is meaningless while `state != Blocked`.
    None,
    /// Blocked in `sleep`, woken when `system_ticks` reaches `wake_up_tick`.
    Timer,
    /// Blocked waiting for a keyboard byte.
    Keyboard,
}

/// One thread's saved machine state plus the scheduler bookkeeping it
/// needs. Lives in a fixed-size array owned by the kernel context — never
/// boxed, never moved once created (its stack's addresses are baked into
/// `esp` the moment it starts running).
pub struct Tcb {
    /// The thread's private stack. `esp` always points somewhere inside
    /// this array (as a real address, not an index) while the thread is
    /// not running.
    pub stack: [u32; STACK_WORDS],
    pub esp: u32,
    pub state: ThreadState,
    pub block_reason: BlockReason,
    /// Demo-workload bookkeeping; the scheduler never reads these.
    pub counter: u32,
    pub delay_ticks: u32,
    pub last_tick: u32,
    pub wake_up_tick: u32,
    pub display_row: u8,
    pub next_ready: Option<u8>,
    pub next_blocked: Option<u8>,
}

impl Tcb {
    pub const EMPTY: Tcb = Tcb {
        stack: [0; STACK_WORDS],
        esp: 0,
        state: ThreadState::Blocked,
        block_reason: BlockReason::None,
        counter: 0,
        delay_ticks: 1,
        last_tick: 0,
        wake_up_tick: 0,
        display_row: 0,
        next_ready: None,
        next_blocked: None,
    };
}
