//! Demonstration thread shapes kept as integration-test-only fixtures
//! (§1.2): the scheduler's own payload is just the idle thread (see
//! `kernel_main`); these exist so the end-to-end scenarios in the base
//! spec's §8 are concretely reproducible under an emulator, the way the
//! original tutorial's day99 demo threads were.
//!
//! Not compiled into the shipped binary — only under `#[cfg(test)]`,
//! alongside the rest of the host-testable ambient stack.

pub mod scheduler_scenarios;
