//! Completion signal abstraction.
//!
//! Each work item carries two of these: one for the compression stage and
//! one for the whole job.
//!
//! # Implementors
//!
//! - `EventSignal` (default): atomic flag plus mutex/condvar for sleepers.

/// One-shot, multi-waiter binary gate.
///
/// **Contract:**
/// - Starts lowered. `raise()` is idempotent and never lowers again.
/// - `wait()` returns once the gate is raised; every waiter is released.
/// - `is_raised()` never reports true before a `raise()` that `wait()`
///   would also observe.
/// - Everything written before `raise()` is visible after `wait()` returns.
pub trait CompletionSignal: Send + Sync {
    fn raise(&self);

    fn wait(&self);

    fn is_raised(&self) -> bool;
}
