//! # Scheduler Interface
//!
//! What this core consumes from the cooperative scheduler that drives it,
//! and the lifecycle hooks its components expose back.

use crate::console::Respond;
use crate::heap::Heap;

/// The external task scheduler, as seen from the components of this core.
pub trait Scheduler {
    /// Whether a shutdown is in progress.
    fn is_shutdown(&self) -> bool;

    /// Tell the peer that commands are refused because of a shutdown.
    fn report_shutdown(&self, out: &dyn Respond);

    /// Enter shutdown with a short diagnostic reason. Never returns.
    fn shutdown(&self, reason: &'static str) -> !;
}

/// Init and shutdown hooks of a component.
///
/// Components are held in an explicit ordered list by the executive, which
/// runs every `init` once before the task loop and every `shutdown` once
/// when a shutdown begins, in list order.
///
/// `init` is the only place a component may allocate. `shutdown` runs while
/// the task loop may still be suspended inside the component, so it only
/// gets a shared borrow.
pub trait Lifecycle {
    fn init(&mut self, _heap: &mut Heap<'static>, _sched: &dyn Scheduler) {}

    fn shutdown(&self) {}
}
