//! # Architecture Abstraction Layer
//!
//! Narrow interfaces over the hardware registers the core touches. Register
//! side effects (clear-on-write status, counters that move on their own)
//! are only reachable through these traits, never through plain memory, so
//! ordering is explicit at every call site.
//!
//! The `cortex_m4` port implements them with volatile MMIO.

pub mod cortex_m4;

use bitflags::bitflags;

use crate::config::{KICK_IN_EVENT, TIMER_EVENT};

bitflags! {
    /// Latched system events sharing the core's one interrupt line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Events: u32 {
        /// Compare match on the timer block.
        const TIMER = 1 << TIMER_EVENT;
        /// Kick from the peer core.
        const KICK = 1 << KICK_IN_EVENT;
    }
}

/// Compare timer plus the event controller it reports through.
pub trait TimerPort {
    /// Whether the host interrupt line is asserted.
    fn irq_asserted(&self) -> bool;

    /// Latched system events.
    fn pending_events(&self) -> Events;

    /// Acknowledge the given latched events.
    fn clear_events(&self, events: Events);

    /// Free-running counter.
    fn counter(&self) -> u32;

    fn set_counter(&self, ticks: u32);

    /// Program the compare register.
    fn set_compare(&self, ticks: u32);

    /// Clear the timer block's own compare-match status.
    fn clear_compare_status(&self);

    /// Wait long enough for a status write to reach the event controller.
    fn settle(&self);
}

/// Outbound cross-core notification. Carries no payload.
pub trait KickLine {
    fn kick(&self);
}

/// Stop the core for good.
pub fn halt() -> ! {
    loop {
        #[cfg(all(target_arch = "arm", target_os = "none"))]
        cortex_m::asm::wfi();
        #[cfg(not(all(target_arch = "arm", target_os = "none")))]
        core::hint::spin_loop();
    }
}
