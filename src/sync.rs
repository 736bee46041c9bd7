//! # Interrupt Gate
//!
//! Enable/disable/save/restore of the core's interrupt mask. The execution
//! core has a single interrupt priority level, so nothing in the protocol
//! path depends on these; they exist so that code written against them
//! stays correct on a port where the mask carries more state.
//!
//! Nesting must go through [`save`]/[`restore`]: restoring an outer state
//! never re-enables interrupts while an inner critical section is still
//! open, because each token remembers exactly what it found.

use cortex_m::interrupt::CriticalSection;

/// Opaque interrupt state captured by [`save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "dropping the token leaves interrupts disabled"]
pub struct IrqState {
    enabled: bool,
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod imp {
    use cortex_m::{interrupt, register::primask};

    #[inline]
    pub fn enabled() -> bool {
        primask::read().is_inactive()
    }

    #[inline]
    pub fn disable() {
        interrupt::disable();
    }

    #[inline]
    pub fn enable() {
        // Safety: only called to lift a section opened by this module.
        unsafe { interrupt::enable() }
    }
}

// Host builds track the mask in a flag so the nesting rules can be tested.
#[cfg(not(all(target_arch = "arm", target_os = "none")))]
mod imp {
    use core::sync::atomic::{AtomicBool, Ordering};

    static ENABLED: AtomicBool = AtomicBool::new(true);

    pub fn enabled() -> bool {
        ENABLED.load(Ordering::SeqCst)
    }

    pub fn disable() {
        ENABLED.store(false, Ordering::SeqCst);
    }

    pub fn enable() {
        ENABLED.store(true, Ordering::SeqCst);
    }
}

/// Open a critical section.
#[inline]
pub fn disable() {
    imp::disable();
}

/// Lift a critical section opened with [`disable`].
#[inline]
pub fn enable() {
    imp::enable();
}

/// Whether interrupts are currently enabled.
#[inline]
pub fn is_enabled() -> bool {
    imp::enabled()
}

/// Capture the current state and disable interrupts.
#[inline]
pub fn save() -> IrqState {
    let state = IrqState { enabled: imp::enabled() };
    imp::disable();
    state
}

/// Return to the state captured by `state`.
#[inline]
pub fn restore(state: IrqState) {
    if state.enabled {
        imp::enable();
    }
}

/// Execute a closure within a critical section.
///
/// Built on [`save`]/[`restore`], so it nests: an inner section never
/// re-enables interrupts on behalf of an outer one.
///
/// ```ignore
/// sync::critical_section(|_cs| {
///     // touch state shared with interrupt context
/// });
/// ```
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&CriticalSection) -> R,
{
    let state = save();
    // Safety: interrupts are masked until `restore` below.
    let cs = unsafe { CriticalSection::new() };
    let result = f(&cs);
    restore(state);
    result
}
