//! # Cortex-M4 Port Layer
//!
//! Register-level implementation of the [`TimerPort`] and [`KickLine`]
//! interfaces for the execution core, plus the fixed-address regions the
//! firmware needs at boot.
//!
//! ## Register Map
//!
//! ```text
//! TIMER_BASE + 0x0C   CNT       free-running counter
//! TIMER_BASE + 0x44   CMP_STS   compare status, write 1 to clear
//! TIMER_BASE + 0x48   CMP0      compare value
//! INTC_BASE  + 0x020  SISR      system event index set
//! INTC_BASE  + 0x280  SECR0     system event status/clear, events 0-31
//! INTC_BASE  + 0x900  HIPIR[n]  highest pending event per host line
//! ```
//!
//! `HIPIR` reads with bit 31 set when nothing is pending on that line.

use core::ptr;

use super::{Events, KickLine, TimerPort};
use crate::config::{
    HOST_IRQ, INTC_BASE, KICK_OUT_EVENT, SHARED_MEM_BASE, TIMER_BASE, TIMER_SETTLE_CYCLES,
};
#[cfg(all(target_arch = "arm", target_os = "none"))]
use crate::config::STACK_RESERVE;
#[cfg(all(target_arch = "arm", target_os = "none"))]
use crate::heap::span_below_stack;
use crate::shared::SharedMemory;

const CNT: usize = 0x0C;
const CMP_STS: usize = 0x44;
const CMP0: usize = 0x48;

const SISR: usize = 0x020;
const SECR0: usize = 0x280;
const HIPIR: usize = 0x900;
const HIPIR_NONE: u32 = 1 << 31;

#[inline]
fn read(addr: usize) -> u32 {
    unsafe { ptr::read_volatile(addr as *const u32) }
}

#[inline]
fn write(addr: usize, value: u32) {
    unsafe { ptr::write_volatile(addr as *mut u32, value) }
}

// ---------------------------------------------------------------------------
// Timer block + event controller
// ---------------------------------------------------------------------------

/// The compare timer and its event-controller status bits.
pub struct CompareTimer {
    _private: (),
}

impl CompareTimer {
    /// # Safety
    /// At most one instance may exist; it owns the timer registers.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl TimerPort for CompareTimer {
    fn irq_asserted(&self) -> bool {
        read(INTC_BASE + HIPIR + 4 * HOST_IRQ as usize) & HIPIR_NONE == 0
    }

    fn pending_events(&self) -> Events {
        Events::from_bits_truncate(read(INTC_BASE + SECR0))
    }

    fn clear_events(&self, events: Events) {
        write(INTC_BASE + SECR0, events.bits());
    }

    fn counter(&self) -> u32 {
        read(TIMER_BASE + CNT)
    }

    fn set_counter(&self, ticks: u32) {
        write(TIMER_BASE + CNT, ticks);
    }

    fn set_compare(&self, ticks: u32) {
        write(TIMER_BASE + CMP0, ticks);
    }

    fn clear_compare_status(&self) {
        write(TIMER_BASE + CMP_STS, 0xff);
    }

    fn settle(&self) {
        #[cfg(all(target_arch = "arm", target_os = "none"))]
        cortex_m::asm::delay(TIMER_SETTLE_CYCLES);
        #[cfg(not(all(target_arch = "arm", target_os = "none")))]
        for _ in 0..TIMER_SETTLE_CYCLES {
            core::hint::spin_loop();
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound kick
// ---------------------------------------------------------------------------

/// Raises `KICK_OUT_EVENT` on the event controller.
pub struct PeerKick {
    _private: (),
}

impl PeerKick {
    /// # Safety
    /// At most one instance may exist.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl KickLine for PeerKick {
    fn kick(&self) {
        write(INTC_BASE + SISR, KICK_OUT_EVENT);
    }
}

// ---------------------------------------------------------------------------
// Fixed regions
// ---------------------------------------------------------------------------

/// The region shared with the peer core.
///
/// # Safety
/// `SHARED_MEM_BASE` must map a region laid out as [`SharedMemory`] that
/// lives for the whole run.
pub unsafe fn shared_memory() -> &'static SharedMemory {
    &*(SHARED_MEM_BASE as *const SharedMemory)
}

/// RAM between the end of static data and the stack reserve.
///
/// The slice stops `STACK_RESERVE` bytes below `_stack_start`, so it never
/// covers memory the main stack is using.
///
/// # Safety
/// Must be called at most once, and the main stack must stay within
/// `STACK_RESERVE` bytes.
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub unsafe fn heap_region() -> &'static mut [u8] {
    extern "C" {
        static mut __sheap: u8;
        static _stack_start: u8;
    }
    let start = ptr::addr_of_mut!(__sheap);
    let top = ptr::addr_of!(_stack_start) as usize;
    let len = span_below_stack(start as usize, top, STACK_RESERVE);
    core::slice::from_raw_parts_mut(start, len)
}
