//! # Timer Pump
//!
//! Owns the compare timer. Each poll of the interrupt line drains the due
//! timed events through the external timer queue and rearms the compare
//! register with the deadline the queue reports.
//!
//! The timer and the peer's kick share one interrupt line, so every handled
//! interrupt acknowledges both events together: a kick-only interrupt is
//! cleared even though no timer fired, and neither source is lost or seen
//! twice.
//!
//! ```text
//!   irq line ──► pending? ──no──► return
//!                  │ yes
//!                  ▼
//!           TIMER latched? ──yes──► clear CMP status
//!                  │                 next = queue.dispatch_due()
//!                  │                 CMP = next
//!                  ▼
//!           clear TIMER | KICK
//! ```

use crate::arch::{Events, TimerPort};
use crate::config::TIMER_REARM_MARGIN;
use crate::heap::Heap;
use crate::sched::{Lifecycle, Scheduler};

/// The external queue of timed events.
pub trait TimerQueue {
    /// Run every event whose deadline has passed and return the deadline
    /// of the next one, in counter ticks.
    fn dispatch_due(&mut self) -> u32;
}

/// Drives the compare timer on behalf of a [`TimerQueue`].
pub struct TimerPump<P: TimerPort> {
    port: P,
}

impl<P: TimerPort> TimerPump<P> {
    pub const fn new(port: P) -> Self {
        Self { port }
    }

    /// Current value of the free-running counter.
    #[inline]
    pub fn read_time(&self) -> u32 {
        self.port.counter()
    }

    /// Service the shared interrupt line once.
    ///
    /// Returns `false` without touching any register when the line is idle.
    /// The compare register is written only after the drain finishes, so a
    /// timer added by a handler during this drain is covered by the rearm.
    pub fn irq_poll(&self, timers: &mut dyn TimerQueue) -> bool {
        if !self.port.irq_asserted() {
            return false;
        }
        if self.port.pending_events().contains(Events::TIMER) {
            self.port.clear_compare_status();
            let next = timers.dispatch_due();
            self.port.set_compare(next);
        }
        self.port.clear_events(Events::TIMER | Events::KICK);
        true
    }

    /// Push the compare a little into the future and drop any stale status,
    /// so a pending timer survives a reconfiguration.
    fn rearm(&self) {
        let now = self.port.counter();
        self.port.set_compare(now.wrapping_add(TIMER_REARM_MARGIN));
        self.port.clear_compare_status();
        self.port.settle();
        self.port.clear_events(Events::TIMER);
        self.port.clear_events(Events::KICK);
    }
}

impl<P: TimerPort> Lifecycle for TimerPump<P> {
    fn init(&mut self, _heap: &mut Heap<'static>, _sched: &dyn Scheduler) {
        self.port.set_counter(0);
        self.rearm();
    }

    fn shutdown(&self) {
        log::debug!("timer rearmed for shutdown");
        self.rearm();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use core::cell::{Cell, RefCell};

    use crate::sched::tests::{empty_heap, PanicSched};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Op {
        SetCounter(u32),
        SetCompare(u32),
        ClearStatus,
        Settle,
        ClearEvents(Events),
    }

    /// Register model that records every write.
    #[derive(Default)]
    pub struct FakeTimer {
        pub irq: Cell<bool>,
        pub latched: Cell<u32>,
        pub counter: Cell<u32>,
        pub compare: Cell<u32>,
        pub ops: RefCell<Vec<Op>>,
    }

    impl FakeTimer {
        pub fn raise(&self, events: Events) {
            self.latched.set(self.latched.get() | events.bits());
            self.irq.set(true);
        }

        pub fn take_ops(&self) -> Vec<Op> {
            self.ops.take()
        }
    }

    impl TimerPort for &FakeTimer {
        fn irq_asserted(&self) -> bool {
            self.irq.get()
        }

        fn pending_events(&self) -> Events {
            Events::from_bits_truncate(self.latched.get())
        }

        fn clear_events(&self, events: Events) {
            self.latched.set(self.latched.get() & !events.bits());
            if self.latched.get() == 0 {
                self.irq.set(false);
            }
            self.ops.borrow_mut().push(Op::ClearEvents(events));
        }

        fn counter(&self) -> u32 {
            self.counter.get()
        }

        fn set_counter(&self, ticks: u32) {
            self.counter.set(ticks);
            self.ops.borrow_mut().push(Op::SetCounter(ticks));
        }

        fn set_compare(&self, ticks: u32) {
            self.compare.set(ticks);
            self.ops.borrow_mut().push(Op::SetCompare(ticks));
        }

        fn clear_compare_status(&self) {
            self.ops.borrow_mut().push(Op::ClearStatus);
        }

        fn settle(&self) {
            self.ops.borrow_mut().push(Op::Settle);
        }
    }

    /// Timer queue that reports a fixed sequence of deadlines.
    pub struct ScriptedQueue {
        pub deadlines: Vec<u32>,
        pub drained: usize,
    }

    impl ScriptedQueue {
        pub fn new(deadlines: &[u32]) -> Self {
            Self {
                deadlines: deadlines.to_vec(),
                drained: 0,
            }
        }
    }

    impl Lifecycle for ScriptedQueue {}

    impl TimerQueue for ScriptedQueue {
        fn dispatch_due(&mut self) -> u32 {
            let next = self.deadlines[self.drained % self.deadlines.len()];
            self.drained += 1;
            next
        }
    }

    #[test]
    fn test_match_rearms_to_reported_deadline() {
        let hw = FakeTimer::default();
        let pump = TimerPump::new(&hw);
        let mut queue = ScriptedQueue::new(&[12_345]);

        hw.raise(Events::TIMER);
        assert!(pump.irq_poll(&mut queue));

        assert_eq!(queue.drained, 1);
        assert_eq!(hw.compare.get(), 12_345);
        assert_eq!(
            hw.take_ops(),
            vec![
                Op::ClearStatus,
                Op::SetCompare(12_345),
                Op::ClearEvents(Events::TIMER | Events::KICK),
            ]
        );
        assert!(!hw.irq.get());
    }

    #[test]
    fn test_kick_only_interrupt_is_acknowledged_without_drain() {
        let hw = FakeTimer::default();
        hw.compare.set(777);
        let pump = TimerPump::new(&hw);
        let mut queue = ScriptedQueue::new(&[1]);

        hw.raise(Events::KICK);
        assert!(pump.irq_poll(&mut queue));

        assert_eq!(queue.drained, 0);
        assert_eq!(hw.compare.get(), 777);
        assert_eq!(
            hw.take_ops(),
            vec![Op::ClearEvents(Events::TIMER | Events::KICK)]
        );
        assert_eq!(hw.latched.get(), 0);
    }

    #[test]
    fn test_idle_line_touches_nothing() {
        let hw = FakeTimer::default();
        let pump = TimerPump::new(&hw);
        let mut queue = ScriptedQueue::new(&[1]);

        assert!(!pump.irq_poll(&mut queue));
        assert_eq!(queue.drained, 0);
        assert!(hw.take_ops().is_empty());
    }

    #[test]
    fn test_timer_and_kick_together_handled_once() {
        let hw = FakeTimer::default();
        let pump = TimerPump::new(&hw);
        let mut queue = ScriptedQueue::new(&[500, 900]);

        hw.raise(Events::TIMER | Events::KICK);
        assert!(pump.irq_poll(&mut queue));
        assert!(!pump.irq_poll(&mut queue));

        assert_eq!(queue.drained, 1);
        assert_eq!(hw.compare.get(), 500);
    }

    #[test]
    fn test_init_resets_counter_then_rearms() {
        let hw = FakeTimer::default();
        hw.counter.set(9_000);
        let mut pump = TimerPump::new(&hw);

        pump.init(&mut empty_heap(), &PanicSched);

        assert_eq!(hw.counter.get(), 0);
        assert_eq!(hw.compare.get(), TIMER_REARM_MARGIN);
        assert_eq!(
            hw.take_ops(),
            vec![
                Op::SetCounter(0),
                Op::SetCompare(TIMER_REARM_MARGIN),
                Op::ClearStatus,
                Op::Settle,
                Op::ClearEvents(Events::TIMER),
                Op::ClearEvents(Events::KICK),
            ]
        );
    }

    #[test]
    fn test_shutdown_rearm_wraps_counter() {
        let hw = FakeTimer::default();
        hw.counter.set(u32::MAX - 10);
        let pump = TimerPump::new(&hw);

        pump.shutdown();

        assert_eq!(hw.compare.get(), TIMER_REARM_MARGIN - 11);
        assert_eq!(pump.read_time(), u32::MAX - 10);
        assert_eq!(hw.take_ops()[0], Op::SetCompare(TIMER_REARM_MARGIN - 11));
    }
}
