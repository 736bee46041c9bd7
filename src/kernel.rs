//! # Kernel
//!
//! The executive that ties the components together, and the firmware glue
//! that runs it.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► Heap::new()             ← RAM below the stack reserve
//!         ├─► Executive::new()        ← split shared memory, build components
//!         └─► kernel::start()         ← no return
//!               ├─► boot()            ← handshake, then init hooks in order
//!               └─► loop { step() }   ← irq poll + console task
//! ```
//!
//! ## Borrows
//!
//! `boot` is the only `&mut` access to the executive. Once the loop starts,
//! the executive, the coordinator and everything the scheduler reaches are
//! used through shared borrows only, so a handler calling back into the
//! [`Kernel`] never aliases a live `&mut`.
//!
//! ## Shutdown
//!
//! `Kernel::shutdown` never returns. The first call records the reason,
//! runs every shutdown hook in order and re-enters the loop, which keeps
//! serving `IN_SHUTDOWN` commands and reporting shutdown for the rest. A
//! shutdown raised while already shutting down, or before the loop has
//! started, halts the core with the reason kept in the coordinator.

use core::cell::RefCell;
use core::ptr;

use crate::arch::{self, KickLine, TimerPort};
use crate::command::Command;
use crate::console::{Console, Respond};
use crate::handshake::Coordinator;
use crate::heap::Heap;
use crate::sched::{Lifecycle, Scheduler};
use crate::shared::{ExecutionSide, Handshake};
use crate::sync;
use crate::timer::{TimerPump, TimerQueue};

// ---------------------------------------------------------------------------
// Executive
// ---------------------------------------------------------------------------

/// What the loop driver needs from the executive.
pub trait Runtime {
    /// Handshake with the peer, then run init hooks.
    fn boot(&mut self, coord: &Coordinator, heap: &mut Heap<'static>, sched: &dyn Scheduler);

    /// One loop iteration.
    fn step(&self, sched: &dyn Scheduler);

    /// Run every shutdown hook once, in order.
    fn shutdown_hooks(&self);
}

/// All components of the execution core.
pub struct Executive<'a, P: TimerPort, K: KickLine, Q: TimerQueue + Lifecycle> {
    handshake: Option<Handshake<'a>>,
    commands: &'static [Command],
    pump: TimerPump<P>,
    console: Console<'a, K>,
    timers: RefCell<Q>,
}

impl<'a, P, K, Q> Executive<'a, P, K, Q>
where
    P: TimerPort,
    K: KickLine,
    Q: TimerQueue + Lifecycle,
{
    pub fn new(side: ExecutionSide<'a, K>, port: P, timers: Q, commands: &'static [Command]) -> Self {
        Self {
            handshake: Some(side.handshake),
            commands,
            pump: TimerPump::new(port),
            console: Console::new(side.mailbox, side.responses),
            timers: RefCell::new(timers),
        }
    }

    pub fn read_time(&self) -> u32 {
        self.pump.read_time()
    }

    pub fn console(&self) -> &Console<'a, K> {
        &self.console
    }

    /// Components with lifecycle hooks, in the order the hooks run.
    fn lifecycles(&mut self) -> [&mut dyn Lifecycle; 3] {
        [&mut self.pump, &mut self.console, self.timers.get_mut()]
    }
}

impl<'a, P, K, Q> Runtime for Executive<'a, P, K, Q>
where
    P: TimerPort,
    K: KickLine,
    Q: TimerQueue + Lifecycle,
{
    fn boot(&mut self, coord: &Coordinator, heap: &mut Heap<'static>, sched: &dyn Scheduler) {
        if let Some(handshake) = self.handshake.take() {
            coord.boot(handshake, self.commands);
        }
        for component in self.lifecycles() {
            component.init(heap, sched);
        }
        log::info!("init done, {} heap bytes left", heap.remaining());
    }

    fn step(&self, sched: &dyn Scheduler) {
        // Stays borrowed for good if a shutdown left a drain behind.
        if let Ok(mut timers) = self.timers.try_borrow_mut() {
            self.pump.irq_poll(&mut *timers);
        }
        self.console.task(sched);
    }

    fn shutdown_hooks(&self) {
        self.pump.shutdown();
        self.console.shutdown();
        if let Ok(timers) = self.timers.try_borrow() {
            timers.shutdown();
        }
    }
}

// ---------------------------------------------------------------------------
// Firmware glue
// ---------------------------------------------------------------------------

struct Global(Coordinator);

// Safety: single core, and the coordinator is only touched from the task
// loop and the code it calls, never from interrupt context.
unsafe impl Sync for Global {}

static COORDINATOR: Global = Global(Coordinator::new());

/// The running executive. Set once in `start()` after boot, read-only after.
static mut RUNTIME: Option<&'static dyn Runtime> = None;

/// Shutdown state read by the kernel scheduler and its handlers.
pub fn coordinator() -> &'static Coordinator {
    &COORDINATOR.0
}

fn runtime() -> Option<&'static dyn Runtime> {
    unsafe { *ptr::addr_of!(RUNTIME) }
}

/// The scheduler as seen by the components once the kernel is running.
pub struct Kernel;

impl Scheduler for Kernel {
    fn is_shutdown(&self) -> bool {
        coordinator().is_shutdown()
    }

    fn report_shutdown(&self, out: &dyn Respond) {
        coordinator().report(out);
    }

    fn shutdown(&self, reason: &'static str) -> ! {
        let serving = sync::critical_section(|_cs| coordinator().enter_shutdown(reason));
        if serving {
            match runtime() {
                Some(rt) => {
                    rt.shutdown_hooks();
                    run(rt);
                }
                // Fatal during boot: the executive is still mutably borrowed.
                None => coordinator().halt(),
            }
        }
        sync::disable();
        arch::halt()
    }
}

/// Boot the executive and run the task loop. **Does not return.**
pub fn start(rt: &'static mut dyn Runtime, heap: &mut Heap<'static>) -> ! {
    rt.boot(coordinator(), heap, &Kernel);
    let rt: &'static dyn Runtime = rt;
    sync::critical_section(|_cs| unsafe {
        RUNTIME = Some(rt);
    });
    run(rt)
}

fn run(rt: &'static dyn Runtime) -> ! {
    loop {
        rt.step(&Kernel);
    }
}
