//! # execore Firmware
//!
//! Boots the execution core with a small command table:
//!
//! | Index | Command | Flags | Response |
//! |-------|---------|-------|----------|
//! | 0 | `identify` | | `[0x10, version...]` |
//! | 1 | `emergency_stop` | | none, enters shutdown |
//! | 2 | `get_status` | `IN_SHUTDOWN` | `[0x02, is_shutdown]` |
//!
//! The timed-event queue is a single heartbeat that rearms itself one
//! period ahead every time it fires.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use panic_halt as _;

use execore::arch::cortex_m4::{self, CompareTimer, PeerKick};
use execore::command::{Command, CommandFlags, Context, Message};
use execore::heap::Heap;
use execore::kernel::{self, Executive};
use execore::sched::Lifecycle;
use execore::timer::TimerQueue;

const MSG_IDENTIFY: u8 = 0x10;
const MSG_STATUS: u8 = 0x02;

/// Heartbeat period in counter ticks.
const HEARTBEAT_PERIOD: u32 = 1_000_000;

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn identify(ctx: &mut Context<'_>, _args: &[u32]) {
    let _ = ctx.send(&Message::new(MSG_IDENTIFY, env!("CARGO_PKG_VERSION").as_bytes()));
}

fn emergency_stop(ctx: &mut Context<'_>, _args: &[u32]) {
    ctx.shutdown("Command request")
}

fn get_status(ctx: &mut Context<'_>, _args: &[u32]) {
    let status = [ctx.is_shutdown() as u8];
    let _ = ctx.send(&Message::new(MSG_STATUS, &status));
}

static COMMANDS: [Command; 3] = [
    Command::new(identify, CommandFlags::empty()),
    Command::new(emergency_stop, CommandFlags::empty()),
    Command::new(get_status, CommandFlags::IN_SHUTDOWN),
];

// ---------------------------------------------------------------------------
// Timed events
// ---------------------------------------------------------------------------

struct Heartbeat {
    deadline: u32,
    period: u32,
}

impl TimerQueue for Heartbeat {
    fn dispatch_due(&mut self) -> u32 {
        self.deadline = self.deadline.wrapping_add(self.period);
        self.deadline
    }
}

impl Lifecycle for Heartbeat {}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

#[entry]
fn main() -> ! {
    let mut heap = Heap::new(unsafe { cortex_m4::heap_region() });

    let side = unsafe { cortex_m4::shared_memory().execution_side(PeerKick::new()) };
    let timer = unsafe { CompareTimer::new() };
    let heartbeat = Heartbeat {
        deadline: 0,
        period: HEARTBEAT_PERIOD,
    };

    let exec = cortex_m::singleton!(
        : Executive<'static, CompareTimer, PeerKick, Heartbeat> =
            Executive::new(side, timer, heartbeat, &COMMANDS)
    )
    .expect("executive already taken");

    kernel::start(exec, &mut heap)
}
