//! # Handshake & Shutdown Coordinator
//!
//! Lifecycle of the execution core as seen by the peer:
//!
//! ```text
//!   ┌─────────┐  peer waiting,   ┌───────┐  shutdown   ┌──────────────┐  shutdown   ┌────────┐
//!   │ Booting │ ───────────────► │ Ready │ ──────────► │ ShuttingDown │ ──────────► │ Halted │
//!   └─────────┘  table published └───────┘             └──────────────┘   again     └────────┘
//!        │                                                     ▲
//!        └─────────────────── shutdown ───────────────────────┘
//! ```
//!
//! While `ShuttingDown` the task loop keeps running, but only commands
//! flagged `IN_SHUTDOWN` execute. `Halted` is terminal.

use core::cell::Cell;

use crate::command::{Command, CommandFlags, Context, Message};
use crate::config::{MESSAGE_MAX, MSG_IS_SHUTDOWN};
use crate::console::Respond;
use crate::shared::Handshake;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Booting,
    Ready,
    ShuttingDown,
    Halted,
}

/// Reason given when the peer asks for a shutdown.
pub const PEER_REQUEST_REASON: &str = "Request from peer core";

fn shutdown_handler(ctx: &mut Context<'_>, _args: &[u32]) {
    ctx.shutdown(PEER_REQUEST_REASON)
}

/// Published at boot; the peer posts it to request a shutdown.
pub static SHUTDOWN_REQUEST: Command = Command::new(shutdown_handler, CommandFlags::empty());

/// Tracks the current [`Phase`] and the shutdown reason, and drives the boot
/// rendezvous.
///
/// All state is behind `Cell`s so the scheduler can read and update it
/// through a shared borrow while a command handler is running.
pub struct Coordinator {
    phase: Cell<Phase>,
    reason: Cell<Option<&'static str>>,
}

impl Coordinator {
    pub const fn new() -> Self {
        Self {
            phase: Cell::new(Phase::Booting),
            reason: Cell::new(None),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self.phase(), Phase::ShuttingDown | Phase::Halted)
    }

    /// Reason given for the first shutdown.
    pub fn reason(&self) -> Option<&'static str> {
        self.reason.get()
    }

    /// Wait for the peer, publish the command table and the shutdown
    /// request, then signal readiness.
    ///
    /// The wait is a tight poll bounded by the peer's own boot time.
    pub fn boot(&self, handshake: Handshake<'_>, commands: &'static [Command]) {
        while !handshake.peer_waiting() {
            core::hint::spin_loop();
        }
        handshake.publish(commands, &SHUTDOWN_REQUEST);
        if self.phase() == Phase::Booting {
            self.phase.set(Phase::Ready);
        }
        log::info!("handshake complete, {} commands published", commands.len());
    }

    /// Record a shutdown. Returns `true` the first time, when the caller
    /// should run shutdown hooks and keep serving; `false` once already
    /// shutting down, when the core is now halted. Only the first reason is
    /// kept.
    pub fn enter_shutdown(&self, reason: &'static str) -> bool {
        match self.phase() {
            Phase::Booting | Phase::Ready => {
                log::error!("shutdown: {}", reason);
                self.phase.set(Phase::ShuttingDown);
                self.reason.set(Some(reason));
                true
            }
            Phase::ShuttingDown | Phase::Halted => {
                log::error!("shutdown while shutting down ({}), halting", reason);
                self.halt();
                false
            }
        }
    }

    /// Move to the terminal phase, keeping any recorded reason.
    pub fn halt(&self) {
        self.phase.set(Phase::Halted);
    }

    /// Tell the peer a shutdown is in progress, and why.
    pub fn report(&self, out: &dyn Respond) {
        let reason = self.reason().unwrap_or_default().as_bytes();
        let reason = &reason[..reason.len().min(MESSAGE_MAX - 1)];
        let _ = out.send(&Message::new(MSG_IS_SHUTDOWN, reason));
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}
