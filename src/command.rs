//! # Command Descriptors
//!
//! A command is a handler plus flags. The peer core never calls a handler
//! itself: it posts a pointer to one of the descriptors published at boot
//! into the mailbox, and the console task runs it here.
//!
//! Responses leave through the [`Encode`] seam. The real wire encoder
//! lives with the command subsystem; [`Message`] is the minimal framing
//! this core needs for its own reports.

use bitflags::bitflags;

use crate::console::Respond;
use crate::error::SendError;
use crate::sched::Scheduler;

bitflags! {
    /// Per-command dispatch flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CommandFlags: u8 {
        /// The handler may still run after shutdown has begun.
        const IN_SHUTDOWN = 1 << 0;
    }
}

/// Signature of a command handler. `args` is the mailbox argument buffer.
pub type Handler = fn(ctx: &mut Context<'_>, args: &[u32]);

/// A dispatchable command.
#[repr(C)]
pub struct Command {
    pub handler: Handler,
    pub flags: CommandFlags,
}

impl Command {
    pub const fn new(handler: Handler, flags: CommandFlags) -> Self {
        Self { handler, flags }
    }

    #[inline]
    pub fn runs_in_shutdown(&self) -> bool {
        self.flags.contains(CommandFlags::IN_SHUTDOWN)
    }
}

/// What a handler may reach while it runs.
pub struct Context<'c> {
    sched: &'c dyn Scheduler,
    out: &'c dyn Respond,
}

impl<'c> Context<'c> {
    pub fn new(sched: &'c dyn Scheduler, out: &'c dyn Respond) -> Self {
        Self { sched, out }
    }

    /// Queue a response to the peer. Dropped if the queue is full.
    pub fn send(&self, msg: &dyn Encode) -> Result<(), SendError> {
        self.out.send(msg)
    }

    pub fn is_shutdown(&self) -> bool {
        self.sched.is_shutdown()
    }

    pub fn shutdown(&self, reason: &'static str) -> ! {
        self.sched.shutdown(reason)
    }
}

/// A response that can serialize itself into a slot.
pub trait Encode {
    /// Upper bound on the encoded length.
    fn max_size(&self) -> usize;

    /// Write the message into `buf` (at least `max_size` bytes long) and
    /// return the number of bytes written.
    fn encode(&self, buf: &mut [u8]) -> usize;
}

/// One id byte followed by a raw payload.
#[derive(Debug, Clone, Copy)]
pub struct Message<'m> {
    pub id: u8,
    pub payload: &'m [u8],
}

impl<'m> Message<'m> {
    pub const fn new(id: u8, payload: &'m [u8]) -> Self {
        Self { id, payload }
    }
}

impl Encode for Message<'_> {
    fn max_size(&self) -> usize {
        1 + self.payload.len()
    }

    fn encode(&self, buf: &mut [u8]) -> usize {
        let len = self.max_size();
        buf[0] = self.id;
        buf[1..len].copy_from_slice(self.payload);
        len
    }
}
