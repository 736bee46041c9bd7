//! # Console Task
//!
//! Command ingestion and response output over the shared-memory channel.
//! The scheduler calls [`Console::task`] once per loop iteration; it never
//! waits. Responses go out through [`Respond`], which the console's
//! response queue implements.
//!
//! Both channel ends sit in `RefCell`s and are only borrowed for the span of
//! one poll, clear or send. A handler that enters shutdown never returns, so
//! no borrow may be held across it.

use core::cell::RefCell;

use crate::arch::KickLine;
use crate::command::{Context, Encode};
use crate::config::COMMAND_ARGS;
use crate::error::SendError;
use crate::sched::{Lifecycle, Scheduler};
use crate::shared::{Mailbox, ResponseQueue};

/// Sink for encoded responses.
pub trait Respond {
    /// Queue `msg` for the peer, or report why it was dropped.
    fn send(&self, msg: &dyn Encode) -> Result<(), SendError>;
}

impl<K: KickLine> Respond for RefCell<ResponseQueue<'_, K>> {
    fn send(&self, msg: &dyn Encode) -> Result<(), SendError> {
        let result = match self.try_borrow_mut() {
            Ok(mut queue) => queue.send(msg),
            Err(_) => Err(SendError::Busy),
        };
        if let Err(err) = &result {
            log::trace!("response dropped: {}", err);
        }
        result
    }
}

/// Ingestion and output halves of the channel, as one task.
pub struct Console<'a, K: KickLine> {
    mailbox: RefCell<Mailbox<'a>>,
    responses: RefCell<ResponseQueue<'a, K>>,
}

impl<'a, K: KickLine> Console<'a, K> {
    pub fn new(mailbox: Mailbox<'a>, responses: ResponseQueue<'a, K>) -> Self {
        Self {
            mailbox: RefCell::new(mailbox),
            responses: RefCell::new(responses),
        }
    }

    /// Process the pending command, if any. Returns whether one was taken.
    ///
    /// During shutdown a command without `IN_SHUTDOWN` is not run; the peer
    /// gets a shutdown report instead. Either way the mailbox is cleared
    /// afterwards so the peer may post again.
    pub fn task(&self, sched: &dyn Scheduler) -> bool {
        let (command, args) = {
            let Ok(mut mailbox) = self.mailbox.try_borrow_mut() else {
                return false;
            };
            let Some(posted) = mailbox.poll() else {
                return false;
            };
            let mut args = [0u32; COMMAND_ARGS];
            args.copy_from_slice(posted.args());
            (posted.command, args)
        };

        if sched.is_shutdown() && !command.runs_in_shutdown() {
            sched.report_shutdown(&self.responses);
        } else {
            let mut ctx = Context::new(sched, &self.responses);
            (command.handler)(&mut ctx, &args);
        }

        self.mailbox.borrow_mut().clear();
        true
    }

    /// Queue a response outside of any command.
    pub fn sendf(&self, msg: &dyn Encode) -> Result<(), SendError> {
        self.responses.send(msg)
    }

    pub fn responses(&self) -> &dyn Respond {
        &self.responses
    }
}

impl<K: KickLine> Lifecycle for Console<'_, K> {
    fn shutdown(&self) {
        // A command interrupted by the shutdown must not run again.
        if let Ok(mut mailbox) = self.mailbox.try_borrow_mut() {
            mailbox.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::command::{Command, CommandFlags, Message};
    use crate::config::MESSAGE_MAX;
    use crate::shared::tests::CountingKick;
    use crate::shared::SharedMemory;

    #[derive(Default)]
    struct FakeSched {
        shutdown: Cell<bool>,
        reports: Cell<u32>,
    }

    impl Scheduler for FakeSched {
        fn is_shutdown(&self) -> bool {
            self.shutdown.get()
        }

        fn report_shutdown(&self, out: &dyn Respond) {
            self.reports.set(self.reports.get() + 1);
            let _ = out.send(&Message::new(0xDD, b""));
        }

        fn shutdown(&self, reason: &'static str) -> ! {
            panic!("shutdown: {}", reason)
        }
    }

    // Each counter is touched by one test only; tests run in parallel.
    static PLAIN_RUNS: AtomicU32 = AtomicU32::new(0);
    static GUARDED_RUNS: AtomicU32 = AtomicU32::new(0);
    static SAFE_RUNS: AtomicU32 = AtomicU32::new(0);

    fn plain(_ctx: &mut Context<'_>, _args: &[u32]) {
        PLAIN_RUNS.fetch_add(1, Ordering::SeqCst);
    }

    fn guarded(_ctx: &mut Context<'_>, _args: &[u32]) {
        GUARDED_RUNS.fetch_add(1, Ordering::SeqCst);
    }

    fn safe(_ctx: &mut Context<'_>, _args: &[u32]) {
        SAFE_RUNS.fetch_add(1, Ordering::SeqCst);
    }

    fn echo(ctx: &mut Context<'_>, args: &[u32]) {
        let bytes = args[0].to_le_bytes();
        ctx.send(&Message::new(0x10, &bytes)).unwrap();
    }

    static PLAIN: Command = Command::new(plain, CommandFlags::empty());
    static GUARDED: Command = Command::new(guarded, CommandFlags::empty());
    static SAFE: Command = Command::new(safe, CommandFlags::IN_SHUTDOWN);
    static ECHO: Command = Command::new(echo, CommandFlags::empty());

    #[test]
    fn test_handler_runs_and_mailbox_clears() {
        let shm = SharedMemory::new();
        let kick = CountingKick::default();
        let side = unsafe { shm.execution_side(&kick) };
        let mut peer = unsafe { shm.peer_side() };
        let console = Console::new(side.mailbox, side.responses);
        let sched = FakeSched::default();

        assert!(!console.task(&sched));

        peer.post(&ECHO, &[0x0403_0201]).unwrap();
        assert!(console.task(&sched));
        assert!(peer.mailbox_empty());
        assert!(!console.task(&sched), "nothing left to process");

        let mut buf = [0u8; MESSAGE_MAX];
        assert_eq!(peer.receive(&mut buf), Some(5));
        assert_eq!(&buf[..5], &[0x10, 1, 2, 3, 4]);
        assert_eq!(kick.count(), 1);
    }

    #[test]
    fn test_shutdown_filters_unsafe_commands() {
        let shm = SharedMemory::new();
        let kick = CountingKick::default();
        let side = unsafe { shm.execution_side(&kick) };
        let mut peer = unsafe { shm.peer_side() };
        let console = Console::new(side.mailbox, side.responses);
        let sched = FakeSched::default();
        sched.shutdown.set(true);

        peer.post(&GUARDED, &[]).unwrap();
        assert!(console.task(&sched));
        assert_eq!(GUARDED_RUNS.load(Ordering::SeqCst), 0);
        assert_eq!(sched.reports.get(), 1);
        assert!(peer.mailbox_empty(), "refused command still clears");

        let mut buf = [0u8; MESSAGE_MAX];
        assert_eq!(peer.receive(&mut buf), Some(1));
        assert_eq!(buf[0], 0xDD);

        peer.post(&SAFE, &[]).unwrap();
        assert!(console.task(&sched));
        assert_eq!(SAFE_RUNS.load(Ordering::SeqCst), 1);
        assert_eq!(sched.reports.get(), 1);
    }

    #[test]
    fn test_plain_command_runs_outside_shutdown() {
        let shm = SharedMemory::new();
        let kick = CountingKick::default();
        let side = unsafe { shm.execution_side(&kick) };
        let peer = unsafe { shm.peer_side() };
        let console = Console::new(side.mailbox, side.responses);
        let sched = FakeSched::default();

        peer.post(&PLAIN, &[]).unwrap();
        console.task(&sched);
        assert_eq!(PLAIN_RUNS.load(Ordering::SeqCst), 1);
        assert_eq!(sched.reports.get(), 0);
    }

    #[test]
    fn test_shutdown_hook_clears_mailbox() {
        let shm = SharedMemory::new();
        let kick = CountingKick::default();
        let side = unsafe { shm.execution_side(&kick) };
        let peer = unsafe { shm.peer_side() };
        let console = Console::new(side.mailbox, side.responses);

        peer.post(&PLAIN, &[]).unwrap();
        Lifecycle::shutdown(&console);
        assert!(peer.mailbox_empty());
        assert!(!console.task(&FakeSched::default()));
    }

    #[test]
    fn test_sendf_reports_drop() {
        let shm = SharedMemory::new();
        let kick = CountingKick::default();
        let side = unsafe { shm.execution_side(&kick) };
        let console = Console::new(side.mailbox, side.responses);

        for _ in 0..crate::config::SEND_SLOTS {
            console.sendf(&Message::new(1, b"")).unwrap();
        }
        assert!(matches!(
            console.sendf(&Message::new(2, b"")),
            Err(SendError::QueueFull { .. })
        ));
    }
}
