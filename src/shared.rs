//! # Shared-Memory Channel
//!
//! The one region both cores can see, and the handles that divide its
//! fields between them. Every field has exactly one writer:
//!
//! | Field                 | Written by        | Handle            |
//! |-----------------------|-------------------|-------------------|
//! | `signal`              | peer, then exec   | `PeerSide` / `Handshake` |
//! | published table/addr  | exec, once        | `Handshake`       |
//! | `next_command` + args | peer posts, exec clears | `PeerSide` / `Mailbox` |
//! | slot body + `count>0` | exec              | `ResponseQueue`   |
//! | slot `count=0`        | peer              | `PeerSide`        |
//! | `send_push_pos`       | exec only         | `ResponseQueue`   |
//!
//! Payloads are always written before the flag that announces them, with a
//! release barrier in between, and read only after an acquire on that flag.
//!
//! ```text
//!   peer                                 exec
//!   ────                                 ────
//!   args = ..                            ptr = next_command
//!   ─── release ───                      ─── acquire ───
//!   next_command = cmd   ───────────►    run cmd(args)
//!                        ◄───────────    next_command = null
//!
//!   count = 0 (drained)  ◄───────────    body = ..
//!                                        ─── release ───
//!                                        count = len, kick
//! ```

use core::cell::{Cell, UnsafeCell};
use core::marker::PhantomData;
use core::ptr;
use core::sync::atomic::{fence, AtomicPtr, AtomicU32, Ordering};

use crate::arch::KickLine;
use crate::command::{Command, Encode};
use crate::config::{COMMAND_ARGS, MESSAGE_MAX, SEND_SLOTS, SIGNAL_EXEC_READY, SIGNAL_PEER_WAITING};
use crate::error::{PostError, SendError};

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// One response slot. `count == 0` means free.
#[repr(C)]
pub struct SendSlot {
    count: AtomicU32,
    data: UnsafeCell<[u8; MESSAGE_MAX]>,
}

impl SendSlot {
    #[allow(clippy::declare_interior_mutable_const)]
    const EMPTY: Self = Self {
        count: AtomicU32::new(0),
        data: UnsafeCell::new([0; MESSAGE_MAX]),
    };
}

/// The region shared with the peer core.
#[repr(C)]
pub struct SharedMemory {
    signal: AtomicU32,
    command_index: AtomicPtr<Command>,
    command_index_size: AtomicU32,
    shutdown_handler: AtomicPtr<Command>,
    next_command: AtomicPtr<Command>,
    next_command_args: UnsafeCell<[u32; COMMAND_ARGS]>,
    send_push_pos: AtomicU32,
    send_data: [SendSlot; SEND_SLOTS],
}

// Safety: the `UnsafeCell` payloads are only touched by the side that owns
// them according to the flag guarding them (see the module table).
unsafe impl Sync for SharedMemory {}

impl SharedMemory {
    /// A zeroed region, as left by reset.
    pub const fn new() -> Self {
        Self {
            signal: AtomicU32::new(0),
            command_index: AtomicPtr::new(ptr::null_mut()),
            command_index_size: AtomicU32::new(0),
            shutdown_handler: AtomicPtr::new(ptr::null_mut()),
            next_command: AtomicPtr::new(ptr::null_mut()),
            next_command_args: UnsafeCell::new([0; COMMAND_ARGS]),
            send_push_pos: AtomicU32::new(0),
            send_data: [SendSlot::EMPTY; SEND_SLOTS],
        }
    }

    /// The execution core's handles.
    ///
    /// # Safety
    /// Call at most once per region. A second set of handles would break the
    /// single-writer rule for every field they own.
    pub unsafe fn execution_side<K: KickLine>(&self, kick: K) -> ExecutionSide<'_, K> {
        ExecutionSide {
            handshake: Handshake { shm: self },
            mailbox: Mailbox { shm: self },
            responses: ResponseQueue { shm: self, kick },
        }
    }

    /// The peer core's handle.
    ///
    /// # Safety
    /// Call at most once per region, and only where the peer is simulated
    /// on this side.
    pub unsafe fn peer_side(&self) -> PeerSide<'_> {
        PeerSide {
            shm: self,
            pull_pos: 0,
            _unsync: PhantomData,
        }
    }
}

impl Default for SharedMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the execution core may write in the shared region.
pub struct ExecutionSide<'a, K: KickLine> {
    pub handshake: Handshake<'a>,
    pub mailbox: Mailbox<'a>,
    pub responses: ResponseQueue<'a, K>,
}

// ---------------------------------------------------------------------------
// Handshake (write-once)
// ---------------------------------------------------------------------------

/// Write-once access to the boot fields. Publishing consumes the handle.
pub struct Handshake<'a> {
    shm: &'a SharedMemory,
}

impl<'a> Handshake<'a> {
    /// Whether the peer has announced it is waiting for this core.
    pub fn peer_waiting(&self) -> bool {
        self.shm.signal.load(Ordering::Acquire) == SIGNAL_PEER_WAITING
    }

    /// Publish the command table and the shutdown-request descriptor, then
    /// signal readiness. The fields are final before the signal is visible.
    pub fn publish(self, commands: &'static [Command], shutdown_request: &'static Command) {
        let shm = self.shm;
        shm.command_index
            .store(commands.as_ptr() as *mut Command, Ordering::Relaxed);
        shm.command_index_size
            .store(commands.len() as u32, Ordering::Relaxed);
        shm.shutdown_handler
            .store(shutdown_request as *const Command as *mut Command, Ordering::Relaxed);
        fence(Ordering::Release);
        shm.signal.store(SIGNAL_EXEC_READY, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Mailbox (peer → exec)
// ---------------------------------------------------------------------------

/// Consumer end of the single-slot command mailbox.
pub struct Mailbox<'a> {
    shm: &'a SharedMemory,
}

impl<'a> Mailbox<'a> {
    /// Take the pending command, if any. The mailbox stays occupied until
    /// [`Posted::complete`] (or [`Mailbox::clear`]) releases it.
    pub fn poll(&mut self) -> Option<Posted<'_>> {
        let cmd = self.shm.next_command.load(Ordering::Relaxed);
        if cmd.is_null() {
            return None;
        }
        // Args were written before the pointer; don't read them early.
        fence(Ordering::Acquire);
        // Safety: the peer only posts descriptors it read from the published
        // table, which is `'static`. The args are ours until we clear.
        let (command, args) = unsafe { (&*cmd, &*self.shm.next_command_args.get()) };
        Some(Posted {
            slot: &self.shm.next_command,
            command,
            args,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.shm.next_command.load(Ordering::Relaxed).is_null()
    }

    /// Drop whatever is pending so it is never processed.
    pub fn clear(&mut self) {
        self.shm.next_command.store(ptr::null_mut(), Ordering::Release);
    }
}

/// A command taken from the mailbox.
pub struct Posted<'m> {
    slot: &'m AtomicPtr<Command>,
    pub command: &'static Command,
    args: &'m [u32; COMMAND_ARGS],
}

impl<'m> Posted<'m> {
    pub fn args(&self) -> &[u32] {
        self.args
    }

    /// Hand the mailbox back to the peer.
    pub fn complete(self) {
        self.slot.store(ptr::null_mut(), Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Response queue (exec → peer)
// ---------------------------------------------------------------------------

/// Producer end of the response ring. Never blocks: a message that does
/// not fit, or that finds its slot still occupied, is dropped.
pub struct ResponseQueue<'a, K: KickLine> {
    shm: &'a SharedMemory,
    kick: K,
}

impl<'a, K: KickLine> ResponseQueue<'a, K> {
    /// Slot the next message will go to.
    pub fn push_pos(&self) -> usize {
        self.shm.send_push_pos.load(Ordering::Relaxed) as usize
    }

    pub fn send(&mut self, msg: &dyn Encode) -> Result<(), SendError> {
        let max_size = msg.max_size();
        if max_size > MESSAGE_MAX {
            return Err(SendError::TooLarge {
                max_size,
                capacity: MESSAGE_MAX,
            });
        }

        let pos = self.push_pos();
        let slot = &self.shm.send_data[pos];
        if slot.count.load(Ordering::Acquire) != 0 {
            return Err(SendError::QueueFull { slot: pos });
        }

        // Safety: `count == 0`, so the peer has released this slot's body.
        let buf = unsafe { &mut (&mut *slot.data.get())[..max_size] };
        let len = msg.encode(buf).min(max_size);
        if len == 0 {
            // A zero count would read as a free slot; nothing to announce.
            return Err(SendError::Empty { slot: pos });
        }

        slot.count.store(len as u32, Ordering::Release);
        self.kick.kick();
        self.shm
            .send_push_pos
            .store(((pos + 1) % SEND_SLOTS) as u32, Ordering::Relaxed);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Peer view
// ---------------------------------------------------------------------------

/// The peer core's side of the protocol.
///
/// Posting writes the argument buffer through `&self`, so the handle may
/// move to another thread but never be shared between two.
pub struct PeerSide<'a> {
    shm: &'a SharedMemory,
    pull_pos: usize,
    _unsync: PhantomData<Cell<()>>,
}

impl<'a> PeerSide<'a> {
    pub fn announce_waiting(&self) {
        self.shm.signal.store(SIGNAL_PEER_WAITING, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.shm.signal.load(Ordering::Acquire) == SIGNAL_EXEC_READY
    }

    /// The published command table. `None` until the ready signal is seen.
    pub fn commands(&self) -> Option<&'static [Command]> {
        if !self.is_ready() {
            return None;
        }
        let base = self.shm.command_index.load(Ordering::Relaxed);
        let len = self.shm.command_index_size.load(Ordering::Relaxed) as usize;
        // Safety: published from a `&'static [Command]` before the signal.
        Some(unsafe { core::slice::from_raw_parts(base, len) })
    }

    /// The published shutdown-request descriptor. `None` until ready.
    pub fn shutdown_handler(&self) -> Option<&'static Command> {
        if !self.is_ready() {
            return None;
        }
        let cmd = self.shm.shutdown_handler.load(Ordering::Relaxed);
        // Safety: published from a `&'static Command` before the signal.
        unsafe { cmd.as_ref() }
    }

    pub fn mailbox_empty(&self) -> bool {
        self.shm.next_command.load(Ordering::Acquire).is_null()
    }

    /// Post a command. Unused argument words are zeroed.
    pub fn post(&self, command: &'static Command, args: &[u32]) -> Result<(), PostError> {
        if args.len() > COMMAND_ARGS {
            return Err(PostError::TooManyArgs {
                given: args.len(),
                capacity: COMMAND_ARGS,
            });
        }
        if !self.mailbox_empty() {
            return Err(PostError::Busy);
        }
        // Safety: the mailbox is empty, so the execution core is done with
        // the argument buffer.
        let buf = unsafe { &mut *self.shm.next_command_args.get() };
        buf[..args.len()].copy_from_slice(args);
        buf[args.len()..].fill(0);
        self.shm
            .next_command
            .store(command as *const Command as *mut Command, Ordering::Release);
        Ok(())
    }

    /// Occupancy of slot `index` as the peer sees it.
    pub fn slot_count(&self, index: usize) -> u32 {
        self.shm.send_data[index].count.load(Ordering::Acquire)
    }

    /// Copy the oldest unread response into `buf` and free its slot.
    /// Returns the message length.
    pub fn receive(&mut self, buf: &mut [u8]) -> Option<usize> {
        let slot = &self.shm.send_data[self.pull_pos];
        let count = slot.count.load(Ordering::Acquire) as usize;
        if count == 0 {
            return None;
        }
        // Safety: `count != 0`, so the body is complete and ours to read.
        let data = unsafe { &*slot.data.get() };
        let len = count.min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        slot.count.store(0, Ordering::Release);
        self.pull_pos = (self.pull_pos + 1) % SEND_SLOTS;
        Some(count)
    }
}
