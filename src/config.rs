//! # Execution Core Configuration
//!
//! Compile-time constants for the shared-memory protocol, the timer pump
//! and the allocator. All limits are fixed at build time and must match
//! the peer core's build.

// ---------------------------------------------------------------------------
// Shared-memory protocol
// ---------------------------------------------------------------------------

/// Number of slots in the response queue (execution core → peer core).
pub const SEND_SLOTS: usize = 4;

/// Capacity in bytes of a single response slot.
pub const MESSAGE_MAX: usize = 64;

/// Number of 32-bit argument words carried with a mailbox command.
pub const COMMAND_ARGS: usize = 16;

/// Written by the peer core once it is waiting for this core to boot.
pub const SIGNAL_PEER_WAITING: u32 = 0xefef_efef;

/// Written by the execution core once the command table is published.
pub const SIGNAL_EXEC_READY: u32 = 0xabab_abab;

/// Response id used when reporting that shutdown is in progress.
pub const MSG_IS_SHUTDOWN: u8 = 0x01;

// ---------------------------------------------------------------------------
// Timer pump
// ---------------------------------------------------------------------------

/// Ticks added to the current counter when rearming on init/shutdown.
/// Keeps a pending compare from being lost across reconfiguration.
pub const TIMER_REARM_MARGIN: u32 = 50;

/// Cycles to wait after clearing the compare status before acknowledging
/// the event controller.
pub const TIMER_SETTLE_CYCLES: u32 = 4;

/// System event raised by a compare match on the timer block.
pub const TIMER_EVENT: u32 = 7;

/// System event raised by the peer core to kick this core.
pub const KICK_IN_EVENT: u32 = 17;

/// System event this core raises to kick the peer core.
pub const KICK_OUT_EVENT: u32 = 16;

/// Host interrupt line both events are routed to.
pub const HOST_IRQ: u32 = 1;

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// Bytes kept free below the top of RAM for the main stack. The heap may
/// never grow into this area.
pub const STACK_RESERVE: usize = 256;

/// Base address of the region shared with the peer core.
pub const SHARED_MEM_BASE: usize = 0x2001_0000;

/// Base address of the compare timer block.
pub const TIMER_BASE: usize = 0x4002_e000;

/// Base address of the event (interrupt) controller.
pub const INTC_BASE: usize = 0x4002_0000;
