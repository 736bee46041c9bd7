//! # execore: Execution-Core Firmware
//!
//! Firmware for the real-time core of a dual-core controller. A peer core
//! posts commands into a shared-memory mailbox; this core runs them, writes
//! responses into a small ring of send slots, and keeps a compare timer
//! armed for the timed-event queue.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │              Command handlers (firmware)                │
//! ├────────────────────────────────────────────────────────┤
//! │              Kernel / Executive (kernel.rs)             │
//! │        start() · step() · shutdown() · report()         │
//! ├──────────────┬──────────────────┬──────────────────────┤
//! │  Console     │  Timer pump      │  Handshake           │
//! │  console.rs  │  timer.rs        │  handshake.rs        │
//! │  ─ task()    │  ─ irq_poll()    │  ─ boot()            │
//! │  ─ sendf()   │  ─ read_time()   │  ─ enter_shutdown()  │
//! ├──────────────┴──────────────────┴──────────────────────┤
//! │   Shared memory (shared.rs) · Heap (heap.rs) · Gate     │
//! │   Mailbox · ResponseQueue     · bump alloc · sync.rs    │
//! ├────────────────────────────────────────────────────────┤
//! │            Arch Port (arch/cortex_m4.rs)                │
//! │     Compare timer · Event controller · Peer kick        │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory Model
//!
//! - **No `alloc`**: pure `core`; the bump [`heap::Heap`] hands out
//!   zeroed blocks that are never freed
//! - **One writer per field**: every shared-memory field is owned by one
//!   core at a time, and the handles in [`shared`] encode that ownership
//! - **Flag ordering**: payloads are written before the flag that publishes
//!   them, and read after the flag that announces them
//!
//! Everything except `arch::cortex_m4` register access and the `sync`
//! primitives builds and tests on the host.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod command;
pub mod config;
pub mod console;
pub mod error;
pub mod handshake;
pub mod heap;
pub mod kernel;
pub mod resource_table;
pub mod sched;
pub mod shared;
pub mod sync;
pub mod timer;
