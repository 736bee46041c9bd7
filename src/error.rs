//! Error types for the fallible primitives.
//!
//! Only the allocator's errors are fatal, and only because its callers
//! choose to route them through `Scheduler::shutdown`. Send and post
//! errors describe a dropped message and leave all state untouched.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("heap exhausted: requested {requested} bytes, {available} available")]
    Exhausted { requested: usize, available: usize },
    #[error("no {item_size}-byte item fits in {available} bytes")]
    NoItemFits { item_size: usize, available: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("message of up to {max_size} bytes exceeds slot capacity {capacity}")]
    TooLarge { max_size: usize, capacity: usize },
    #[error("response slot {slot} still holds an unread message")]
    QueueFull { slot: usize },
    #[error("message for slot {slot} encoded to zero bytes")]
    Empty { slot: usize },
    #[error("response queue is already encoding a message")]
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PostError {
    #[error("mailbox still holds a pending command")]
    Busy,
    #[error("{given} argument words exceed mailbox capacity {capacity}")]
    TooManyArgs { given: usize, capacity: usize },
}
