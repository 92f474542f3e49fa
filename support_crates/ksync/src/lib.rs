//! Synchronisation Primitives
//!
//! The vm itself is single threaded, but host services may push data into it from other execution contexts.
//! Everything that is shared between those contexts is guarded by a [`SpinLock`].
#![no_std]

mod spin_lock;

pub use spin_lock::{Guard, SpinLock, WouldBlock};
