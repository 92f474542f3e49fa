//! Guest memory and the memory mapped call gate of the virtual machine.
//!
//! The [`CallGate`] is how guest programs reach host implemented services.
//! It is driven by the cpu loop which calls [`CallGate::tick`] (usually via [`Machine::tick`]) exactly once per
//! virtual cycle.
//! See the [`gate_abi`] crate for the register protocol the guest side speaks.
#![no_std]

extern crate alloc;

pub mod calls;
pub mod config;
mod excep;
pub mod machine;
pub mod mem;

pub use calls::{CallGate, TickOutcome};
pub use config::GateConfig;
pub use excep::Exception;
pub use machine::Machine;
pub use mem::{PageFlags, PhysMemory, PhysicalMemory};
