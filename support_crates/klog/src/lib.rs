//! A `log` implementation for hosts that embed the vm.
//!
//! The logger itself does not know where its output goes.
//! It is handed a plain write function which allows it to be used without `std`.
#![no_std]

#[cfg(feature = "std")]
extern crate std;

mod kernel_logger;
pub mod print;

pub use kernel_logger::{format_record, KernelLogger, WriteFn};
