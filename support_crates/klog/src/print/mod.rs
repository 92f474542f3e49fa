//! Ready-made write functions for [`KernelLogger`](crate::KernelLogger)
#[cfg(feature = "std")]
use core::fmt;

/// Write to the standard error stream of the host process
#[cfg(feature = "std")]
pub fn stderr(args: fmt::Arguments) {
    use std::io::Write;
    // logging must never bring the vm down, so write errors are dropped
    let _ = std::io::stderr().lock().write_fmt(args);
}
