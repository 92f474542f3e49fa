use thiserror_no_std::Error;

/// A fault raised while accessing guest memory.
///
/// Faults abort whatever the vm was doing during the current cycle and are handed to the cpu loop which decides
/// whether the guest is trapped or halted.
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum Exception {
    /// The address is not backed by a mapped page
    #[error("guest address {addr:#010x} is out of range")]
    OutOfRange { addr: u32 },
    /// The page backing the address does not permit the access
    #[error("guest address {addr:#010x} does not permit this access")]
    Protection { addr: u32 },
}

impl Exception {
    /// The guest address that caused the fault
    pub fn addr(&self) -> u32 {
        match *self {
            Exception::OutOfRange { addr } | Exception::Protection { addr } => addr,
        }
    }
}
