//! Layout of the call gate register block
use regs::{PAGE_SIZE, RO, RW};
use static_assertions::const_assert;

/// 0 = idle, non-zero = pending request
pub const CONTROL: RW<u8> = RW::at(0x00);
/// Target of the request. Overwritten with the origin of a polled message.
pub const SERVICE: RW<u32> = RW::at(0x04);
pub const REQUEST_ADDR: RO<u32> = RO::at(0x08);
pub const REQUEST_LEN: RO<u32> = RO::at(0x0c);
pub const RESPONSE_ADDR: RO<u32> = RO::at(0x10);
/// Capacity of the response buffer
pub const RESPONSE_SIZE: RO<u32> = RO::at(0x14);
pub const RESPONSE_CODE: RW<i32> = RW::at(0x18);
pub const RESPONSE_LEN: RW<u32> = RW::at(0x1c);

/// Total size of the register block in bytes
pub const CALLS_SIZE: usize = 0x20;

/// The largest response payload the gate will deliver to a guest
pub const MAX_PAYLOAD_LEN: usize = 4096;

const_assert!(RESPONSE_LEN.offset() + 4 == CALLS_SIZE);
const_assert!(CALLS_SIZE <= PAGE_SIZE);
const_assert!(MAX_PAYLOAD_LEN <= u32::MAX as usize);
