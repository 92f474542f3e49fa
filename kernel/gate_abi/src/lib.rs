//! ABI definitions for calling host services through the call gate and interpreting its results
//!
//! # Register Block
//!
//! The call gate is driven through a block of memory mapped registers.
//! All offsets are relative to the start of the block and all words are 4 bytes wide and stored little-endian.
//!
//! | Offset | Register | Width | Meaning |
//! |:------:|----------|-------|---------|
//! | `0x00` | [control](layout::CONTROL) | byte | `0` = idle, anything else = a request is pending. Selects the [`ControlOp`] when the service id is `0` |
//! | `0x04` | [service](layout::SERVICE) | word | `0` = control channel, otherwise the [`ServiceId`] of the target service |
//! | `0x08` | [request_addr](layout::REQUEST_ADDR) | word | guest physical address of the request payload |
//! | `0x0c` | [request_len](layout::REQUEST_LEN) | word | length of the request payload |
//! | `0x10` | [response_addr](layout::RESPONSE_ADDR) | word | guest physical address that receives the response payload |
//! | `0x14` | [response_size](layout::RESPONSE_SIZE) | word | capacity of the guests response buffer |
//! | `0x18` | [response_code](layout::RESPONSE_CODE) | signed word | `0` = success, anything else is an error code |
//! | `0x1c` | [response_len](layout::RESPONSE_LEN) | word | length of the produced response payload |
//!
//! # Calling Conventions
//!
//! A guest fills in the request registers and then writes a non-zero value into `control`.
//! The gate processes the request during the next cycle.
//!
//! ## Success
//!
//! The response payload is copied into the response buffer, `response_len` and `response_code` (`0`) are written and
//! `control` is cleared back to `0`.
//!
//! ## Errors
//!
//! Only `response_code` is written (and `response_len` in the case of [`ReturnCode::BufferTooSmall`]).
//! `control` is **not** cleared.
//! The guest has to acknowledge the error by clearing `control` itself before it can issue the next call.
//!
//! ## Control Channel
//!
//! Requests addressed to service id `0` are handled by the gate itself, see [`ControlOp`].
//! [`ControlOp::PollMessage`] does not complete while no message is queued.
//! It stays pending without touching any register and is retried during the next cycle.

#![no_std]

macro_rules! back_to_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident: $repr:ty {
        $($(#[$vmeta:meta])* $vname:ident $(= $val:expr)?,)*
    }) => {
        $(#[$meta])*
        $vis enum $name {
            $($(#[$vmeta])* $vname $(= $val)?,)*
        }

        impl core::convert::TryFrom<$repr> for $name {
            type Error = $repr;

            fn try_from(v: $repr) -> Result<Self, Self::Error> {
                match v {
                    $(x if x == $name::$vname as $repr => Ok($name::$vname),)*
                    _ => Err(v),
                }
            }
        }
    }
}

pub(crate) use back_to_enum;

mod control;
mod errors;
pub mod layout;
mod request;
mod service_id;

pub use control::{CallTarget, ControlOp};
pub use errors::{CallResult, ErrorCode, ReturnCode};
pub use layout::{CALLS_SIZE, MAX_PAYLOAD_LEN};
pub use request::{CallRequest, CallStatus};
pub use service_id::ServiceId;
