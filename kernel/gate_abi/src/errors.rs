use core::fmt::{Debug, Display, Formatter};
use core::num::NonZeroI32;
use thiserror_no_std::Error;

crate::back_to_enum! {
    /// Error codes produced by the gate itself.
    ///
    /// Services are free to answer with any other non-zero code, see [`ErrorCode`].
    #[repr(i32)]
    #[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
    pub enum ReturnCode: i32 {
        /// The response produced by a service exceeds the maximum payload length
        #[error("the response exceeds the maximum payload length")]
        InternalError = 1,
        /// The control operation is unknown or not implemented
        #[error("invalid argument")]
        InvalidArg = 2,
        /// No service is registered under the requested id
        #[error("no such service")]
        NotFound = 3,
        /// The guests response buffer cannot hold the response
        #[error("the response buffer is too small")]
        BufferTooSmall = 4,
    }
}

/// A non-zero response code as it is written into the `response_code` register
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct ErrorCode(NonZeroI32);

impl ErrorCode {
    /// Create an error code from its raw representation.
    ///
    /// Returns `None` for `0` because that is the success code.
    pub const fn new(raw: i32) -> Option<Self> {
        match NonZeroI32::new(raw) {
            Some(code) => Some(Self(code)),
            None => None,
        }
    }

    pub const fn get(self) -> i32 {
        self.0.get()
    }

    /// Interpret this code as one of the gates own [`ReturnCode`]s if possible
    pub fn as_return_code(self) -> Option<ReturnCode> {
        ReturnCode::try_from(self.get()).ok()
    }
}

impl From<ReturnCode> for ErrorCode {
    fn from(value: ReturnCode) -> Self {
        // all ReturnCode discriminants are non-zero
        Self(NonZeroI32::new(value as i32).unwrap_or(NonZeroI32::MIN))
    }
}

impl Debug for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self.as_return_code() {
            Some(code) => write!(f, "ErrorCode({:?})", code),
            None => write!(f, "ErrorCode({})", self.get()),
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self.as_return_code() {
            Some(code) => Display::fmt(&code, f),
            None => write!(f, "service error {}", self.get()),
        }
    }
}

/// The result of a call: the response payload or the error code reported to the guest
pub type CallResult<T> = Result<T, ErrorCode>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_codes_round_trip_through_raw_values() {
        assert_eq!(ReturnCode::try_from(3), Ok(ReturnCode::NotFound));
        assert_eq!(ReturnCode::try_from(0), Err(0));
        assert_eq!(ReturnCode::try_from(-7), Err(-7));
    }

    #[test]
    fn error_code_rejects_success() {
        assert_eq!(ErrorCode::new(0), None);
        assert_eq!(ErrorCode::new(-12).map(ErrorCode::get), Some(-12));
    }

    #[test]
    fn error_code_knows_gate_codes() {
        let code = ErrorCode::from(ReturnCode::BufferTooSmall);
        assert_eq!(code.get(), 4);
        assert_eq!(code.as_return_code(), Some(ReturnCode::BufferTooSmall));
        assert_eq!(ErrorCode::new(99).unwrap().as_return_code(), None);
    }
}
