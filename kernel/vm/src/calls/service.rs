use alloc::vec::Vec;
use gate_abi::CallResult;

/// A host implemented capability that guests can call through the gate.
///
/// `handle` is invoked synchronously from within a gate tick, so a slow service stalls the whole guest.
/// A service that wants to talk to the guest on its own should obtain a [`Sender`](super::Sender) for its id.
pub trait Service {
    /// Handle one request and produce the response payload or an error code for the guest.
    fn handle(&mut self, request: &[u8]) -> CallResult<Vec<u8>>;
}

impl<F> Service for F
where
    F: FnMut(&[u8]) -> CallResult<Vec<u8>>,
{
    fn handle(&mut self, request: &[u8]) -> CallResult<Vec<u8>> {
        self(request)
    }
}
