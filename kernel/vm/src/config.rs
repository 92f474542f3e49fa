//! Runtime configuration of the call gate
use gate_abi::{CALLS_SIZE, MAX_PAYLOAD_LEN};
use regs::PAGE_SIZE;

/// Default number of asynchronous messages that may be queued before senders are turned away
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GateConfig {
    /// Offset of the register block inside the gates register page
    pub register_offset: usize,
    /// Largest response payload that is delivered to the guest.
    /// Longer responses are answered with an internal error.
    pub max_payload_len: usize,
    /// Maximum number of pending asynchronous messages
    pub queue_capacity: usize,
}

impl GateConfig {
    pub const fn new() -> Self {
        Self {
            register_offset: 0,
            max_payload_len: MAX_PAYLOAD_LEN,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub const fn with_register_offset(mut self, offset: usize) -> Self {
        self.register_offset = offset;
        self
    }

    pub const fn with_max_payload_len(mut self, len: usize) -> Self {
        self.max_payload_len = len;
        self
    }

    pub const fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Check the configuration for values the gate cannot work with.
    ///
    /// # Panics
    /// A broken configuration is a host bug, so this panics instead of returning an error.
    pub(crate) fn validate(&self) {
        assert!(
            self.register_offset + CALLS_SIZE <= PAGE_SIZE,
            "register block at {:#x} does not fit into its page",
            self.register_offset
        );
        assert!(
            self.max_payload_len <= u32::MAX as usize,
            "max_payload_len must be representable in a register"
        );
        assert!(self.queue_capacity > 0, "the message queue needs capacity");
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::new()
    }
}
