//! The control channel, i.e. everything that is addressed to service id `0`
use super::queue::{Message, MessageInbox};
use super::registry::ServiceRegistry;
use gate_abi::{ControlOp, ReturnCode};

pub(super) enum ControlReply {
    /// Nothing to do yet, the request stays pending and is retried next cycle
    Retry,
    /// A message was taken from the queue and should be delivered as the response
    Message(Message),
    Error(ReturnCode),
}

pub(super) fn dispatch(op: ControlOp, request: &[u8], registry: &ServiceRegistry) -> ControlReply {
    match op {
        ControlOp::PollMessage => poll_message(registry.inbox()),
        ControlOp::ListServices | ControlOp::SetNotifications => reserved(op, request),
    }
}

fn poll_message(inbox: &impl MessageInbox) -> ControlReply {
    match inbox.pop_front() {
        Some(message) => ControlReply::Message(message),
        None => ControlReply::Retry,
    }
}

fn reserved(op: ControlOp, request: &[u8]) -> ControlReply {
    log::warn!(
        "control operation {:?} ({} request bytes) is reserved but not implemented",
        op,
        request.len()
    );
    ControlReply::Error(ReturnCode::InvalidArg)
}
