//! Queue of asynchronous messages that services push towards the guest.
//!
//! The queue has two sides which are kept apart by the type system:
//! - [`Sender`]s implement [`MessageSender`] and can only append.
//!   They may live in any execution context, e.g. a host timer thread.
//! - The [`MessageQueue`] itself implements [`MessageInbox`] and is only used by the gates control channel to take
//!   messages out again.
//!
//! The queue is bounded. Once `capacity` messages are pending, further sends are rejected with
//! [`SendError::QueueFull`] and the sender decides whether to drop or retry its message.
//! Payloads that the gate could never deliver because they exceed the maximum payload length are rejected with
//! [`SendError::TooLarge`] right away.
use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;
use gate_abi::{ServiceId, MAX_PAYLOAD_LEN};
use ksync::SpinLock;
use thiserror_no_std::Error;

/// An asynchronous message together with the id of the service that sent it
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Message {
    pub origin: ServiceId,
    pub payload: Vec<u8>,
}

#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum SendError {
    #[error("the message queue already holds its maximum of {capacity} messages")]
    QueueFull { capacity: usize },
    #[error("a payload of {len} bytes exceeds the maximum payload length of {max}")]
    TooLarge { len: usize, max: usize },
}

/// The producing side of the message queue
pub trait MessageSender {
    /// The service id that is attached to every message sent through this sender
    fn service(&self) -> ServiceId;

    /// Append a message to the tail of the queue.
    ///
    /// Never blocks for longer than it takes to push onto the queue.
    fn send(&self, payload: Vec<u8>) -> Result<(), SendError>;
}

/// The consuming side of the message queue
pub trait MessageInbox {
    /// Remove and return the oldest message
    fn pop_front(&self) -> Option<Message>;

    /// Put a message that was taken with [`pop_front`](MessageInbox::pop_front) but could not be delivered back to
    /// the front of the queue.
    ///
    /// This ignores the capacity since the message was already accounted for when it was sent.
    fn restore_front(&self, message: Message);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
struct QueueState {
    messages: VecDeque<Message>,
    capacity: usize,
    max_payload_len: usize,
}

/// A bounded FIFO of [`Message`]s shared between services and the call gate
#[derive(Debug)]
pub struct MessageQueue {
    state: Arc<SpinLock<QueueState>>,
}

impl MessageQueue {
    /// Create a queue for payloads of up to [`MAX_PAYLOAD_LEN`] bytes
    pub fn new(capacity: usize) -> Self {
        Self::with_limits(capacity, MAX_PAYLOAD_LEN)
    }

    pub fn with_limits(capacity: usize, max_payload_len: usize) -> Self {
        assert!(capacity > 0, "a message queue needs capacity");
        Self {
            state: Arc::new(SpinLock::new(QueueState {
                messages: VecDeque::new(),
                capacity,
                max_payload_len,
            })),
        }
    }

    /// Create a sender that attaches `service` to every message it sends.
    ///
    /// The service does not have to be registered (yet).
    pub fn sender(&self, service: ServiceId) -> Sender {
        Sender {
            service,
            state: self.state.clone(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.state.with(|state| state.capacity)
    }
}

impl MessageInbox for MessageQueue {
    fn pop_front(&self) -> Option<Message> {
        self.state.with(|state| state.messages.pop_front())
    }

    fn restore_front(&self, message: Message) {
        self.state.with(|state| state.messages.push_front(message))
    }

    fn len(&self) -> usize {
        self.state.with(|state| state.messages.len())
    }
}

/// A capability for pushing asynchronous messages to the guest on behalf of one service
#[derive(Debug, Clone)]
pub struct Sender {
    service: ServiceId,
    state: Arc<SpinLock<QueueState>>,
}

impl MessageSender for Sender {
    fn service(&self) -> ServiceId {
        self.service
    }

    fn send(&self, payload: Vec<u8>) -> Result<(), SendError> {
        let result = self.state.with(|state| {
            if payload.len() > state.max_payload_len {
                return Err(SendError::TooLarge {
                    len: payload.len(),
                    max: state.max_payload_len,
                });
            }
            if state.messages.len() >= state.capacity {
                return Err(SendError::QueueFull {
                    capacity: state.capacity,
                });
            }
            state.messages.push_back(Message {
                origin: self.service,
                payload,
            });
            Ok(())
        });
        if let Err(e) = &result {
            log::warn!("rejected message from service {}: {}", self.service, e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use alloc::vec;
    use std::thread;

    fn id(raw: u32) -> ServiceId {
        ServiceId::new(raw).unwrap()
    }

    #[test]
    fn messages_come_out_in_send_order() {
        let queue = MessageQueue::new(8);
        let a = queue.sender(id(1));
        let b = queue.sender(id(2));
        a.send(vec![1]).unwrap();
        b.send(vec![2]).unwrap();
        a.send(vec![3]).unwrap();

        let order: Vec<_> = core::iter::from_fn(|| queue.pop_front())
            .map(|m| (m.origin.get(), m.payload[0]))
            .collect();
        assert_eq!(order, [(1, 1), (2, 2), (1, 3)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn full_queue_rejects_sends() {
        let queue = MessageQueue::new(2);
        let sender = queue.sender(id(4));
        sender.send(vec![]).unwrap();
        sender.send(vec![]).unwrap();
        assert_eq!(
            sender.send(vec![]),
            Err(SendError::QueueFull { capacity: 2 })
        );
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let queue = MessageQueue::with_limits(4, 3);
        let sender = queue.sender(id(4));
        assert_eq!(
            sender.send(vec![0; 4]),
            Err(SendError::TooLarge { len: 4, max: 3 })
        );
        sender.send(vec![0; 3]).unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn restored_message_is_next_again() {
        let queue = MessageQueue::new(1);
        let sender = queue.sender(id(5));
        sender.send(vec![7]).unwrap();
        let message = queue.pop_front().unwrap();
        queue.restore_front(message.clone());
        assert_eq!(queue.pop_front(), Some(message));
    }

    #[test]
    fn senders_work_from_other_threads() {
        let queue = MessageQueue::new(64);
        let handles: Vec<_> = (1..=4)
            .map(|raw| {
                let sender = queue.sender(id(raw));
                thread::spawn(move || {
                    for i in 0..8u8 {
                        sender.send(vec![i]).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.len(), 32);
        // messages of one sender keep their relative order
        let mut last = [None::<u8>; 5];
        while let Some(message) = queue.pop_front() {
            let slot = &mut last[message.origin.get() as usize];
            assert!(slot.map_or(true, |prev| prev < message.payload[0]));
            *slot = Some(message.payload[0]);
        }
    }
}
