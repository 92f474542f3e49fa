//! The memory mapped call gate
//!
//! The gate owns a page that holds its register block (see [`gate_abi::layout`]).
//! Once per cycle the cpu loop calls [`CallGate::tick`] which looks at the `control` register and, if a request is
//! pending, processes it:
//!
//! 1. Copy the request payload out of guest memory
//! 2. Dispatch it to the control channel or to the registered service
//! 3. Report the result through the response registers and copy the response payload into guest memory
//!
//! Only a fully successful call clears `control` again.
//! Errors leave it pending until the guest acknowledges them by clearing it itself.

mod control;
pub mod queue;
pub mod registry;
pub mod service;

pub use queue::{Message, MessageInbox, MessageQueue, MessageSender, SendError, Sender};
pub use registry::ServiceRegistry;
pub use service::Service;

use crate::config::GateConfig;
use crate::excep::Exception;
use crate::mem::{offset_addr, PhysicalMemory};
use alloc::boxed::Box;
use alloc::vec::Vec;
use control::ControlReply;
use gate_abi::layout::{CONTROL, RESPONSE_CODE, RESPONSE_LEN, SERVICE};
use gate_abi::{CallRequest, CallResult, CallTarget, ErrorCode, ReturnCode, ServiceId};
use regs::{Page, PageOffset};

/// What a single [`CallGate::tick`] did
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TickOutcome {
    /// No request was pending
    Idle,
    /// The request cannot make progress yet.
    /// No register was touched and the same request is processed again during the next tick.
    Retry,
    /// The request completed and the gate is idle again
    Completed,
    /// The request failed with the given code which has been written to `response_code`.
    /// The gate stays pending until the guest clears `control`.
    Failed(ErrorCode),
}

/// The result of dispatching a request, before it is reported back to the guest
enum Dispatched {
    Reply(CallResult<Vec<u8>>),
    Message(Message),
}

pub struct CallGate {
    page: Page,
    config: GateConfig,
    registry: ServiceRegistry,
}

impl CallGate {
    /// Create a new idle gate.
    ///
    /// # Panics
    /// Panics if `config` is not usable, e.g. because the register block does not fit into its page.
    pub fn new(config: GateConfig) -> Self {
        config.validate();
        Self {
            page: Page::new(),
            config,
            registry: ServiceRegistry::new(MessageQueue::with_limits(
                config.queue_capacity,
                config.max_payload_len,
            )),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Register `service` under `id`, replacing any earlier registration.
    ///
    /// Services should be registered before the guest starts running.
    pub fn register(&mut self, id: ServiceId, service: impl Service + 'static) {
        self.registry.register(id, Box::new(service))
    }

    /// Register `service` under a raw id.
    ///
    /// # Panics
    /// Panics if `id` is `0` since that is the control channel.
    pub fn register_raw(&mut self, id: u32, service: impl Service + 'static) {
        self.registry.register_raw(id, Box::new(service))
    }

    /// A sender that lets the service with the given id push asynchronous messages to the guest
    pub fn sender(&self, id: ServiceId) -> Sender {
        self.registry.sender(id)
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Number of asynchronous messages that have not been polled yet
    pub fn pending_messages(&self) -> usize {
        self.registry.inbox().len()
    }

    /// Read-only view of the register block
    pub fn registers(&self) -> PageOffset<&Page> {
        PageOffset::new(&self.page, self.config.register_offset)
    }

    /// Writable view of the register block, used by the cpu when the guest accesses the gates registers
    pub fn registers_mut(&mut self) -> PageOffset<&mut Page> {
        PageOffset::new(&mut self.page, self.config.register_offset)
    }

    /// The whole page that contains the register block
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Process the pending request, if there is one.
    ///
    /// Faults while copying request or response payloads abort the tick and are returned as `Err`.
    /// In that case `control` stays pending and nothing is reported to the guest, except for response bytes that were
    /// already copied before the fault.
    ///
    /// A poll that takes a message overwrites `service` with the messages origin before the response is written.
    /// If the delivery then fails with [`ReturnCode::BufferTooSmall`] or a fault, the message is kept but `service`
    /// still names its origin. Ticking again without rewriting the registers therefore calls that service instead of
    /// polling, so the guest has to issue the poll again.
    pub fn tick<M>(&mut self, mem: &mut M) -> Result<TickOutcome, Exception>
    where
        M: PhysicalMemory + ?Sized,
    {
        let control = CONTROL.read(&self.registers());
        if control == 0 {
            return Ok(TickOutcome::Idle);
        }

        let request = CallRequest::read_from(&self.registers());
        let payload = copy_in(mem, request.request_addr, request.request_len)?;
        let target = CallTarget::decode(control, request.service);
        log::trace!(
            "dispatching call to {:?} with {} request bytes",
            target,
            payload.len()
        );

        let dispatched = match target {
            CallTarget::Service(id) => Dispatched::Reply(self.call_service(id, &payload)),
            CallTarget::Control(op) => match control::dispatch(op, &payload, &self.registry) {
                ControlReply::Retry => return Ok(TickOutcome::Retry),
                ControlReply::Error(code) => Dispatched::Reply(Err(code.into())),
                ControlReply::Message(message) => {
                    SERVICE.write(&mut self.registers_mut(), message.origin.get());
                    Dispatched::Message(message)
                }
            },
            CallTarget::UnknownControl(code) => {
                log::warn!("unknown control operation {}", code);
                Dispatched::Reply(Err(ReturnCode::InvalidArg.into()))
            }
        };

        let outcome = match &dispatched {
            Dispatched::Reply(Ok(response)) => self.respond(mem, &request, response),
            Dispatched::Reply(Err(code)) => Ok(self.fail(*code)),
            Dispatched::Message(message) => self.respond(mem, &request, &message.payload),
        };

        if let Dispatched::Message(message) = dispatched {
            self.settle_message(message, &outcome);
        }

        log::debug!("call to {:?} finished with {:?}", target, outcome);
        outcome
    }

    /// Decide what happens to a polled message after the attempt to deliver it.
    ///
    /// A message that did not fit into the guests buffer or whose delivery faulted goes back to the front of the queue.
    /// Any other failure can never turn into a delivery, so the message is dropped instead of blocking the queue.
    fn settle_message(&self, message: Message, outcome: &Result<TickOutcome, Exception>) {
        match outcome {
            Ok(TickOutcome::Completed) => {}
            Ok(TickOutcome::Failed(code))
                if code.as_return_code() != Some(ReturnCode::BufferTooSmall) =>
            {
                log::warn!(
                    "dropping undeliverable message of {} bytes from service {}: {}",
                    message.payload.len(),
                    message.origin,
                    code
                );
            }
            _ => self.registry.inbox().restore_front(message),
        }
    }

    fn call_service(&mut self, id: ServiceId, request: &[u8]) -> CallResult<Vec<u8>> {
        match self.registry.lookup(id) {
            Some(service) => service.handle(request),
            None => Err(ReturnCode::NotFound.into()),
        }
    }

    /// Report a successful dispatch to the guest
    fn respond<M>(
        &mut self,
        mem: &mut M,
        request: &CallRequest,
        response: &[u8],
    ) -> Result<TickOutcome, Exception>
    where
        M: PhysicalMemory + ?Sized,
    {
        if response.len() > self.config.max_payload_len {
            log::warn!(
                "response of {} bytes exceeds the maximum payload length of {}",
                response.len(),
                self.config.max_payload_len
            );
            return Ok(self.fail(ReturnCode::InternalError.into()));
        }

        // the length is reported even if it does not fit so that the guest can learn the required buffer size
        let response_len = response.len() as u32;
        RESPONSE_LEN.write(&mut self.registers_mut(), response_len);
        if response_len > request.response_size {
            return Ok(self.fail(ReturnCode::BufferTooSmall.into()));
        }

        copy_out(mem, request.response_addr, response)?;

        let mut regs = self.registers_mut();
        RESPONSE_CODE.write(&mut regs, 0);
        // the only transition back to idle
        CONTROL.write(&mut regs, 0);
        Ok(TickOutcome::Completed)
    }

    /// Report an error to the guest.
    ///
    /// `control` is deliberately left untouched, the guest has to acknowledge the error by clearing it.
    fn fail(&mut self, code: ErrorCode) -> TickOutcome {
        RESPONSE_CODE.write(&mut self.registers_mut(), code.get());
        TickOutcome::Failed(code)
    }
}

impl Default for CallGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}

/// Copy `len` bytes starting at `addr` out of guest memory.
///
/// The buffer grows while copying so that a bogus length faults at the end of guest memory instead of reserving a huge
/// allocation up front.
fn copy_in<M>(mem: &M, addr: u32, len: u32) -> Result<Vec<u8>, Exception>
where
    M: PhysicalMemory + ?Sized,
{
    let mut buf = Vec::new();
    for i in 0..len as usize {
        buf.push(mem.read_byte(offset_addr(addr, i)?)?);
    }
    Ok(buf)
}

/// Copy `data` into guest memory byte by byte, starting at `addr`
fn copy_out<M>(mem: &mut M, addr: u32, data: &[u8]) -> Result<(), Exception>
where
    M: PhysicalMemory + ?Sized,
{
    for (i, byte) in data.iter().enumerate() {
        mem.write_byte(offset_addr(addr, i)?, *byte)?;
    }
    Ok(())
}
