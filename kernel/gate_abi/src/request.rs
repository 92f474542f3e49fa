//! Guest side view of the register block.
//!
//! These types describe what a guest writes into the register block to issue a call and what it reads back once the
//! gate has processed it.
use crate::control::ControlOp;
use crate::errors::ErrorCode;
use crate::layout;
use crate::service_id::ServiceId;
use core::borrow::{Borrow, BorrowMut};
use regs::{Page, PageOffset};

/// A call as it is written into the register block by a guest
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CallRequest {
    /// Value of the `control` register. Must not be `0` for the request to be picked up.
    pub control: u8,
    /// Raw target service id, `0` addresses the control channel
    pub service: u32,
    pub request_addr: u32,
    pub request_len: u32,
    pub response_addr: u32,
    pub response_size: u32,
}

impl CallRequest {
    /// A call to a registered service
    pub fn service(
        service: ServiceId,
        request_addr: u32,
        request_len: u32,
        response_addr: u32,
        response_size: u32,
    ) -> Self {
        Self {
            control: 1,
            service: service.get(),
            request_addr,
            request_len,
            response_addr,
            response_size,
        }
    }

    /// A control channel operation without request payload
    pub fn control(op: ControlOp, response_addr: u32, response_size: u32) -> Self {
        Self {
            control: op as u8,
            service: 0,
            request_addr: 0,
            request_len: 0,
            response_addr,
            response_size,
        }
    }

    /// Write the request into a register block.
    ///
    /// `control` is written last so that the request is only marked pending once it is complete.
    pub fn write_to<P: BorrowMut<Page>>(&self, regs: &mut PageOffset<P>) {
        layout::SERVICE.write(regs, self.service);
        regs.write_word(layout::REQUEST_ADDR.offset(), self.request_addr);
        regs.write_word(layout::REQUEST_LEN.offset(), self.request_len);
        regs.write_word(layout::RESPONSE_ADDR.offset(), self.response_addr);
        regs.write_word(layout::RESPONSE_SIZE.offset(), self.response_size);
        layout::CONTROL.write(regs, self.control);
    }

    /// Read a request back from a register block
    pub fn read_from<P: Borrow<Page>>(regs: &PageOffset<P>) -> Self {
        Self {
            control: layout::CONTROL.read(regs),
            service: layout::SERVICE.read(regs),
            request_addr: layout::REQUEST_ADDR.read(regs),
            request_len: layout::REQUEST_LEN.read(regs),
            response_addr: layout::RESPONSE_ADDR.read(regs),
            response_size: layout::RESPONSE_SIZE.read(regs),
        }
    }
}

/// The state of the register block as a guest observes it after a tick
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CallStatus {
    pub control: u8,
    pub service: u32,
    pub response_code: i32,
    pub response_len: u32,
}

impl CallStatus {
    pub fn read_from<P: Borrow<Page>>(regs: &PageOffset<P>) -> Self {
        Self {
            control: layout::CONTROL.read(regs),
            service: layout::SERVICE.read(regs),
            response_code: layout::RESPONSE_CODE.read(regs),
            response_len: layout::RESPONSE_LEN.read(regs),
        }
    }

    /// Whether the gate is idle and ready to accept a new request
    pub fn is_idle(&self) -> bool {
        self.control == 0
    }

    /// The error reported in the `response_code` register, if any
    pub fn error(&self) -> Option<ErrorCode> {
        ErrorCode::new(self.response_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReturnCode;

    #[test]
    fn request_lands_at_documented_offsets() {
        let mut page = Page::new();
        let id = ServiceId::new(7).unwrap();
        CallRequest::service(id, 0x100, 2, 0x200, 16).write_to(&mut PageOffset::new(&mut page, 0));

        assert_eq!(page.read_byte(0x00), 1);
        assert_eq!(page.read_word(0x04), 7);
        assert_eq!(page.read_word(0x08), 0x100);
        assert_eq!(page.read_word(0x0c), 2);
        assert_eq!(page.read_word(0x10), 0x200);
        assert_eq!(page.read_word(0x14), 16);
    }

    #[test]
    fn status_reports_errors() {
        let mut page = Page::new();
        page.write_byte(0x40, 1);
        page.write_word(0x40 + 0x18, ReturnCode::NotFound as i32 as u32);

        let status = CallStatus::read_from(&PageOffset::new(&page, 0x40));
        assert!(!status.is_idle());
        assert_eq!(
            status.error().and_then(ErrorCode::as_return_code),
            Some(ReturnCode::NotFound)
        );
    }
}
