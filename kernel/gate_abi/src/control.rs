use crate::service_id::ServiceId;

crate::back_to_enum! {
    /// Operations of the control channel, selected by the value of the `control` register when the service id is `0`
    #[repr(u8)]
    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    pub enum ControlOp: u8 {
        /// Take the oldest queued asynchronous message.
        ///
        /// The response payload is the message payload and the `service` register is overwritten with the id of the
        /// service that sent it.
        PollMessage = 1,
        /// List the registered services (reserved)
        ListServices = 2,
        /// Enable or disable asynchronous messages of a service (reserved)
        SetNotifications = 3,
    }
}

/// Where a pending request is dispatched to
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CallTarget {
    /// A known control channel operation
    Control(ControlOp),
    /// A control channel request with an operation code that is not known
    UnknownControl(u8),
    /// A registered service
    Service(ServiceId),
}

impl CallTarget {
    /// Decode the target from the raw `control` and `service` register values.
    pub fn decode(control: u8, service: u32) -> Self {
        match ServiceId::new(service) {
            Some(id) => CallTarget::Service(id),
            None => match ControlOp::try_from(control) {
                Ok(op) => CallTarget::Control(op),
                Err(code) => CallTarget::UnknownControl(code),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_id_takes_precedence_over_control_op() {
        assert_eq!(
            CallTarget::decode(1, 7),
            CallTarget::Service(ServiceId::new(7).unwrap())
        );
    }

    #[test]
    fn control_ops_are_decoded() {
        assert_eq!(
            CallTarget::decode(1, 0),
            CallTarget::Control(ControlOp::PollMessage)
        );
        assert_eq!(
            CallTarget::decode(3, 0),
            CallTarget::Control(ControlOp::SetNotifications)
        );
        assert_eq!(CallTarget::decode(0x42, 0), CallTarget::UnknownControl(0x42));
    }
}
