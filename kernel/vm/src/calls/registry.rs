use super::queue::{MessageQueue, Sender};
use super::service::Service;
use crate::config::DEFAULT_QUEUE_CAPACITY;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use gate_abi::ServiceId;

/// Mapping from [`ServiceId`] to the service registered under it.
///
/// The registry also owns the message queue that its services use to reach the guest asynchronously.
pub struct ServiceRegistry {
    services: BTreeMap<ServiceId, Box<dyn Service>>,
    queue: MessageQueue,
}

impl ServiceRegistry {
    pub fn new(queue: MessageQueue) -> Self {
        Self {
            services: BTreeMap::new(),
            queue,
        }
    }

    /// Register `service` under `id`, replacing any service that was registered under it before.
    pub fn register(&mut self, id: ServiceId, service: Box<dyn Service>) {
        log::info!("registering service {}", id);
        if self.services.insert(id, service).is_some() {
            log::debug!("service {} replaced an earlier registration", id);
        }
    }

    /// Register `service` under a raw id.
    ///
    /// # Panics
    /// Id `0` belongs to the control channel. Registering a service under it is a host bug.
    pub fn register_raw(&mut self, id: u32, service: Box<dyn Service>) {
        let id = ServiceId::new(id).unwrap_or_else(|| panic!("cannot register service 0"));
        self.register(id, service)
    }

    pub fn lookup(&mut self, id: ServiceId) -> Option<&mut (dyn Service + 'static)> {
        self.services.get_mut(&id).map(|service| service.as_mut())
    }

    pub fn contains(&self, id: ServiceId) -> bool {
        self.services.contains_key(&id)
    }

    /// Ids of all registered services in ascending order
    pub fn ids(&self) -> impl Iterator<Item = ServiceId> + '_ {
        self.services.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Create a [`Sender`] bound to `id` and the registries message queue.
    ///
    /// This works whether or not a service is registered under `id`, so a service can obtain its sender before it is
    /// registered.
    pub fn sender(&self, id: ServiceId) -> Sender {
        self.queue.sender(id)
    }

    /// The consuming side of the message queue
    pub(crate) fn inbox(&self) -> &MessageQueue {
        &self.queue
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new(MessageQueue::new(DEFAULT_QUEUE_CAPACITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::queue::{MessageInbox, MessageSender};
    use alloc::vec;
    use alloc::vec::Vec;
    use gate_abi::CallResult;

    fn constant(byte: u8) -> Box<dyn Service> {
        Box::new(move |_: &[u8]| -> CallResult<Vec<u8>> { Ok(vec![byte]) })
    }

    fn id(raw: u32) -> ServiceId {
        ServiceId::new(raw).unwrap()
    }

    #[test]
    fn lookup_finds_registered_services() {
        let mut registry = ServiceRegistry::default();
        registry.register(id(3), constant(3));
        assert_eq!(registry.lookup(id(3)).unwrap().handle(&[]), Ok(vec![3]));
        assert!(registry.lookup(id(4)).is_none());
    }

    #[test]
    fn registering_twice_overwrites() {
        let mut registry = ServiceRegistry::default();
        registry.register_raw(9, constant(1));
        registry.register_raw(9, constant(2));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup(id(9)).unwrap().handle(&[]), Ok(vec![2]));
    }

    #[test]
    #[should_panic(expected = "cannot register service 0")]
    fn registering_service_zero_panics() {
        ServiceRegistry::default().register_raw(0, constant(0));
    }

    #[test]
    fn ids_are_sorted() {
        let mut registry = ServiceRegistry::default();
        for raw in [5, 1, 3] {
            registry.register_raw(raw, constant(0));
        }
        let ids: Vec<u32> = registry.ids().map(ServiceId::get).collect();
        assert_eq!(ids, [1, 3, 5]);
    }

    #[test]
    fn sender_does_not_need_a_registration() {
        let registry = ServiceRegistry::new(MessageQueue::new(4));
        let sender = registry.sender(id(12));
        sender.send(vec![1, 2]).unwrap();
        assert!(!registry.contains(id(12)));
        assert_eq!(registry.inbox().pop_front().map(|m| m.origin), Some(id(12)));
    }
}
