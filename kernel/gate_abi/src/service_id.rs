use core::fmt::{Debug, Display, Formatter};
use core::num::NonZeroU32;

/// The id under which a service is registered at the call gate.
///
/// Id `0` is reserved for the control channel and can therefore never be a `ServiceId`.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ServiceId(NonZeroU32);

impl ServiceId {
    /// Create a service id from its raw register value.
    ///
    /// Returns `None` for the reserved id `0`.
    #[inline(always)]
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    #[inline(always)]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl From<ServiceId> for u32 {
    #[inline(always)]
    fn from(value: ServiceId) -> Self {
        value.get()
    }
}

impl TryFrom<u32> for ServiceId {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(())
    }
}

impl Debug for ServiceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("ServiceId").field(&self.get()).finish()
    }
}

impl Display for ServiceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        Display::fmt(&self.get(), f)
    }
}
