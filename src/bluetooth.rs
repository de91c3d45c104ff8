use std::fmt;

use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::ConnectError;

mod bluez;
pub use bluez::BluezRadio;

#[cfg(test)]
pub(crate) mod mock;

/// Serial Port Profile service class.
pub const SPP_UUID: uuid::Uuid = uuid::Uuid::from_u128(0x00001101_0000_1000_8000_00805F9B34FB);

/// A device as reported by the platform. Ordered by address so a set of
/// descriptors lists devices in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceDescriptor {
    pub address: String,
    pub name: Option<String>,
}

impl DeviceDescriptor {
    pub fn new(address: impl Into<String>, name: Option<String>) -> Self {
        DeviceDescriptor {
            address: address.into(),
            name,
        }
    }

    /// True if `s` is this device's address (case-insensitive) or its name.
    pub fn matches(&self, s: &str) -> bool {
        self.address.eq_ignore_ascii_case(s) || self.name.as_deref() == Some(s)
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(ref name) => write!(f, "{} ({})", name, self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

/// The platform side of a serial session: radio state, the bonded device
/// list and opening a duplex stream to the serial port service of a device.
pub trait Radio: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn is_supported(&self) -> BoxFuture<'_, bool>;

    fn is_enabled(&self) -> BoxFuture<'_, bool>;

    /// Previously paired devices. Implementations log failures and return an
    /// empty list instead of erroring.
    fn bonded_devices(&self) -> BoxFuture<'_, Vec<DeviceDescriptor>>;

    fn open<'a>(
        &'a self,
        device: &'a DeviceDescriptor,
    ) -> BoxFuture<'a, Result<Self::Stream, ConnectError>>;
}
