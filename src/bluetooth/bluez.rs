use std::{error::Error as StdError, future::Future, io};

use bluer::{
    rfcomm::{Profile, ProfileHandle, Role, SocketAddr, Stream},
    Adapter, Address, ErrorKind, Session,
};
use futures::{future::BoxFuture, FutureExt, StreamExt};
use log::{debug, info, warn};
use tokio::sync::Mutex;

use super::{DeviceDescriptor, Radio, SPP_UUID};
use crate::error::ConnectError;

/// Radio backed by the BlueZ daemon.
///
/// Without a fixed channel the serial port profile is registered with BlueZ
/// on first connect, and BlueZ resolves the remote RFCOMM channel through
/// service discovery.
pub struct BluezRadio {
    session: Option<Session>,
    adapter: Option<Adapter>,
    channel: Option<u8>,
    profile: Mutex<Option<ProfileHandle>>,
}

impl BluezRadio {
    /// Opens the named adapter, or the default one. Never fails: a missing
    /// daemon or adapter leaves the radio unsupported.
    pub async fn new(adapter_name: Option<&str>, channel: Option<u8>) -> Self {
        let session = match Session::new().await {
            Ok(x) => x,
            Err(e) => {
                warn!("could not open bluetooth session: {e}");
                return BluezRadio::unsupported();
            }
        };

        let adapter = match adapter_name {
            Some(name) => session.adapter(name),
            None => session.default_adapter().await,
        };
        let adapter = match adapter {
            Ok(x) => x,
            Err(e) => {
                warn!("no usable bluetooth adapter: {e}");
                return BluezRadio::unsupported();
            }
        };

        info!("using bluetooth adapter `{}`", adapter.name());

        BluezRadio {
            session: Some(session),
            adapter: Some(adapter),
            channel,
            profile: Mutex::new(None),
        }
    }

    fn unsupported() -> Self {
        BluezRadio {
            session: None,
            adapter: None,
            channel: None,
            profile: Mutex::new(None),
        }
    }

    async fn bonded(adapter: &Adapter) -> bluer::Result<Vec<DeviceDescriptor>> {
        let addrs = adapter.device_addresses().await?;
        Ok(collect_bonded(addrs, |addr| Self::describe(adapter, addr)).await)
    }

    /// `None` for a known but unpaired device.
    async fn describe(
        adapter: &Adapter,
        addr: Address,
    ) -> bluer::Result<Option<DeviceDescriptor>> {
        let device = adapter.device(addr)?;
        if !device.is_paired().await? {
            return Ok(None);
        }
        let name = device.name().await?;
        Ok(Some(DeviceDescriptor::new(addr.to_string(), name)))
    }

    async fn connect(&self, device: &DeviceDescriptor) -> Result<Stream, ConnectError> {
        let adapter = self.adapter.as_ref().ok_or(ConnectError::RadioUnavailable)?;
        let address: Address = device
            .address
            .parse()
            .map_err(|_| ConnectError::InvalidAddress(device.address.clone()))?;

        if let Some(channel) = self.channel {
            debug!("dialing {} on rfcomm channel {}", address, channel);
            return Stream::connect(SocketAddr::new(address, channel))
                .await
                .map_err(|e| unreachable_device(&device.address, e));
        }

        let session = self.session.as_ref().ok_or(ConnectError::RadioUnavailable)?;
        let mut profile = self.profile.lock().await;
        if profile.is_none() {
            let handle = session
                .register_profile(Profile {
                    uuid: SPP_UUID,
                    role: Some(Role::Client),
                    require_authentication: Some(false),
                    require_authorization: Some(false),
                    auto_connect: Some(false),
                    ..Default::default()
                })
                .await
                .map_err(|e| connect_error(&device.address, e))?;
            debug!("registered serial port profile");
            *profile = Some(handle);
        }
        let requests = profile.as_mut().ok_or(ConnectError::RadioUnavailable)?;

        let remote = adapter
            .device(address)
            .map_err(|e| connect_error(&device.address, e))?;
        let connect = remote.connect_profile(&SPP_UUID).fuse();
        futures::pin_mut!(connect);

        loop {
            tokio::select! {
                res = &mut connect => {
                    res.map_err(|e| connect_error(&device.address, e))?;
                    debug!("profile connected to {}", address);
                }
                req = requests.next() => {
                    let req = req.ok_or_else(|| ConnectError::ServiceNotOffered(device.address.clone()))?;
                    if req.device() != address {
                        warn!("ignoring serial connection request from {}", req.device());
                        continue;
                    }
                    return req.accept().map_err(|e| unreachable_device(&device.address, e));
                }
            }
        }
    }
}

/// Queries every address in turn. A device that fails its query, e.g. one
/// removed by BlueZ in the meantime, is skipped.
async fn collect_bonded<F, Fut>(addrs: Vec<Address>, mut describe: F) -> Vec<DeviceDescriptor>
where
    F: FnMut(Address) -> Fut,
    Fut: Future<Output = bluer::Result<Option<DeviceDescriptor>>>,
{
    let mut devices = Vec::new();
    for addr in addrs {
        match describe(addr).await {
            Ok(Some(x)) => devices.push(x),
            Ok(None) => {}
            Err(e) => warn!("skipping device {}: {}", addr, e),
        }
    }
    devices
}

fn unreachable_device<E>(address: &str, e: E) -> ConnectError
where
    E: Into<Box<dyn StdError + Send + Sync>>,
{
    ConnectError::Unreachable {
        address: address.to_string(),
        source: io::Error::new(io::ErrorKind::Other, e),
    }
}

fn connect_error(address: &str, e: bluer::Error) -> ConnectError {
    match e.kind {
        ErrorKind::NotAuthorized | ErrorKind::NotPermitted | ErrorKind::AuthenticationRejected => {
            ConnectError::PermissionDenied(address.to_string())
        }
        ErrorKind::NotAvailable | ErrorKind::NotSupported => {
            ConnectError::ServiceNotOffered(address.to_string())
        }
        _ => unreachable_device(address, e),
    }
}

impl Radio for BluezRadio {
    type Stream = Stream;

    fn is_supported(&self) -> BoxFuture<'_, bool> {
        futures::future::ready(self.adapter.is_some()).boxed()
    }

    fn is_enabled(&self) -> BoxFuture<'_, bool> {
        async move {
            match self.adapter {
                Some(ref adapter) => adapter.is_powered().await.unwrap_or_else(|e| {
                    warn!("could not query adapter power state: {e}");
                    false
                }),
                None => false,
            }
        }
        .boxed()
    }

    fn bonded_devices(&self) -> BoxFuture<'_, Vec<DeviceDescriptor>> {
        async move {
            let adapter = match self.adapter {
                Some(ref x) => x,
                None => return Vec::new(),
            };
            Self::bonded(adapter).await.unwrap_or_else(|e| {
                warn!("could not list bonded devices: {e}");
                Vec::new()
            })
        }
        .boxed()
    }

    fn open<'a>(
        &'a self,
        device: &'a DeviceDescriptor,
    ) -> BoxFuture<'a, Result<Self::Stream, ConnectError>> {
        self.connect(device).boxed()
    }
}
