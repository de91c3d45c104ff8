//! In-memory radio for exercising sessions without a bluetooth stack.

use std::{
    collections::{HashMap, VecDeque},
    io,
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll},
};

use futures::{future::BoxFuture, FutureExt};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::{DeviceDescriptor, Radio};
use crate::error::ConnectError;

pub trait Link: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Link for T {}

/// Hands out queued links per address; an address without a queued link is
/// unreachable.
pub struct MockRadio {
    pub supported: bool,
    pub enabled: bool,
    pub devices: Vec<DeviceDescriptor>,
    links: Mutex<HashMap<String, VecDeque<Box<dyn Link>>>>,
}

impl MockRadio {
    pub fn new() -> Self {
        MockRadio {
            supported: true,
            enabled: true,
            devices: Vec::new(),
            links: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_link(&self, address: &str, link: impl Link + 'static) {
        self.links
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_default()
            .push_back(Box::new(link));
    }
}

impl Radio for MockRadio {
    type Stream = Box<dyn Link>;

    fn is_supported(&self) -> BoxFuture<'_, bool> {
        futures::future::ready(self.supported).boxed()
    }

    fn is_enabled(&self) -> BoxFuture<'_, bool> {
        futures::future::ready(self.supported && self.enabled).boxed()
    }

    fn bonded_devices(&self) -> BoxFuture<'_, Vec<DeviceDescriptor>> {
        let devices = if self.supported {
            self.devices.clone()
        } else {
            Vec::new()
        };
        futures::future::ready(devices).boxed()
    }

    fn open<'a>(
        &'a self,
        device: &'a DeviceDescriptor,
    ) -> BoxFuture<'a, Result<Self::Stream, ConnectError>> {
        let res = if !self.supported {
            Err(ConnectError::RadioUnavailable)
        } else {
            self.links
                .lock()
                .unwrap()
                .get_mut(&device.address)
                .and_then(|x| x.pop_front())
                .ok_or_else(|| ConnectError::Unreachable {
                    address: device.address.clone(),
                    source: io::Error::new(io::ErrorKind::TimedOut, "page timeout"),
                })
        };
        futures::future::ready(res).boxed()
    }
}

/// Yields each queued chunk as one read, then end of stream, a read error or
/// nothing at all.
pub struct ScriptedStream {
    chunks: VecDeque<Vec<u8>>,
    hold_open: bool,
    read_error: Option<io::ErrorKind>,
    write_error: Option<io::ErrorKind>,
    flush_error: Option<io::ErrorKind>,
    shutdown_error: Option<io::ErrorKind>,
    written: Arc<Mutex<Vec<u8>>>,
}

impl ScriptedStream {
    pub fn new(chunks: &[&[u8]]) -> Self {
        ScriptedStream {
            chunks: chunks.iter().map(|x| x.to_vec()).collect(),
            hold_open: false,
            read_error: None,
            write_error: None,
            flush_error: None,
            shutdown_error: None,
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Reads stay pending once the chunks are used up.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    pub fn fail_reads(mut self, kind: io::ErrorKind) -> Self {
        self.read_error = Some(kind);
        self
    }

    pub fn fail_writes(mut self, kind: io::ErrorKind) -> Self {
        self.write_error = Some(kind);
        self
    }

    pub fn fail_flush(mut self, kind: io::ErrorKind) -> Self {
        self.flush_error = Some(kind);
        self
    }

    pub fn fail_shutdown(mut self, kind: io::ErrorKind) -> Self {
        self.shutdown_error = Some(kind);
        self
    }

    pub fn written(&self) -> Arc<Mutex<Vec<u8>>> {
        self.written.clone()
    }
}

impl AsyncRead for ScriptedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(chunk) = self.chunks.pop_front() {
            let n = chunk.len().min(buf.remaining());
            buf.put_slice(&chunk[..n]);
            if n < chunk.len() {
                self.chunks.push_front(chunk[n..].to_vec());
            }
            return Poll::Ready(Ok(()));
        }
        if let Some(kind) = self.read_error {
            return Poll::Ready(Err(io::Error::from(kind)));
        }
        if self.hold_open {
            Poll::Pending
        } else {
            Poll::Ready(Ok(()))
        }
    }
}

impl AsyncWrite for ScriptedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if let Some(kind) = self.write_error {
            return Poll::Ready(Err(io::Error::from(kind)));
        }
        self.written.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.flush_error {
            Some(kind) => Poll::Ready(Err(io::Error::from(kind))),
            None => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.shutdown_error {
            Some(kind) => Poll::Ready(Err(io::Error::from(kind))),
            None => Poll::Ready(Ok(())),
        }
    }
}
