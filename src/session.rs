use std::{collections::BTreeSet, io};

use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf},
    sync::oneshot,
};

use crate::{
    bluetooth::{DeviceDescriptor, Radio},
    error::{ConnectError, IoError},
};

mod listen;
pub use listen::ListenEnd;
use listen::Listener;

/// Largest chunk returned by a single read.
pub const READ_BUFFER_SIZE: usize = 1024;

/// An open connection: one duplex stream split into its two directions, and
/// the listener currently borrowing the read half, if any.
struct Link<S> {
    device: DeviceDescriptor,
    reader: Option<ReadHalf<S>>,
    writer: WriteHalf<S>,
    listener: Option<Listener<S>>,
}

impl<S> Link<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn new(device: DeviceDescriptor, stream: S) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Link {
            device,
            reader: Some(reader),
            writer,
            listener: None,
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await
    }

    async fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        match self.reader {
            Some(ref mut x) => x.read(buffer).await,
            None => Err(io::ErrorKind::NotConnected.into()),
        }
    }

    async fn stop_listener(&mut self) -> Option<ListenEnd> {
        let listener = self.listener.take()?;
        let (reader, end) = listener.stop().await;
        if reader.is_some() {
            self.reader = reader;
        }
        debug!("stopped listening to {}: {:?}", self.device, end);
        Some(end)
    }

    /// Releases input, output and socket in that order. Every step is
    /// attempted; failures are logged.
    async fn close(mut self) {
        self.stop_listener().await;

        let Link {
            device,
            reader,
            mut writer,
            ..
        } = self;

        if reader.is_none() {
            warn!("input stream from {} was lost before close", device);
        }

        if let Err(e) = writer.flush().await {
            warn!("error flushing output stream to {}: {}", device, e);
        }
        if let Err(e) = writer.shutdown().await {
            warn!("error closing output stream to {}: {}", device, e);
        }

        match reader {
            Some(reader) => drop(reader.unsplit(writer)),
            None => drop(writer),
        }

        info!("closed connection to {}", device);
    }
}

/// A serial port session with at most one connected device and at most one
/// running listener.
///
/// Operations that need a connection fail with [`IoError::NotConnected`]
/// while disconnected. A failed write or read, or the peer closing the
/// stream, disconnects the session.
pub struct SerialSession<R: Radio> {
    radio: R,
    link: Option<Link<R::Stream>>,
}

impl<R: Radio> SerialSession<R> {
    pub fn new(radio: R) -> Self {
        SerialSession { radio, link: None }
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub async fn is_supported(&self) -> bool {
        self.radio.is_supported().await
    }

    pub async fn is_enabled(&self) -> bool {
        self.radio.is_enabled().await
    }

    /// Devices paired with this machine. Empty if there is no radio.
    pub async fn list_bonded_devices(&self) -> BTreeSet<DeviceDescriptor> {
        self.radio.bonded_devices().await.into_iter().collect()
    }

    /// False once the listen loop has stopped on its own: the loop is only
    /// cancelled by taking it out of the link, so a finished loop hit end of
    /// stream or a read error.
    pub fn is_connected(&self) -> bool {
        match self.link {
            Some(ref link) => !link.listener.as_ref().map_or(false, |x| x.is_finished()),
            None => false,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.link
            .as_ref()
            .map_or(false, |x| x.listener.is_some())
    }

    /// The connected device.
    pub fn device(&self) -> Option<&DeviceDescriptor> {
        self.link.as_ref().map(|x| &x.device)
    }

    /// Connects to the serial port service of `device`.
    ///
    /// Any existing connection is closed first, listener included. On error
    /// the session is left disconnected.
    pub async fn connect(&mut self, device: &DeviceDescriptor) -> Result<(), ConnectError> {
        self.close().await;

        info!("connecting to {}", device);
        match self.radio.open(device).await {
            Ok(stream) => {
                self.link = Some(Link::new(device.clone(), stream));
                info!("connected to {}", device);
                Ok(())
            }
            Err(e) => {
                warn!("failed to connect to {}: {}", device, e);
                Err(e)
            }
        }
    }

    /// Writes all of `bytes` and flushes. No framing is added.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        self.reap().await;
        let link = self.link.as_mut().ok_or(IoError::NotConnected)?;

        match link.write(bytes).await {
            Ok(()) => {
                debug!("sent {} bytes to {}", bytes.len(), link.device);
                Ok(())
            }
            Err(e) => {
                warn!("write to {} failed: {}", link.device, e);
                self.disconnect().await;
                Err(IoError::from_write(e))
            }
        }
    }

    /// Performs a single read of at most [`READ_BUFFER_SIZE`] bytes.
    ///
    /// Returns `None` when the peer closed the stream, which also
    /// disconnects the session.
    pub async fn receive_once(&mut self) -> Result<Option<Vec<u8>>, IoError> {
        self.reap().await;
        let link = self.link.as_mut().ok_or(IoError::NotConnected)?;
        if link.listener.is_some() {
            return Err(IoError::Listening);
        }

        let mut buffer = [0u8; READ_BUFFER_SIZE];
        match link.read(&mut buffer).await {
            Ok(0) => {
                info!("{} closed the stream", link.device);
                self.disconnect().await;
                Ok(None)
            }
            Ok(len) => Ok(Some(buffer[..len].to_vec())),
            Err(e) => {
                warn!("read from {} failed: {}", link.device, e);
                self.disconnect().await;
                Err(IoError::Read(e))
            }
        }
    }

    /// Starts a background loop calling `on_data` with every chunk read
    /// from the device, replacing any running loop.
    ///
    /// `on_data` runs on the runtime's worker, not the caller's task, and
    /// borrows a buffer that is reused for the next read. The returned
    /// receiver resolves once, with the reason the loop stopped.
    pub async fn start_listening<F>(
        &mut self,
        on_data: F,
    ) -> Result<oneshot::Receiver<ListenEnd>, IoError>
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        self.stop_listening().await;
        let link = self.link.as_mut().ok_or(IoError::NotConnected)?;
        let reader = link.reader.take().ok_or(IoError::NotConnected)?;

        let (listener, end) = Listener::spawn(reader, on_data);
        link.listener = Some(listener);
        info!("listening to {}", link.device);
        Ok(end)
    }

    /// Stops the background loop and waits for it to finish. Does nothing if
    /// no loop is running.
    pub async fn stop_listening(&mut self) {
        let end = match self.link.as_mut() {
            Some(link) => link.stop_listener().await,
            None => None,
        };
        if let Some(end) = end {
            if end.is_disconnect() {
                info!("listener ended with {:?}, disconnecting", end);
                self.disconnect().await;
            }
        }
    }

    /// Stops listening and releases the connection. Safe to call while
    /// disconnected.
    pub async fn close(&mut self) {
        if self.link.is_none() {
            debug!("close: no open connection");
        }
        self.disconnect().await;
    }

    async fn disconnect(&mut self) {
        if let Some(link) = self.link.take() {
            link.close().await;
        }
    }

    /// Collects a loop that ended on its own so a dead connection is
    /// released before it is used again.
    async fn reap(&mut self) {
        let finished = self
            .link
            .as_ref()
            .and_then(|x| x.listener.as_ref())
            .map_or(false, |x| x.is_finished());
        if finished {
            self.stop_listening().await;
        }
    }
}
