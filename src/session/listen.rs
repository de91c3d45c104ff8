use std::{io, sync::Arc};

use log::{error, trace};
use tokio::{
    io::{AsyncRead, AsyncReadExt, ReadHalf},
    sync::oneshot,
    task::JoinHandle,
};

use super::READ_BUFFER_SIZE;

/// Why a listen loop stopped. Delivered exactly once per loop.
#[derive(Debug, Clone)]
pub enum ListenEnd {
    /// Stopped by the session, either explicitly or by a new listener,
    /// a reconnect or close.
    Cancelled,
    /// The peer closed the stream.
    Eof,
    Failed(Arc<io::Error>),
}

impl ListenEnd {
    /// True if the loop ended because the connection is gone.
    pub fn is_disconnect(&self) -> bool {
        !matches!(self, ListenEnd::Cancelled)
    }
}

/// Handle to a running read loop. The loop owns the read half until it is
/// stopped, at which point the read half is handed back.
pub(crate) struct Listener<S> {
    cancel: oneshot::Sender<()>,
    task: JoinHandle<(ReadHalf<S>, ListenEnd)>,
}

impl<S> Listener<S>
where
    S: AsyncRead + Send + 'static,
{
    pub fn spawn<F>(reader: ReadHalf<S>, on_data: F) -> (Self, oneshot::Receiver<ListenEnd>)
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        let (cancel, cancelled) = oneshot::channel();
        let (end_send, end_recv) = oneshot::channel();

        let task = tokio::spawn(async move {
            let (reader, end) = read_loop(reader, cancelled, on_data).await;
            end_send.send(end.clone()).ok();
            (reader, end)
        });

        (Listener { cancel, task }, end_recv)
    }
}

impl<S> Listener<S> {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signals the loop and waits for it. No callback runs after this
    /// returns. The read half is lost only if the callback panicked.
    pub async fn stop(self) -> (Option<ReadHalf<S>>, ListenEnd) {
        self.cancel.send(()).ok();
        match self.task.await {
            Ok((reader, end)) => (Some(reader), end),
            Err(e) => {
                error!("listener task failed: {e}");
                let e = io::Error::new(io::ErrorKind::Other, e.to_string());
                (None, ListenEnd::Failed(Arc::new(e)))
            }
        }
    }
}

async fn read_loop<S, F>(
    mut reader: ReadHalf<S>,
    mut cancelled: oneshot::Receiver<()>,
    mut on_data: F,
) -> (ReadHalf<S>, ListenEnd)
where
    S: AsyncRead,
    F: FnMut(&[u8]),
{
    // Reused across reads; the callback only ever borrows the filled prefix.
    let mut buffer = [0u8; READ_BUFFER_SIZE];

    let end = loop {
        let read = tokio::select! {
            biased;
            _ = &mut cancelled => break ListenEnd::Cancelled,
            x = reader.read(&mut buffer) => x,
        };
        match read {
            Ok(0) => break ListenEnd::Eof,
            Ok(len) => {
                trace!("received {} bytes", len);
                on_data(&buffer[..len]);
            }
            Err(e) => break ListenEnd::Failed(Arc::new(e)),
        }
    };

    (reader, end)
}
