//! Live message streams
//!
//! The engine pushes messages into an unbounded channel from its callback. A
//! producer task transcodes them and forwards the survivors to the consumer's
//! [`MessageStream`]. Ending the stream cancels the producer and closes the
//! engine subscription; the consumer then sees `None`. Dropping the
//! [`MessageStream`] does the same from the other side: the producer notices
//! and releases the group's stream slot.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::engine::{EngineMessage, GroupEngine, GroupId, StreamCloser};
use crate::errors::ClientResult;
use crate::metrics::{self, STREAM_DELIVERED, STREAM_DROPPED};

/// Messages arriving on a group's live subscription
///
/// Ends when the group's stream is ended or replaced.
pub struct MessageStream<T> {
    inner: ReceiverStream<T>,
}

impl<T> MessageStream<T> {
    /// Next message, or `None` once the stream has ended
    pub async fn next(&mut self) -> Option<T> {
        StreamExt::next(&mut self.inner).await
    }
}

impl<T> Stream for MessageStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

impl<T> std::fmt::Debug for MessageStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStream").finish_non_exhaustive()
    }
}

/// The engine subscription and producer task behind a [`MessageStream`]
pub(crate) struct ActiveStream {
    id: u64,
    closer: Box<dyn StreamCloser>,
    cancel: CancellationToken,
}

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

impl ActiveStream {
    pub(crate) fn close(self) {
        self.cancel.cancel();
        self.closer.end();
    }
}

/// At most one active stream per group, shared by every clone of the group
#[derive(Clone, Default)]
pub(crate) struct StreamHolder {
    active: Arc<Mutex<Option<ActiveStream>>>,
}

impl StreamHolder {
    /// Hold `stream`, handing back whatever was held before
    pub(crate) fn replace(&self, stream: ActiveStream) -> Option<ActiveStream> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner).replace(stream)
    }

    pub(crate) fn take(&self) -> Option<ActiveStream> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Close the held stream if it is still the one identified by `id`
    ///
    /// Returns `false` when the slot is empty or already holds a newer stream.
    pub(crate) fn release(&self, id: u64) -> bool {
        let released = {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            if active.as_ref().is_some_and(|stream| stream.id == id) {
                active.take()
            } else {
                None
            }
        };
        match released {
            Some(stream) => {
                stream.close();
                true
            }
            None => false,
        }
    }
}

/// Subscribe to the engine and spawn the producer task
///
/// `transcode` returning `None` drops the message; the stream keeps going.
/// The returned [`ActiveStream`] must be placed in `holder` before the
/// [`MessageStream`] is handed out, so a consumer drop can release it.
pub(crate) async fn open<T, F>(
    engine: &Arc<dyn GroupEngine>,
    holder: StreamHolder,
    group_id: GroupId,
    capacity: usize,
    transcode: F,
) -> ClientResult<(MessageStream<T>, ActiveStream)>
where
    T: Send + 'static,
    F: Fn(&EngineMessage) -> Option<T> + Send + 'static,
{
    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<EngineMessage>();
    let closer = engine
        .stream(Box::new(move |message: EngineMessage| {
            // Receiver gone means the producer already stopped
            let _ = raw_tx.send(message);
        }))
        .await?;

    let (tx, rx) = mpsc::channel(capacity);
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let id = NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed);

    tokio::spawn(async move {
        let mut consumer_dropped = false;
        loop {
            let message = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tx.closed() => {
                    consumer_dropped = true;
                    break;
                }
                message = raw_rx.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };

            let Some(item) = transcode(&message) else {
                metrics::record_counter(STREAM_DROPPED, 1);
                continue;
            };

            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                sent = tx.send(item) => {
                    if sent.is_err() {
                        consumer_dropped = true;
                        break;
                    }
                    metrics::record_counter(STREAM_DELIVERED, 1);
                }
            }
        }
        if consumer_dropped && holder.release(id) {
            debug!(group_id = %group_id, "Stream consumer dropped, subscription released");
        }
        debug!(group_id = %group_id, "Stream producer stopped");
    });

    Ok((MessageStream { inner: ReceiverStream::new(rx) }, ActiveStream { id, closer, cancel }))
}
