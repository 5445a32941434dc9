use std::{
    future::poll_fn,
    mem,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
    task::{Poll, Waker},
};

use shardline_cql::frame::Envelope;

use crate::error::{ProtocolViolation, RequestError};

pub(crate) const MAX_STREAMS: usize = 1 << 15;

#[derive(Debug, thiserror::Error)]
pub(crate) enum CompletionError {
    #[error("Completion received for stream {0}, which has no pending request")]
    Stray(i16),
    #[error("Stream {0} completed twice")]
    Double(i16),
}

#[derive(Debug, Default)]
enum StreamState {
    #[default]
    Free,
    Waiting(Option<Waker>),
    Completed(Result<Envelope, RequestError>),
    /// The result has been taken, the stream is released when dropped.
    Consumed,
    /// The caller is gone, the completion only releases the stream.
    Abandoned,
}

#[derive(Debug, Default)]
struct StreamNode {
    state: Mutex<StreamState>,
}

impl StreamNode {
    fn state(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Correlation table between stream ids and pending requests.
///
/// A stream id is bound to at most one pending request, and a request is completed at most
/// once. Availability is tracked in a bitmap, a set bit marking a free stream.
#[derive(Debug)]
pub(crate) struct StreamPool {
    bitmap: Box<[AtomicU64]>,
    nodes: Box<[StreamNode]>,
    closed: AtomicBool,
}

impl StreamPool {
    pub(crate) fn new(size: usize) -> Self {
        let size = size.clamp(1, MAX_STREAMS);
        let bitmap = (0..size.div_ceil(64))
            .map(|i| {
                let bits = (size - i * 64).min(64);
                AtomicU64::new(if bits == 64 { u64::MAX } else { (1 << bits) - 1 })
            })
            .collect();
        let nodes = (0..size).map(|_| StreamNode::default()).collect();
        Self {
            bitmap,
            nodes,
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn allocate(&self) -> Result<Stream<'_>, RequestError> {
        if self.is_closed() {
            return Err(RequestError::ConnectionClosed);
        }
        for (i, word) in self.bitmap.iter().enumerate() {
            let mut bits = word.load(Ordering::Relaxed);
            while bits != 0 {
                let bit = bits.trailing_zeros();
                match word.compare_exchange_weak(
                    bits,
                    bits & !(1 << bit),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let stream = Stream {
                            pool: self,
                            id: (i * 64 + bit as usize) as i16,
                            sent: false,
                        };
                        *stream.node().state() = StreamState::Waiting(None);
                        // checked after the state is set, so `close` can't miss the stream
                        if self.is_closed() {
                            return Err(RequestError::ConnectionClosed);
                        }
                        return Ok(stream);
                    }
                    Err(b) => bits = b,
                }
            }
        }
        Err(RequestError::NoStreamAvailable)
    }

    fn release(&self, id: i16) {
        let id = id as usize;
        self.bitmap[id / 64].fetch_or(1 << (id % 64), Ordering::AcqRel);
    }

    /// Completes the request pending on the envelope stream.
    ///
    /// A completion for a stream without a pending request is returned as an error and
    /// otherwise dropped. A second completion of a not yet consumed stream replaces its
    /// result with a [`ProtocolViolation::DoubleCompletion`], so the request fails.
    pub(crate) fn complete(&self, envelope: Envelope) -> Result<(), CompletionError> {
        let id = envelope.stream;
        let node = usize::try_from(id)
            .ok()
            .and_then(|index| self.nodes.get(index))
            .ok_or(CompletionError::Stray(id))?;
        let mut state = node.state();
        match mem::take(&mut *state) {
            StreamState::Waiting(waker) => {
                *state = StreamState::Completed(Ok(envelope));
                if let Some(waker) = waker {
                    waker.wake();
                }
                Ok(())
            }
            StreamState::Completed(_) => {
                *state = StreamState::Completed(Err(ProtocolViolation::DoubleCompletion(id).into()));
                Err(CompletionError::Double(id))
            }
            StreamState::Consumed => {
                *state = StreamState::Consumed;
                Err(CompletionError::Double(id))
            }
            StreamState::Abandoned => {
                self.release(id);
                Ok(())
            }
            StreamState::Free => Err(CompletionError::Stray(id)),
        }
    }

    /// Fails every pending request, and forbids new allocations.
    ///
    /// Only the first call has an effect.
    pub(crate) fn close(&self, error: impl Fn() -> RequestError) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for (id, node) in self.nodes.iter().enumerate() {
            let mut state = node.state();
            match mem::take(&mut *state) {
                StreamState::Waiting(waker) => {
                    *state = StreamState::Completed(Err(error()));
                    if let Some(waker) = waker {
                        waker.wake();
                    }
                }
                StreamState::Abandoned => self.release(id as i16),
                other => *state = other,
            }
        }
    }
}

/// A stream allocated for one request, released when dropped.
#[derive(Debug)]
pub(crate) struct Stream<'a> {
    pool: &'a StreamPool,
    id: i16,
    sent: bool,
}

impl Stream<'_> {
    pub(crate) fn id(&self) -> i16 {
        self.id
    }

    fn node(&self) -> &StreamNode {
        &self.pool.nodes[self.id as usize]
    }

    /// Marks the request as handed to the transport, so a response may still arrive after
    /// the stream is dropped.
    pub(crate) fn set_sent(&mut self) {
        self.sent = true;
    }

    pub(crate) async fn response(&self) -> Result<Envelope, RequestError> {
        poll_fn(|cx| {
            let mut state = self.node().state();
            match mem::take(&mut *state) {
                StreamState::Completed(result) => {
                    *state = StreamState::Consumed;
                    Poll::Ready(result)
                }
                StreamState::Waiting(waker) => {
                    let waker = match waker {
                        Some(waker) if waker.will_wake(cx.waker()) => waker,
                        _ => cx.waker().clone(),
                    };
                    *state = StreamState::Waiting(Some(waker));
                    Poll::Pending
                }
                other => {
                    *state = other;
                    Poll::Ready(Err(RequestError::ConnectionClosed))
                }
            }
        })
        .await
    }
}

impl Drop for Stream<'_> {
    fn drop(&mut self) {
        let mut state = self.node().state();
        match &*state {
            StreamState::Waiting(_) if self.sent && !self.pool.is_closed() => {
                *state = StreamState::Abandoned;
            }
            _ => {
                *state = StreamState::Free;
                drop(state);
                self.pool.release(self.id);
            }
        }
    }
}
