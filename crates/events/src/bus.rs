//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus distributes events after the state change they describe has been
//! written. It makes no promises beyond best-effort fan-out:
//!
//! - **Transport-agnostic**: in-process inboxes here; a broker adapter can implement the same trait
//! - **At-least-once delivery**: consumers must tolerate duplicates
//! - **No persistence**: the job store is the source of truth, not the bus

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub(crate) type Inbox<M> = Arc<Mutex<VecDeque<M>>>;

/// Handle onto the messages published since it was created.
///
/// Non-blocking: consumers poll with `drain()`. Dropping the handle
/// unsubscribes it.
#[derive(Debug)]
pub struct Subscription<M> {
    inbox: Inbox<M>,
}

impl<M> Subscription<M> {
    pub(crate) fn new(inbox: Inbox<M>) -> Self {
        Self { inbox }
    }

    /// Take everything buffered so far, oldest first.
    pub fn drain(&self) -> Vec<M> {
        self.inbox
            .lock()
            .map(|mut inbox| inbox.drain(..).collect())
            .unwrap_or_default()
    }

    /// Number of buffered, not yet drained messages.
    pub fn pending(&self) -> usize {
        self.inbox.lock().map(|inbox| inbox.len()).unwrap_or(0)
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// `publish()` can fail (bus closed, broker unreachable). Publishers in this
/// workspace treat publication as fire-and-forget: the failure is logged and
/// the already-persisted state change stands.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
