//! In-process broadcast bus for tests/dev.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};

use crate::bus::{EventBus, Inbox, Subscription};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InMemoryBusError {
    #[error("event bus lock poisoned")]
    Poisoned,
}

/// Fans every published message out to each live subscription's inbox.
///
/// The bus only keeps weak references; a dropped `Subscription` is pruned on
/// the next publish.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    inboxes: Mutex<Vec<Weak<Mutex<VecDeque<M>>>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscriptions that were alive at the last publish or subscribe.
    pub fn subscriber_count(&self) -> usize {
        self.inboxes.lock().map(|i| i.len()).unwrap_or(0)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            inboxes: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut inboxes = self.inboxes.lock().map_err(|_| InMemoryBusError::Poisoned)?;

        inboxes.retain(|weak| match weak.upgrade() {
            Some(inbox) => inbox
                .lock()
                .map(|mut queue| queue.push_back(message.clone()))
                .is_ok(),
            None => false,
        });

        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let inbox: Inbox<M> = Arc::new(Mutex::new(VecDeque::new()));

        if let Ok(mut inboxes) = self.inboxes.lock() {
            inboxes.retain(|weak| weak.strong_count() > 0);
            inboxes.push(Arc::downgrade(&inbox));
        }

        Subscription::new(inbox)
    }
}
