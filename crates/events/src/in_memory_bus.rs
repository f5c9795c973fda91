//! Process-local notification fan-out.
//!
//! Used by the engine when listeners live in the same process as the
//! dispatcher (screens, audit writers, tests). Delivery is synchronous: when
//! `publish` returns, every live listener already holds its copy.

use std::sync::{Mutex, PoisonError, mpsc::Sender};

use thiserror::Error;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Error)]
pub enum InMemoryBusError {
    /// A listener panicked while the fan-out state was held.
    #[error("notification fan-out unavailable: state poisoned")]
    Poisoned,
}

#[derive(Debug)]
struct Fanout<M> {
    listeners: Vec<Sender<M>>,
    published: u64,
}

impl<M: Clone> Fanout<M> {
    /// Send `message` to every listener, forgetting the ones that hung up.
    fn deliver(&mut self, message: &M) {
        self.listeners.retain(|tx| tx.send(message.clone()).is_ok());
        self.published += 1;
    }
}

/// Broadcast bus backed by `std::sync::mpsc` channels.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    fanout: Mutex<Fanout<M>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listeners still attached after the most recent publish.
    pub fn subscriber_count(&self) -> usize {
        self.fanout
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }

    /// Messages accepted since the bus was created.
    pub fn published_count(&self) -> u64 {
        self.fanout
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .published
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            fanout: Mutex::new(Fanout {
                listeners: Vec::new(),
                published: 0,
            }),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut fanout = self
            .fanout
            .lock()
            .map_err(|_| InMemoryBusError::Poisoned)?;
        fanout.deliver(&message);
        Ok(())
    }

    /// Attach a listener. Only messages published afterwards are delivered.
    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = std::sync::mpsc::channel();
        self.fanout
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .push(tx);
        Subscription::new(rx)
    }
}
