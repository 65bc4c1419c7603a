//! Fan-out of events to registered listeners.
//!
//! Listeners subscribe to one [`Category`] and are called in registration
//! order. The dispatcher is owned by a single delivery context, so no two
//! listeners ever run at the same time.
//!
//! The dispatcher keeps its own copy of the open seeks, built from the seek
//! events it delivers. A new seek listener first receives one
//! [`Event::SeekAdded`] per seek in that copy, which always matches what
//! earlier listeners have been told.

use crate::events::{Category, Event};
use crate::seeks::Seek;
use log::debug;

/// Receives events of the category it subscribed to.
pub trait Listener: Send {
    fn handle(&mut self, event: &Event);
}

impl<F> Listener for F
where
    F: FnMut(&Event) + Send,
{
    fn handle(&mut self, event: &Event) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

struct Subscription {
    id: ListenerId,
    category: Category,
    listener: Box<dyn Listener>,
}

#[derive(Default)]
pub struct Dispatcher {
    subscriptions: Vec<Subscription>,
    seeks: Vec<Seek>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener after all existing ones. Seek listeners are brought
    /// up to date before this returns.
    pub fn subscribe(&mut self, id: ListenerId, category: Category, mut listener: Box<dyn Listener>) {
        if category == Category::Seek {
            for seek in &self.seeks {
                listener.handle(&Event::SeekAdded(seek.clone()));
            }
        }

        debug!("Listener {:?} subscribed to {:?}", id, category);
        self.subscriptions.push(Subscription {
            id,
            category,
            listener,
        });
    }

    /// Returns false if no listener has this id.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|subscription| subscription.id != id);
        before != self.subscriptions.len()
    }

    pub fn dispatch(&mut self, event: &Event) {
        match event {
            Event::SeekAdded(seek) => self.seeks.push(seek.clone()),
            Event::SeekRemoved(seek) => self.seeks.retain(|tracked| tracked.id != seek.id),
            _ => {}
        }

        let category = event.category();
        for subscription in &mut self.subscriptions {
            if subscription.category == category {
                subscription.listener.handle(event);
            }
        }
    }

    /// Forgets the seek copy, as when the connection closes.
    pub fn reset(&mut self) {
        self.seeks.clear();
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.subscriptions.len()
    }
}
