//! Selection events.
//!
//! A [`SelectionChannel`] connects the selection subsystem (the UI, or a
//! test) with the handlers reacting to it. Publishing runs every handler
//! synchronously, in subscription order, before `publish` returns.

use std::{
    cell::{Cell, RefCell},
    fmt::Debug,
    rc::Rc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<E> = Rc<dyn Fn(&E)>;

pub struct SelectionChannel<E> {
    handlers: RefCell<Vec<(SubscriptionId, Handler<E>)>>,
    next_id: Cell<u64>,
}

impl<E> SelectionChannel<E> {
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    pub fn subscribe(&self, handler: impl Fn(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers.borrow_mut().push((id, Rc::new(handler)));
        id
    }

    /// Returns whether a handler was removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    /// Dispatch `event` to every handler and return how many received it.
    ///
    /// Handlers subscribed or removed during dispatch take effect with the
    /// next event.
    pub fn publish(&self, event: &E) -> usize {
        let handlers: Vec<Handler<E>> = self
            .handlers
            .borrow()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    pub fn subscribers(&self) -> usize {
        self.handlers.borrow().len()
    }
}

impl<E> Default for SelectionChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Debug for SelectionChannel<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionChannel")
            .field("subscribers", &self.subscribers())
            .finish()
    }
}
