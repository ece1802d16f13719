//! Active event registry.
//!
//! Every running animation on an entity is represented by one [`ActiveEvent`]
//! in the entity's [`ActiveEvents`] list. Other subsystems cancel running
//! animations by category through [`clear_events`] before they start new ones.

use std::{
    cell::{Cell, RefCell},
    fmt::Debug,
    rc::{Rc, Weak},
};

use crate::data_structures::product::ProductItem;

/// Classification of an active event used for selective cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventCategory {
    ColorChange,
    Visibility,
    Transform,
}

/// Anything that can stop a running animation.
pub trait Cancel {
    /// Stop the animation. With `snap_to_final` the final state is applied
    /// once before stopping.
    fn cancel(&self, snap_to_final: bool);
}

/// Identifies one entry of an [`ActiveEvents`] list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EventId(u64);

/// Handle of an in-flight animation.
#[derive(Clone)]
pub struct ActiveEvent {
    pub id: EventId,
    pub category: EventCategory,
    canceller: Rc<dyn Cancel>,
}

impl ActiveEvent {
    pub fn cancel(&self, snap_to_final: bool) {
        self.canceller.cancel(snap_to_final);
    }
}

impl Debug for ActiveEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveEvent")
            .field("id", &self.id)
            .field("category", &self.category)
            .finish()
    }
}

#[derive(Default)]
struct EventList {
    events: RefCell<Vec<ActiveEvent>>,
    next_id: Cell<u64>,
}

/// Ordered list of the animations currently running on one entity.
///
/// Cloning yields another handle to the same list.
#[derive(Clone, Default)]
pub struct ActiveEvents(Rc<EventList>);

/// Non-owning handle to an [`ActiveEvents`] list.
///
/// Animations keep one of these to deregister themselves; a strong handle
/// would form a cycle with the list's own reference to the animation.
#[derive(Clone, Default)]
pub struct WeakActiveEvents(Weak<EventList>);

impl WeakActiveEvents {
    pub fn upgrade(&self) -> Option<ActiveEvents> {
        self.0.upgrade().map(ActiveEvents)
    }
}

impl ActiveEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn downgrade(&self) -> WeakActiveEvents {
        WeakActiveEvents(Rc::downgrade(&self.0))
    }

    /// Append a new entry and return its id.
    pub fn register(&self, category: EventCategory, canceller: Rc<dyn Cancel>) -> EventId {
        let id = EventId(self.0.next_id.get());
        self.0.next_id.set(id.0 + 1);
        self.0.events.borrow_mut().push(ActiveEvent {
            id,
            category,
            canceller,
        });
        id
    }

    /// Remove the entry with `id` without cancelling it. Returns whether an
    /// entry was removed.
    pub fn deregister(&self, id: EventId) -> bool {
        let mut events = self.0.events.borrow_mut();
        let before = events.len();
        events.retain(|event| event.id != id);
        events.len() != before
    }

    /// Remove all entries matching `categories` in one sweep and return them.
    fn take_matching(&self, categories: &[EventCategory]) -> Vec<ActiveEvent> {
        let mut events = self.0.events.borrow_mut();
        let (matching, remaining): (Vec<_>, Vec<_>) = std::mem::take(&mut *events)
            .into_iter()
            .partition(|event| categories.contains(&event.category));
        *events = remaining;
        matching
    }

    /// Cancel every running animation regardless of category.
    pub fn cancel_all(&self, snap_to_final: bool) {
        let events = std::mem::take(&mut *self.0.events.borrow_mut());
        for event in events {
            event.cancel(snap_to_final);
        }
    }

    pub fn len(&self) -> usize {
        self.0.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.events.borrow().is_empty()
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.0.events.borrow().iter().any(|event| event.id == id)
    }

    /// Categories of the running animations, in registration order.
    pub fn categories(&self) -> Vec<EventCategory> {
        self.0
            .events
            .borrow()
            .iter()
            .map(|event| event.category)
            .collect()
    }

    /// Cancel and remove every entry whose category is in `categories`.
    ///
    /// The matching entries leave the list before any of them is cancelled,
    /// so cancel handlers may register or clear events themselves.
    pub fn clear(&self, categories: &[EventCategory], snap_to_final: bool) {
        let cancelled = self.take_matching(categories);
        if !cancelled.is_empty() {
            log::debug!(
                "Cancelling {} active event(s) in {:?} (snap to final: {})",
                cancelled.len(),
                categories,
                snap_to_final
            );
        }
        for event in cancelled {
            event.cancel(snap_to_final);
        }
    }
}

impl Debug for ActiveEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.0.events.borrow().iter()).finish()
    }
}

/// Cancel the animations of `entity` whose category is in `categories`.
///
/// Animations of other categories keep running. An entity without matching
/// events is left untouched.
pub fn clear_events(entity: &ProductItem, categories: &[EventCategory], snap_to_final: bool) {
    entity.active_events.clear(categories, snap_to_final);
}
