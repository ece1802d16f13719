//! Frame-paced interpolation primitive.
//!
//! An [`Animation`] turns elapsed frame time into a progress value in `[0, 1]`
//! and hands it to a callback once per frame until it reaches 1 or is
//! cancelled. While it runs it is listed in its owner's [`ActiveEvents`].
//!
//! ```text
//! Pending --tick--> Running --progress == 1--> Completed
//!    |                 |
//!    +----cancel-------+------------------->  Cancelled
//! ```

use std::{
    cell::{Cell, RefCell},
    fmt::Debug,
    rc::Rc,
};

use instant::Duration;

use crate::{
    animation::registry::{ActiveEvents, Cancel, EventCategory, EventId, WeakActiveEvents},
    flow::FrameScheduler,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationState {
    /// Created but not ticked yet.
    Pending,
    /// Ticking; the first tick recorded the start time.
    Running,
    /// Progress 1 was delivered and the animation left the registry.
    Completed,
    Cancelled,
}

struct Inner {
    owner: WeakActiveEvents,
    category: EventCategory,
    event_id: Cell<Option<EventId>>,
    duration: Duration,
    scheduler: Rc<dyn FrameScheduler>,
    state: Cell<AnimationState>,
    start: Cell<Option<Duration>>,
    progress: Cell<f32>,
    frame_requested: Cell<bool>,
    on_progress: RefCell<Box<dyn FnMut(f32)>>,
}

impl Inner {
    fn deliver(&self, progress: f32) {
        self.progress.set(progress);
        match self.on_progress.try_borrow_mut() {
            Ok(mut on_progress) => on_progress(progress),
            // Only reachable when the callback cancels its own animation.
            Err(_) => log::warn!(
                "Skipped re-entrant progress update ({}) of a {:?} animation",
                progress,
                self.category
            ),
        }
    }

    fn deregister(&self) {
        if let (Some(owner), Some(id)) = (self.owner.upgrade(), self.event_id.take()) {
            owner.deregister(id);
        }
    }
}

impl Cancel for Inner {
    fn cancel(&self, snap_to_final: bool) {
        match self.state.get() {
            AnimationState::Pending | AnimationState::Running => {}
            AnimationState::Completed | AnimationState::Cancelled => return,
        }
        // Transition first so a callback cancelling again is a no-op.
        self.state.set(AnimationState::Cancelled);
        if snap_to_final {
            self.deliver(1.0);
        }
        self.deregister();
    }
}

/// Handle to a running (or finished) animation.
///
/// Clones refer to the same animation.
#[derive(Clone)]
pub struct Animation(Rc<Inner>);

/// Create an animation owned by `owner` and register it in `owner`'s active
/// events under `category`.
///
/// Nothing happens until the animation is ticked: call [`Animation::start`]
/// to have the scheduler tick it on the next frame, or [`Animation::tick`] to
/// drive it by hand.
pub fn create_animation(
    owner: &ActiveEvents,
    category: EventCategory,
    duration: Duration,
    on_progress: impl FnMut(f32) + 'static,
    scheduler: Rc<dyn FrameScheduler>,
) -> Animation {
    let inner = Rc::new(Inner {
        owner: owner.downgrade(),
        category,
        event_id: Cell::new(None),
        duration,
        scheduler,
        state: Cell::new(AnimationState::Pending),
        start: Cell::new(None),
        progress: Cell::new(0.0),
        frame_requested: Cell::new(false),
        on_progress: RefCell::new(Box::new(on_progress)),
    });
    let canceller: Rc<dyn Cancel> = inner.clone();
    let id = owner.register(category, canceller);
    inner.event_id.set(Some(id));
    Animation(inner)
}

impl Animation {
    /// Request the first tick from the frame scheduler.
    pub fn start(&self) {
        if self.0.state.get() == AnimationState::Pending {
            self.request_frame();
        }
    }

    /// Advance the animation to the scheduler's current time.
    ///
    /// Delivers the new progress and requests another frame until progress
    /// reaches 1. Ticking a finished animation does nothing.
    pub fn tick(&self) {
        let inner = &self.0;
        let now = inner.scheduler.now();
        match inner.state.get() {
            AnimationState::Pending => {
                inner.start.set(Some(now));
                inner.state.set(AnimationState::Running);
            }
            AnimationState::Running => {}
            AnimationState::Completed | AnimationState::Cancelled => return,
        }

        let start = inner.start.get().unwrap_or(now);
        let progress = if inner.duration.is_zero() {
            1.0
        } else {
            (now.saturating_sub(start).as_secs_f32() / inner.duration.as_secs_f32()).clamp(0.0, 1.0)
        };
        // Frame times never run backwards, but a host clock might.
        let progress = progress.max(inner.progress.get());
        inner.deliver(progress);

        // The callback may have cancelled us.
        if inner.state.get() != AnimationState::Running {
            return;
        }
        if progress < 1.0 {
            self.request_frame();
        } else {
            inner.state.set(AnimationState::Completed);
            inner.deregister();
        }
    }

    /// Stop the animation. With `snap_to_final` progress 1 is delivered once
    /// before stopping. Cancelling a finished animation does nothing.
    pub fn cancel(&self, snap_to_final: bool) {
        self.0.cancel(snap_to_final);
    }

    pub fn state(&self) -> AnimationState {
        self.0.state.get()
    }

    /// The last progress value handed to the callback.
    pub fn progress(&self) -> f32 {
        self.0.progress.get()
    }

    pub fn category(&self) -> EventCategory {
        self.0.category
    }

    pub fn duration(&self) -> Duration {
        self.0.duration
    }

    fn request_frame(&self) {
        if self.0.frame_requested.replace(true) {
            return;
        }
        let animation = self.clone();
        self.0.scheduler.request_frame(Box::new(move || {
            animation.0.frame_requested.set(false);
            animation.tick();
        }));
    }
}

impl Debug for Animation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Animation")
            .field("category", &self.0.category)
            .field("state", &self.0.state.get())
            .field("progress", &self.0.progress.get())
            .field("duration", &self.0.duration)
            .finish()
    }
}
