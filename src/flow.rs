//! Frame pacing and the host event loop.
//!
//! Everything in this crate runs on one thread. Work that has to continue on
//! the next frame registers a callback with a [`FrameScheduler`]; the host
//! drives the scheduler once per frame (from its render loop, a
//! `requestAnimationFrame` callback, or a test) through [`FrameLoop::run_frame`].
//!
//! # Lifecycle
//!
//! Each call to `run_frame`:
//! 1. Takes all callbacks requested since the previous frame
//! 2. Invokes them in request order
//! 3. Callbacks requested while running are deferred to the next frame

use std::{cell::RefCell, cell::Cell, fmt::Debug, rc::Rc};

use instant::{Duration, Instant};

/// A callback invoked once, before the next frame.
pub type FrameCallback = Box<dyn FnOnce()>;

/// The frame-scheduling primitive animations are paced by.
pub trait FrameScheduler {
    /// Invoke `callback` before the next frame.
    fn request_frame(&self, callback: FrameCallback);

    /// Time of the current frame, measured from an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Source of frame timestamps.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall clock, measured from its creation.
#[derive(Debug)]
pub struct InstantClock {
    origin: Instant,
}

impl InstantClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for InstantClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for InstantClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to. Useful for replaying animations
/// deterministically.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }

    pub fn advance(&self, dt: Duration) {
        self.now.set(self.now.get() + dt);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Host-side [`FrameScheduler`]: a queue of next-frame callbacks and a clock.
pub struct FrameLoop<C: Clock> {
    clock: C,
    pending: RefCell<Vec<FrameCallback>>,
    frame: Cell<u64>,
}

impl<C: Clock> FrameLoop<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            pending: RefCell::new(Vec::new()),
            frame: Cell::new(0),
        }
    }

    /// Run every callback that was requested before this frame started.
    ///
    /// Returns the number of callbacks invoked.
    pub fn run_frame(&self) -> usize {
        // Take the queue first so callbacks can request the next frame.
        let callbacks = std::mem::take(&mut *self.pending.borrow_mut());
        let amount = callbacks.len();
        for callback in callbacks {
            callback();
        }
        self.frame.set(self.frame.get() + 1);
        amount
    }

    /// Number of callbacks waiting for the next frame.
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Number of frames run so far.
    pub fn frame(&self) -> u64 {
        self.frame.get()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<C: Clock> FrameScheduler for FrameLoop<C> {
    fn request_frame(&self, callback: FrameCallback) {
        self.pending.borrow_mut().push(callback);
    }

    fn now(&self) -> Duration {
        self.clock.now()
    }
}

// Callbacks are opaque closures
impl<C: Clock> Debug for FrameLoop<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLoop")
            .field("pending", &self.pending())
            .field("frame", &self.frame())
            .finish()
    }
}

/// Run `frames` once per browser animation frame, forever.
#[cfg(target_arch = "wasm32")]
pub fn run_on_animation_frames<C: Clock + 'static>(frames: Rc<FrameLoop<C>>) -> anyhow::Result<()> {
    use wasm_bindgen::{JsCast, closure::Closure};

    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window available"))?;
    // The closure re-registers itself every frame and therefore owns itself
    let callback: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let next = callback.clone();
    let frame_window = window.clone();
    *callback.borrow_mut() = Some(Closure::new(move || {
        frames.run_frame();
        if let Some(closure) = next.borrow().as_ref() {
            if frame_window
                .request_animation_frame(closure.as_ref().unchecked_ref())
                .is_err()
            {
                log::error!("Could not request the next animation frame");
            }
        }
    }));
    if let Some(closure) = callback.borrow().as_ref() {
        window
            .request_animation_frame(closure.as_ref().unchecked_ref())
            .map_err(|_| anyhow::anyhow!("could not request an animation frame"))?;
    }
    Ok(())
}

/// Run `future` on the browser's event loop, e.g. a model load whose result
/// is handed to the scene once it resolves.
#[cfg(target_arch = "wasm32")]
pub fn spawn_local(future: impl std::future::Future<Output = ()> + 'static) {
    wasm_bindgen_futures::spawn_local(future);
}

/// Initialize logging for the current platform.
///
/// Natively this is `env_logger` (configure with `RUST_LOG`), on the web the
/// browser console. Calling it more than once is harmless.
pub fn init_logging() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            log::debug!("Logger already initialized: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            log::debug!("Logger already initialized: {}", e);
        }
    }
}
