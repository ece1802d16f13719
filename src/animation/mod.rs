pub mod color;
pub mod driver;
pub mod registry;

pub use color::{AnimatableColorItem, AnimationKind, ColorChangeEvent, MaterialColorChanger};
pub use driver::{create_animation, Animation, AnimationState};
pub use registry::{clear_events, ActiveEvent, ActiveEvents, Cancel, EventCategory, EventId};
