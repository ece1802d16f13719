//! Animated material color changes.
//!
//! A [`ColorChangeEvent`] names the materials to recolor, either directly or
//! through a scene subtree, and the [`MaterialColorChanger`] drives all of them
//! towards the target color with a single [`Animation`].

use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use instant::Duration;

use crate::{
    animation::{
        driver::{create_animation, Animation},
        registry::{ActiveEvents, EventCategory},
    },
    data_structures::{
        material::{Color, Material, MaterialRef},
        scene_graph::SceneNode,
    },
    events::{SelectionChannel, SubscriptionId},
    flow::FrameScheduler,
};

/// How a color change is played back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnimationKind {
    /// Jump to the target color immediately.
    None,
    #[default]
    Linear,
}

/// Request to recolor materials, published by the selection subsystem.
#[derive(Clone, Debug)]
pub struct ColorChangeEvent {
    /// Active events of the entity the materials belong to. The animation is
    /// registered here so it can be cancelled by category.
    pub owner: ActiveEvents,
    pub materials: Vec<MaterialRef>,
    /// Every flat-colored surface material below this node is recolored too.
    pub root: Option<Rc<SceneNode>>,
    pub color: Color,
    pub kind: AnimationKind,
}

impl ColorChangeEvent {
    pub fn new(owner: &ActiveEvents, color: Color, kind: AnimationKind) -> Self {
        Self {
            owner: owner.clone(),
            materials: Vec::new(),
            root: None,
            color,
            kind,
        }
    }

    pub fn with_materials(mut self, materials: Vec<MaterialRef>) -> Self {
        self.materials = materials;
        self
    }

    pub fn with_root(mut self, root: Rc<SceneNode>) -> Self {
        self.root = Some(root);
        self
    }
}

/// One material of a running color change.
///
/// `start` is the color the material had when the change began, `delta` the
/// distance to `target`. Neither changes while the animation runs.
#[derive(Clone, Debug)]
pub struct AnimatableColorItem {
    pub start: Color,
    pub delta: Color,
    pub target: Color,
    pub material: Weak<RefCell<Material>>,
}

impl AnimatableColorItem {
    /// Snapshot the current color of `material`. Returns `None` for materials
    /// without a flat color.
    pub fn new(material: &MaterialRef, target: Color) -> Option<Self> {
        let start = material.try_borrow().ok()?.color()?;
        Some(Self {
            start,
            delta: target - start,
            target,
            material: Rc::downgrade(material),
        })
    }

    /// Color at `progress`. Progress 1 yields the target exactly.
    pub fn color_at(&self, progress: f32) -> Color {
        if progress >= 1.0 {
            self.target
        } else {
            self.start + self.delta * progress
        }
    }

    /// Write the color at `progress` into the material. Returns `false` when
    /// the material is gone or in use elsewhere.
    pub fn apply(&self, progress: f32) -> bool {
        let Some(material) = self.material.upgrade() else {
            return false;
        };
        let Ok(mut material) = material.try_borrow_mut() else {
            return false;
        };
        material.set_color(self.color_at(progress))
    }
}

fn apply_all(items: &[AnimatableColorItem], progress: f32) {
    for item in items {
        if !item.apply(progress) {
            log::warn!("Skipped a color update of an unavailable material");
        }
    }
}

/// Collect the recolorable materials of `event`, each shared material once.
fn working_set(event: &ColorChangeEvent) -> Vec<AnimatableColorItem> {
    let mut materials: Vec<MaterialRef> = Vec::new();
    let mut push = |material: &MaterialRef| {
        if !materials.iter().any(|known| Rc::ptr_eq(known, material)) {
            materials.push(material.clone());
        }
    };
    for material in &event.materials {
        push(material);
    }
    if let Some(root) = &event.root {
        root.visit(&mut |node| {
            if let Some(surface) = node.as_surface() {
                for material in &surface.materials {
                    if material
                        .try_borrow()
                        .is_ok_and(|material| material.supports_flat_color())
                    {
                        push(material);
                    }
                }
            }
        });
    }
    materials
        .iter()
        .filter_map(|material| AnimatableColorItem::new(material, event.color))
        .collect()
}

/// Applies [`ColorChangeEvent`]s to the scene.
pub struct MaterialColorChanger {
    scheduler: Rc<dyn FrameScheduler>,
    linear_duration: Duration,
}

impl MaterialColorChanger {
    pub fn new(scheduler: Rc<dyn FrameScheduler>, linear_duration: Duration) -> Self {
        Self {
            scheduler,
            linear_duration,
        }
    }

    /// Playback duration of `kind`.
    pub fn duration_of(&self, kind: AnimationKind) -> Duration {
        match kind {
            AnimationKind::None => Duration::ZERO,
            AnimationKind::Linear => self.linear_duration,
        }
    }

    /// Recolor the materials of `event` using the duration of its kind.
    pub fn handle(&self, event: &ColorChangeEvent) -> Option<Animation> {
        self.change_color(event, self.duration_of(event.kind))
    }

    /// Recolor the materials of `event` over `duration`.
    ///
    /// A zero duration applies the target color right away and returns `None`.
    /// Otherwise one animation, started on the next frame, drives all
    /// materials. Running color changes are not cancelled; callers clear them
    /// with [`clear_events`](crate::animation::registry::clear_events) first
    /// if needed.
    pub fn change_color(&self, event: &ColorChangeEvent, duration: Duration) -> Option<Animation> {
        let items = working_set(event);
        if items.is_empty() {
            log::debug!("Color change without recolorable materials");
        }

        if duration.is_zero() {
            apply_all(&items, 1.0);
            return None;
        }

        log::debug!(
            "Animating {} material(s) to {:?} over {:?}",
            items.len(),
            event.color,
            duration
        );
        let animation = create_animation(
            &event.owner,
            EventCategory::ColorChange,
            duration,
            move |progress| apply_all(&items, progress),
            self.scheduler.clone(),
        );
        animation.start();
        Some(animation)
    }

    /// Handle every event published on `channel`.
    pub fn subscribe(
        self: &Rc<Self>,
        channel: &SelectionChannel<ColorChangeEvent>,
    ) -> SubscriptionId {
        let changer = Rc::downgrade(self);
        channel.subscribe(move |event| {
            if let Some(changer) = changer.upgrade() {
                changer.handle(event);
            }
        })
    }
}
