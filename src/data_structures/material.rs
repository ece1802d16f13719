//! Materials attached to surface nodes.
//!
//! Materials live in the scene graph as [`MaterialRef`]s. Several surfaces may
//! share one material (the `RawTextures` pipeline assigns a single instance to
//! every surface), and running color animations hold weak references to the
//! same cells, mutating them in place.

use std::{cell::RefCell, rc::Rc};

use crate::data_structures::texture::Texture;

/// Linear RGB color with channels in `[0, 1]`.
pub type Color = cgmath::Vector3<f32>;

/// Shared, mutable handle to a material in the live scene graph.
pub type MaterialRef = Rc<RefCell<Material>>;

/// Which faces of a surface are rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

#[derive(Clone, Debug)]
pub struct Material {
    pub name: String,
    /// `None` for materials without a flat color slot (e.g. pure texture or
    /// debug materials); those are skipped by color animations.
    color: Option<Color>,
    pub diffuse_map: Option<Rc<Texture>>,
    pub normal_map: Option<Rc<Texture>>,
    pub side: Side,
    pub environment_map: Option<Rc<Texture>>,
    pub environment_intensity: f32,
    /// Set whenever a property changed that the renderer has to re-upload.
    pub needs_update: bool,
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            color: Some(Color::new(1.0, 1.0, 1.0)),
            diffuse_map: None,
            normal_map: None,
            side: Side::Front,
            environment_map: None,
            environment_intensity: 1.0,
            needs_update: true,
        }
    }

    /// A material that carries textures only and cannot be tinted.
    pub fn without_color(name: &str) -> Self {
        Self {
            color: None,
            ..Self::new(name)
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_textures(mut self, diffuse: Rc<Texture>, normal: Option<Rc<Texture>>) -> Self {
        self.diffuse_map = Some(diffuse);
        self.normal_map = normal;
        self
    }

    pub fn into_ref(self) -> MaterialRef {
        Rc::new(RefCell::new(self))
    }

    /// Whether a flat color can be assigned to this material.
    pub fn supports_flat_color(&self) -> bool {
        self.color.is_some()
    }

    pub fn color(&self) -> Option<Color> {
        self.color
    }

    /// Assign a flat color. Returns `false` (and changes nothing) when the
    /// material has no color slot.
    pub fn set_color(&mut self, color: Color) -> bool {
        match &mut self.color {
            Some(current) => {
                *current = color;
                self.needs_update = true;
                true
            }
            None => false,
        }
    }

    pub fn set_environment(&mut self, texture: Rc<Texture>, intensity: f32) {
        self.environment_map = Some(texture);
        self.environment_intensity = intensity;
        self.needs_update = true;
    }

    pub fn set_side(&mut self, side: Side) {
        if self.side != side {
            self.side = side;
            self.needs_update = true;
        }
    }

    /// Pack the material for upload if it changed since the last call.
    pub fn take_update(&mut self) -> Option<MaterialRaw> {
        if !self.needs_update {
            return None;
        }
        self.needs_update = false;
        Some(self.to_raw())
    }

    pub fn to_raw(&self) -> MaterialRaw {
        let color = self.color.unwrap_or(Color::new(1.0, 1.0, 1.0));
        let flags = u32::from(self.diffuse_map.is_some()) * MaterialRaw::HAS_DIFFUSE_MAP
            | u32::from(self.normal_map.is_some()) * MaterialRaw::HAS_NORMAL_MAP
            | u32::from(self.environment_map.is_some()) * MaterialRaw::HAS_ENVIRONMENT_MAP
            | u32::from(self.side == Side::Double) * MaterialRaw::DOUBLE_SIDED;
        MaterialRaw {
            color: color.into(),
            environment_intensity: self.environment_intensity,
            flags,
            _padding: [0; 3],
        }
    }
}

/**
 * The raw material is the uniform block the renderer uploads for each material.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialRaw {
    pub color: [f32; 3],
    pub environment_intensity: f32,
    pub flags: u32,
    _padding: [u32; 3],
}

impl MaterialRaw {
    pub const HAS_DIFFUSE_MAP: u32 = 1;
    pub const HAS_NORMAL_MAP: u32 = 1 << 1;
    pub const HAS_ENVIRONMENT_MAP: u32 = 1 << 2;
    pub const DOUBLE_SIDED: u32 = 1 << 3;
}
