//! Scene graph and hierarchical scene organization.
//!
//! A loaded model is a tree of [`SceneNode`]s. Each node states what it is
//! through an explicit [`NodeKind`]: renderable surfaces carry geometry and
//! materials, groups only structure the tree. Traversal always visits the node
//! itself before its descendants.

use std::rc::Rc;

use crate::data_structures::{
    material::{MaterialRef, Side},
    mesh::Geometry,
    transform::Transform,
};

/// A renderable piece of geometry and the materials it is drawn with.
#[derive(Clone, Debug)]
pub struct Surface {
    pub geometry: Geometry,
    pub materials: Vec<MaterialRef>,
    /// Material name the source file assigned to this surface, used to match
    /// definitions from a separate material file.
    pub material_name: Option<String>,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Surface(Surface),
    Group,
    /// Cameras, lights and other nodes without geometry.
    Other,
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    pub local: Transform,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: &str, kind: NodeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            local: Transform::default(),
            cast_shadow: false,
            receive_shadow: false,
            children: Vec::new(),
        }
    }

    pub fn group(name: &str) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn surface(name: &str, geometry: Geometry, materials: Vec<MaterialRef>) -> Self {
        Self::new(
            name,
            NodeKind::Surface(Surface {
                geometry,
                materials,
                material_name: None,
            }),
        )
    }

    pub fn with_material_name(mut self, material_name: &str) -> Self {
        if let NodeKind::Surface(surface) = &mut self.kind {
            surface.material_name = Some(material_name.to_string());
        }
        self
    }

    pub fn add_child(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    pub fn is_surface(&self) -> bool {
        matches!(self.kind, NodeKind::Surface(_))
    }

    pub fn as_surface(&self) -> Option<&Surface> {
        match &self.kind {
            NodeKind::Surface(surface) => Some(surface),
            _ => None,
        }
    }

    pub fn as_surface_mut(&mut self) -> Option<&mut Surface> {
        match &mut self.kind {
            NodeKind::Surface(surface) => Some(surface),
            _ => None,
        }
    }

    /// Visit this node and all of its descendants, depth first.
    pub fn visit<'a>(&'a self, f: &mut dyn FnMut(&'a SceneNode)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }

    pub fn visit_mut(&mut self, f: &mut dyn FnMut(&mut SceneNode)) {
        f(self);
        for child in self.children.iter_mut() {
            child.visit_mut(f);
        }
    }

    /// Visit the subtree together with each node's placement in the space of
    /// `parent`.
    pub fn visit_placed<'a>(
        &'a self,
        parent: &Transform,
        f: &mut dyn FnMut(&'a SceneNode, &Transform),
    ) {
        let placed = parent.then(&self.local);
        f(self, &placed);
        for child in &self.children {
            child.visit_placed(&placed, f);
        }
    }

    /// Visit every surface in the subtree.
    pub fn surfaces(&self) -> Vec<&Surface> {
        let mut surfaces = Vec::new();
        self.visit(&mut |node| {
            if let Some(surface) = node.as_surface() {
                surfaces.push(surface);
            }
        });
        surfaces
    }

    /// All materials referenced in the subtree, each shared instance once.
    pub fn materials(&self) -> Vec<MaterialRef> {
        let mut materials: Vec<MaterialRef> = Vec::new();
        for surface in self.surfaces() {
            for material in &surface.materials {
                if !materials.iter().any(|known| Rc::ptr_eq(known, material)) {
                    materials.push(material.clone());
                }
            }
        }
        materials
    }

    pub fn count(&self) -> usize {
        let mut count = 0;
        self.visit(&mut |_| count += 1);
        count
    }

    /// Set shadow casting and receiving on every node of the subtree.
    pub fn set_shadows(&mut self, cast: bool, receive: bool) {
        self.visit_mut(&mut |node| {
            node.cast_shadow = cast;
            node.receive_shadow = receive;
        });
    }

    /// Render every material of the subtree from both sides.
    pub fn set_double_sided(&self) {
        for material in self.materials() {
            material.borrow_mut().set_side(Side::Double);
        }
    }
}
