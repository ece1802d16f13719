//! Scene data: products, scene graphs, materials, textures, and geometry.
//!
//! - `product` holds a configurable product and its running animations
//! - `scene_graph` enables hierarchical scene organization
//! - `material` holds the mutable, shared materials color changes act on
//! - `texture` contains decoded images
//! - `mesh` holds CPU-side vertex and index data
//! - `transform` places nodes relative to their parents

pub mod material;
pub mod mesh;
pub mod product;
pub mod scene_graph;
pub mod texture;
pub mod transform;
