//! glTF 2.0 pipeline.
//!
//! All root nodes of all scenes in the document are flattened into one group.
//! Nodes with a mesh become surfaces (one geometry for all primitives of the
//! mesh), cameras become `Other` nodes, everything else a group.

use std::{collections::HashMap, rc::Rc};

use anyhow::anyhow;

use crate::{
    data_structures::{
        material::{Color, Material, MaterialRef},
        mesh::{Geometry, ModelVertex},
        scene_graph::{NodeKind, SceneNode},
        texture::Texture,
    },
    error::{LoadError, LoadStage, Result},
    resources::{
        io::{decode_data_uri, resolve_relative},
        mesh::compute_tangents,
        texture::{decode_texture, format_of, format_of_mime},
        AssetLoader, ModelDescriptor, ProgressCallback,
    },
};

impl AssetLoader {
    pub(crate) async fn load_gltf(
        &self,
        descriptor: &ModelDescriptor,
        progress: ProgressCallback<'_>,
    ) -> Result<SceneNode> {
        let environment = self.environment.load_environment(&self.environment_url);
        let (mut scene, environment) =
            futures::try_join!(self.load_gltf_scene(descriptor, progress), environment)?;

        scene.set_shadows(true, true);
        for material in scene.materials() {
            match material.try_borrow_mut() {
                Ok(mut material) => {
                    material.set_environment(environment.clone(), self.environment_intensity)
                }
                Err(_) => log::warn!("Skipped environment map of a material in use"),
            }
        }
        if descriptor.material_info.double_sided() {
            scene.set_double_sided();
        }
        Ok(scene)
    }

    async fn load_gltf_scene(
        &self,
        descriptor: &ModelDescriptor,
        progress: ProgressCallback<'_>,
    ) -> Result<SceneNode> {
        let url = descriptor.filename.as_str();
        let document = self.fetch(url, LoadStage::SceneDocument, progress).await?;
        let gltf = gltf::Gltf::from_slice(&document)
            .map_err(|e| LoadError::stage(LoadStage::SceneDocument, url, e.into()))?;

        let buffers = self.load_buffers(&gltf, url, progress).await?;
        let materials = self
            .load_gltf_materials(&gltf, &buffers, url, progress)
            .await?;
        let default_material = Material::new("default").into_ref();

        let mut root = SceneNode::group(url);
        for scene in gltf.scenes() {
            for node in scene.nodes() {
                root.add_child(to_scene_node(node, &buffers, &materials, &default_material));
            }
        }
        log::debug!(
            "{} has {} root node(s) in {} scene(s)",
            url,
            root.children.len(),
            gltf.scenes().len()
        );
        Ok(root)
    }

    async fn load_buffers(
        &self,
        gltf: &gltf::Gltf,
        url: &str,
        progress: ProgressCallback<'_>,
    ) -> Result<Vec<Vec<u8>>> {
        let mut buffer_data = Vec::new();
        for buffer in gltf.buffers() {
            let data = match buffer.source() {
                gltf::buffer::Source::Bin => gltf.blob.clone().ok_or_else(|| {
                    LoadError::stage(LoadStage::Buffer, url, anyhow!("missing binary chunk"))
                })?,
                gltf::buffer::Source::Uri(uri) => match decode_data_uri(uri) {
                    Some(data) => data.map_err(|e| LoadError::stage(LoadStage::Buffer, url, e))?,
                    None => {
                        self.fetch(&resolve_relative(url, uri), LoadStage::Buffer, progress)
                            .await?
                    }
                },
            };
            if data.len() < buffer.length() {
                return Err(LoadError::stage(
                    LoadStage::Buffer,
                    url,
                    anyhow!(
                        "buffer {} holds {} bytes, expected {}",
                        buffer.index(),
                        data.len(),
                        buffer.length()
                    ),
                ));
            }
            buffer_data.push(data);
        }
        Ok(buffer_data)
    }

    /// One material per glTF material, in document order. Images used by
    /// several materials are decoded once.
    async fn load_gltf_materials(
        &self,
        gltf: &gltf::Gltf,
        buffers: &[Vec<u8>],
        url: &str,
        progress: ProgressCallback<'_>,
    ) -> Result<Vec<MaterialRef>> {
        let mut images: HashMap<(usize, bool), Rc<Texture>> = HashMap::new();
        let mut materials = Vec::new();
        for material in gltf.materials() {
            let name = material
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}#{}", url, materials.len()));
            let pbr = material.pbr_metallic_roughness();
            let [r, g, b, _] = pbr.base_color_factor();
            let mut result = Material::new(&name).with_color(Color::new(r, g, b));

            if let Some(info) = pbr.base_color_texture() {
                let diffuse = self
                    .load_image(info.texture().source(), false, &mut images, buffers, url, progress)
                    .await?;
                let normal = match material.normal_texture() {
                    Some(normal) => Some(
                        self.load_image(
                            normal.texture().source(),
                            true,
                            &mut images,
                            buffers,
                            url,
                            progress,
                        )
                        .await?,
                    ),
                    None => None,
                };
                result = result.with_textures(diffuse, normal);
            }
            materials.push(result.into_ref());
        }
        Ok(materials)
    }

    async fn load_image(
        &self,
        image: gltf::Image<'_>,
        is_normal_map: bool,
        images: &mut HashMap<(usize, bool), Rc<Texture>>,
        buffers: &[Vec<u8>],
        url: &str,
        progress: ProgressCallback<'_>,
    ) -> Result<Rc<Texture>> {
        let key = (image.index(), is_normal_map);
        if let Some(texture) = images.get(&key) {
            return Ok(texture.clone());
        }
        let texture = match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                let start = view.offset();
                let end = start + view.length();
                let data = buffers
                    .get(view.buffer().index())
                    .and_then(|buffer| buffer.get(start..end))
                    .ok_or_else(|| {
                        LoadError::stage(
                            LoadStage::Texture,
                            url,
                            anyhow!("image {} points outside of its buffer", image.index()),
                        )
                    })?;
                let label = format!("{}#image{}", url, image.index());
                decode_texture(data, &label, format_of_mime(mime_type), is_normal_map)?
            }
            gltf::image::Source::Uri { uri, mime_type } => match decode_data_uri(uri) {
                Some(data) => {
                    let label = format!("{}#image{}", url, image.index());
                    let data = data.map_err(|e| LoadError::stage(LoadStage::Texture, &label, e))?;
                    decode_texture(&data, &label, mime_type.and_then(format_of_mime), is_normal_map)?
                }
                None => {
                    let path = resolve_relative(url, uri);
                    let data = self.fetch(&path, LoadStage::Texture, progress).await?;
                    let format = mime_type.and_then(format_of_mime).or(format_of(&path));
                    decode_texture(&data, &path, format, is_normal_map)?
                }
            },
        };
        images.insert(key, texture.clone());
        Ok(texture)
    }
}

fn to_scene_node(
    node: gltf::Node,
    buffers: &[Vec<u8>],
    materials: &[MaterialRef],
    default_material: &MaterialRef,
) -> SceneNode {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node{}", node.index()));
    let mut scene_node = match node.mesh() {
        Some(mesh) => {
            let mut surface_materials: Vec<MaterialRef> = Vec::new();
            for primitive in mesh.primitives() {
                let material = primitive
                    .material()
                    .index()
                    .and_then(|index| materials.get(index))
                    .unwrap_or(default_material);
                if !surface_materials.iter().any(|known| Rc::ptr_eq(known, material)) {
                    surface_materials.push(material.clone());
                }
            }
            let material_name = primitive_material_name(&mesh);
            let surface = SceneNode::surface(&name, mesh_geometry(&mesh, buffers), surface_materials);
            match material_name {
                Some(material_name) => surface.with_material_name(&material_name),
                None => surface,
            }
        }
        None if node.camera().is_some() => SceneNode::new(&name, NodeKind::Other),
        None => SceneNode::group(&name),
    };
    scene_node.local = node.transform().decomposed().into();
    for child in node.children() {
        scene_node.add_child(to_scene_node(child, buffers, materials, default_material));
    }
    scene_node
}

fn primitive_material_name(mesh: &gltf::Mesh) -> Option<String> {
    mesh.primitives()
        .find_map(|primitive| primitive.material().name().map(str::to_string))
}

/// Merge all primitives of `mesh` into one geometry.
fn mesh_geometry(mesh: &gltf::Mesh, buffers: &[Vec<u8>]) -> Geometry {
    let mut geometry = Geometry {
        name: mesh.name().unwrap_or("unknown_mesh").to_string(),
        ..Default::default()
    };
    for primitive in mesh.primitives() {
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
        let Some(positions) = reader.read_positions() else {
            log::warn!("Skipped a primitive without positions in {}", geometry.name);
            continue;
        };
        let mut vertices: Vec<ModelVertex> = positions
            .map(|position| ModelVertex {
                position,
                ..Default::default()
            })
            .collect();
        if let Some(normals) = reader.read_normals() {
            for (vertex, normal) in vertices.iter_mut().zip(normals) {
                vertex.normal = normal;
            }
        }
        if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
            for (vertex, tex_coord) in vertices.iter_mut().zip(tex_coords) {
                vertex.tex_coords = tex_coord;
            }
        }
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..vertices.len() as u32).collect(),
        };
        match reader.read_tangents() {
            Some(tangents) => {
                for (vertex, tangent) in vertices.iter_mut().zip(tangents) {
                    // The fourth component is the handedness of the bitangent
                    let tangent: cgmath::Vector4<f32> = tangent.into();
                    let normal: cgmath::Vector3<f32> = vertex.normal.into();
                    vertex.tangent = tangent.truncate().into();
                    vertex.bitangent = (normal.cross(tangent.truncate()) * tangent.w).into();
                }
            }
            None => compute_tangents(&mut vertices, &indices),
        }

        let base = geometry.vertices.len() as u32;
        geometry.vertices.extend(vertices);
        geometry.indices.extend(indices.into_iter().map(|index| base + index));
    }
    geometry
}
