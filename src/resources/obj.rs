//! Wavefront OBJ pipeline.

use std::{
    collections::HashMap,
    io::{BufReader, Cursor},
};

use anyhow::Context as _;

use crate::{
    data_structures::{
        material::{Color, Material, MaterialRef},
        scene_graph::SceneNode,
    },
    error::{LoadError, LoadStage, Result},
    resources::{
        io::resolve_relative, mesh::geometry_from_obj, AssetLoader, MaterialInfo,
        ModelDescriptor, ProgressCallback,
    },
};

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    }
}

/// Parse OBJ text against the material file named by the descriptor.
///
/// `mtllib` lines of the OBJ are replaced by a single one for `mtl`, so
/// `usemtl` names resolve against that file regardless of what the OBJ
/// references. Returns the models and the material list their ids index.
fn parse_obj(
    obj: &[u8],
    mtl: Option<(&str, &[u8])>,
) -> anyhow::Result<(Vec<tobj::Model>, Vec<tobj::Material>)> {
    let mut source = Vec::with_capacity(obj.len());
    if let Some((path, _)) = mtl {
        source.extend_from_slice(format!("mtllib {path}\n").as_bytes());
    }
    for line in obj.split_inclusive(|&byte| byte == b'\n') {
        if !is_mtllib(line) {
            source.extend_from_slice(line);
        }
    }

    let mut reader = BufReader::new(Cursor::new(source));
    let (models, materials) = tobj::load_obj_buf(&mut reader, &load_options(), |_| match mtl {
        Some((_, mtl)) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mtl))),
        None => Err(tobj::LoadError::OpenFileFailed),
    })?;
    Ok((models, materials.unwrap_or_default()))
}

fn is_mtllib(line: &[u8]) -> bool {
    line.trim_ascii_start()
        .strip_prefix(b"mtllib")
        .is_some_and(|rest| rest.first().is_none_or(u8::is_ascii_whitespace))
}

impl AssetLoader {
    pub(crate) async fn load_obj(
        &self,
        descriptor: &ModelDescriptor,
        progress: ProgressCallback<'_>,
    ) -> Result<SceneNode> {
        let url = descriptor.filename.as_str();
        let obj = self.fetch(url, LoadStage::Geometry, progress).await?;

        let mut scene = match &descriptor.material_info {
            MaterialInfo::FromMaterialFile { path, .. } => {
                let mtl = self.fetch(path, LoadStage::MaterialFile, progress).await?;
                let (definitions, _) = tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(&mtl)))
                    .with_context(|| format!("could not parse material file {path}"))
                    .map_err(|e| LoadError::stage(LoadStage::MaterialFile, path, e))?;
                let (models, used) = parse_obj(&obj, Some((path, mtl.as_slice())))
                    .map_err(|e| LoadError::stage(LoadStage::Geometry, url, e))?;

                let mut by_name = HashMap::with_capacity(definitions.len());
                for definition in &definitions {
                    let material = self.material_from_mtl(definition, path, progress).await?;
                    by_name.entry(definition.name.clone()).or_insert(material);
                }
                build_scene(url, &models, |model| {
                    let material = model
                        .mesh
                        .material_id
                        .and_then(|id| used.get(id))
                        .and_then(|used| by_name.get(&used.name))
                        .cloned();
                    if material.is_none() {
                        log::debug!(
                            "No material of {} matches surface {} of {}, keeping the default",
                            path,
                            model.name,
                            url
                        );
                    }
                    material
                })
            }
            MaterialInfo::RawTextures {
                diffuse, normal, ..
            } => {
                let (models, _) = parse_obj(&obj, None)
                    .map_err(|e| LoadError::stage(LoadStage::Geometry, url, e))?;
                let diffuse_map = self.load_texture(diffuse, false, progress).await?;
                let normal_map = match normal {
                    Some(normal) => Some(self.load_texture(normal, true, progress).await?),
                    None => None,
                };
                let shared = Material::new(diffuse)
                    .with_textures(diffuse_map, normal_map)
                    .into_ref();
                build_scene(url, &models, |_| Some(shared.clone()))
            }
        };

        self.post_process(&mut scene, descriptor.material_info.double_sided());
        Ok(scene)
    }

    /// Build a material from an MTL definition. Texture paths are relative to
    /// the material file.
    async fn material_from_mtl(
        &self,
        definition: &tobj::Material,
        mtl_path: &str,
        progress: ProgressCallback<'_>,
    ) -> Result<MaterialRef> {
        let mut material = Material::new(&definition.name);
        if let Some([r, g, b]) = definition.diffuse {
            material = material.with_color(Color::new(r, g, b));
        }
        if let Some(diffuse) = &definition.diffuse_texture {
            let diffuse_map = self
                .load_texture(&resolve_relative(mtl_path, diffuse), false, progress)
                .await?;
            let normal_map = match &definition.normal_texture {
                Some(normal) => Some(
                    self.load_texture(&resolve_relative(mtl_path, normal), true, progress)
                        .await?,
                ),
                None => None,
            };
            material = material.with_textures(diffuse_map, normal_map);
        }
        Ok(material.into_ref())
    }
}

/// One surface per OBJ model below a group named after the file. Surfaces for
/// which `material_for` has no material get a plain default material and no
/// material name.
fn build_scene(
    url: &str,
    models: &[tobj::Model],
    material_for: impl Fn(&tobj::Model) -> Option<MaterialRef>,
) -> SceneNode {
    let mut root = SceneNode::group(url);
    for model in models {
        let geometry = geometry_from_obj(model);
        let node = match material_for(model) {
            Some(material) => {
                let material_name = material.borrow().name.clone();
                SceneNode::surface(&model.name, geometry, vec![material])
                    .with_material_name(&material_name)
            }
            None => SceneNode::surface(
                &model.name,
                geometry,
                vec![Material::new(&model.name).into_ref()],
            ),
        };
        root.add_child(node);
    }
    log::debug!("{} contains {} surface(s)", url, models.len());
    root
}

