use std::{cell::RefCell, rc::Rc};

use flow_configurator::{
    config::Config,
    context::Context,
    data_structures::{
        material::{Color, MaterialRaw, Side},
        product::ProductItem,
        scene_graph::NodeKind,
        transform::Transform,
    },
    error::{LoadError, LoadStage},
    flow::ManualClock,
    resources::{io::MemorySource, LoadProgress, MaterialInfo, ModelDescriptor},
};
use futures::executor::block_on;

use crate::common::test_utils::{
    color, loader, png_bytes, showroom, CHAIR_OBJ, ENVIRONMENT_URL,
};

mod common;

fn chair() -> ModelDescriptor {
    ModelDescriptor::new(
        "chair.obj",
        MaterialInfo::FromMaterialFile {
            path: "chair.mtl".to_string(),
            double_sided: false,
        },
    )
}

fn table(double_sided: bool) -> ModelDescriptor {
    ModelDescriptor::new(
        "table.obj",
        MaterialInfo::RawTextures {
            diffuse: "textures/wood.png".to_string(),
            normal: Some("textures/wood_normal.png".to_string()),
            double_sided,
        },
    )
}

fn lamp(double_sided: bool) -> ModelDescriptor {
    ModelDescriptor::new(
        "lamp.gltf",
        MaterialInfo::FromMaterialFile {
            path: String::new(),
            double_sided,
        },
    )
}

#[test]
fn should_match_material_file_definitions_by_name() {
    let loader = loader(Rc::new(showroom()));

    let asset = block_on(loader.load_asset(&chair())).expect("chair loads");

    let surfaces = asset.scene.surfaces();
    assert_eq!(surfaces.len(), 2);
    let seat = surfaces[0];
    assert_eq!(seat.geometry.name, "seat");
    assert_eq!(seat.material_name.as_deref(), Some("fabric"));
    assert_eq!(seat.materials[0].borrow().color(), Some(color(0.8, 0.1, 0.1)));
    let legs = surfaces[1];
    assert_eq!(legs.material_name, None);
    assert_eq!(legs.materials[0].borrow().color(), Some(color(1.0, 1.0, 1.0)));
    assert_eq!(asset.descriptor, chair());
}

fn seat_material_with(obj: String) -> (Option<String>, Option<Color>) {
    let files = showroom().with_file("seat.obj", obj);
    let loader = loader(Rc::new(files));

    let asset = block_on(loader.load_asset(&ModelDescriptor::new(
        "seat.obj",
        MaterialInfo::FromMaterialFile {
            path: "chair.mtl".to_string(),
            double_sided: false,
        },
    )))
    .expect("seat loads");

    let seat = asset.scene.surfaces()[0];
    let color = seat.materials[0].borrow().color();
    (seat.material_name.clone(), color)
}

#[test]
fn should_match_materials_when_the_obj_has_no_mtllib() {
    let obj = CHAIR_OBJ.replace("mtllib chair.mtl\n", "");

    assert_eq!(
        seat_material_with(obj),
        (Some("fabric".to_string()), Some(color(0.8, 0.1, 0.1)))
    );
}

#[test]
fn should_match_materials_when_the_obj_has_several_mtllibs() {
    let obj = CHAIR_OBJ.replace("mtllib chair.mtl\n", "mtllib a.mtl\nmtllib b.mtl\n");

    assert_eq!(
        seat_material_with(obj),
        (Some("fabric".to_string()), Some(color(0.8, 0.1, 0.1)))
    );
}

#[test]
fn should_ignore_the_mtllib_named_by_the_obj() {
    let obj = CHAIR_OBJ.replace("mtllib chair.mtl", "mtllib elsewhere/other.mtl");

    assert_eq!(
        seat_material_with(obj),
        (Some("fabric".to_string()), Some(color(0.8, 0.1, 0.1)))
    );
}

#[test]
fn should_cast_and_receive_shadows_everywhere() {
    let loader = loader(Rc::new(showroom()));

    let asset = block_on(loader.load_asset(&chair())).expect("chair loads");

    let mut nodes = 0;
    asset.scene.visit(&mut |node| {
        nodes += 1;
        assert!(node.cast_shadow && node.receive_shadow, "{}", node.name);
    });
    assert_eq!(nodes, 3);
}

#[test]
fn should_share_one_material_for_raw_textures() {
    let loader = loader(Rc::new(showroom()));

    let asset = block_on(loader.load_asset(&table(true))).expect("table loads");

    let surfaces = asset.scene.surfaces();
    assert_eq!(surfaces.len(), 2);
    assert!(Rc::ptr_eq(&surfaces[0].materials[0], &surfaces[1].materials[0]));
    let materials = asset.scene.materials();
    assert_eq!(materials.len(), 1);
    let material = materials[0].borrow();
    assert_eq!(material.side, Side::Double);
    assert!(material.normal_map.as_ref().is_some_and(|map| map.is_normal_map));
    let raw = material.to_raw();
    assert_eq!(
        raw.flags,
        MaterialRaw::HAS_DIFFUSE_MAP | MaterialRaw::HAS_NORMAL_MAP | MaterialRaw::DOUBLE_SIDED
    );
}

#[test]
fn should_stay_single_sided_unless_requested() {
    let loader = loader(Rc::new(showroom()));

    let asset = block_on(loader.load_asset(&table(false))).expect("table loads");

    assert_eq!(asset.scene.materials()[0].borrow().side, Side::Front);
}

#[test]
fn should_flatten_gltf_roots_into_one_group() {
    let loader = loader(Rc::new(showroom()));

    let asset = block_on(loader.load_asset(&lamp(true))).expect("lamp loads");

    let root = &asset.scene;
    assert!(matches!(root.kind, NodeKind::Group));
    let names: Vec<_> = root.children.iter().map(|child| child.name.as_str()).collect();
    assert_eq!(names, vec!["shade", "base"]);
    assert_eq!(root.children[0].local.position, cgmath::Vector3::new(0.0, 2.0, 0.0));
    assert!(matches!(root.children[1].children[0].kind, NodeKind::Other));

    let shade = root.children[0].as_surface().expect("shade is a surface");
    assert_eq!(shade.geometry.vertices.len(), 3);
    assert_eq!(shade.geometry.indices, vec![0, 1, 2]);
    assert_eq!(shade.material_name.as_deref(), Some("brass"));
    assert_eq!(root.count(), 4);

    let mut placed = Vec::new();
    root.visit_placed(&Transform::default(), &mut |node, transform| {
        placed.push((node.name.clone(), transform.position))
    });
    assert_eq!(placed[1], ("shade".to_string(), cgmath::Vector3::new(0.0, 2.0, 0.0)));
}

#[test]
fn should_apply_the_environment_to_gltf_materials() {
    let loader = loader(Rc::new(showroom()));

    let asset = block_on(loader.load_asset(&lamp(true))).expect("lamp loads");

    let materials = asset.scene.materials();
    assert_eq!(materials.len(), 1);
    let material = materials[0].borrow();
    assert_eq!(material.color(), Some(color(0.2, 0.4, 0.6)));
    assert!(material.environment_map.is_some());
    assert_eq!(material.environment_intensity, 0.1);
    assert!(material.needs_update);
    assert_eq!(material.side, Side::Double);
    assert!(loader.environment().is_cached(ENVIRONMENT_URL));
}

#[test]
fn should_report_progress_per_stage() {
    let loader = loader(Rc::new(showroom()));
    let updates: RefCell<Vec<LoadProgress>> = RefCell::new(Vec::new());

    block_on(loader.load_asset_with_progress(&table(false), &|progress| {
        updates.borrow_mut().push(progress.clone())
    }))
    .expect("table loads");

    let stages: Vec<_> = updates
        .borrow()
        .iter()
        .map(|update| (update.url.clone(), update.stage))
        .collect();
    assert_eq!(
        stages,
        vec![
            ("table.obj".to_string(), LoadStage::Geometry),
            ("textures/wood.png".to_string(), LoadStage::Texture),
            ("textures/wood_normal.png".to_string(), LoadStage::Texture),
        ]
    );
    assert!(updates
        .borrow()
        .iter()
        .all(|update| Some(update.loaded) == update.total));
}

#[test]
fn should_reject_unsupported_formats() {
    let loader = loader(Rc::new(showroom()));

    let result = block_on(loader.load_asset(&ModelDescriptor::new(
        "chair.fbx",
        MaterialInfo::FromMaterialFile {
            path: "chair.mtl".to_string(),
            double_sided: false,
        },
    )));

    assert_eq!(
        result.map(|_| ()),
        Err(LoadError::UnsupportedFormat {
            filename: "chair.fbx".to_string(),
            extension: "fbx".to_string(),
        })
    );
}

#[test]
fn should_dispatch_on_the_lowercase_extension() {
    let files = showroom().with_file("CHAIR.OBJ", common::test_utils::CHAIR_OBJ);
    let loader = loader(Rc::new(files));

    let descriptor = ModelDescriptor::new(
        "CHAIR.OBJ",
        MaterialInfo::FromMaterialFile {
            path: "chair.mtl".to_string(),
            double_sided: false,
        },
    );

    assert!(block_on(loader.load_asset(&descriptor)).is_ok());
}

#[test]
fn should_name_the_failing_stage() {
    let files = showroom().with_file("textures/broken.png", "not a png");
    let loader = loader(Rc::new(files));

    let missing_geometry = block_on(loader.load_asset(&ModelDescriptor::new(
        "missing.obj",
        MaterialInfo::FromMaterialFile {
            path: "chair.mtl".to_string(),
            double_sided: false,
        },
    )))
    .map(|_| ())
    .unwrap_err();
    let missing_material_file = block_on(loader.load_asset(&ModelDescriptor::new(
        "chair.obj",
        MaterialInfo::FromMaterialFile {
            path: "missing.mtl".to_string(),
            double_sided: false,
        },
    )))
    .map(|_| ())
    .unwrap_err();
    let broken_texture = block_on(loader.load_asset(&ModelDescriptor::new(
        "table.obj",
        MaterialInfo::RawTextures {
            diffuse: "textures/broken.png".to_string(),
            normal: None,
            double_sided: false,
        },
    )))
    .map(|_| ())
    .unwrap_err();

    assert!(matches!(
        missing_geometry,
        LoadError::Stage { stage: LoadStage::Geometry, ref url, .. } if url == "missing.obj"
    ));
    assert_eq!(missing_material_file.failed_stage(), Some(LoadStage::MaterialFile));
    assert_eq!(broken_texture.failed_stage(), Some(LoadStage::Texture));
}

#[test]
fn should_resolve_mtl_textures_relative_to_the_material_file() {
    let files = MemorySource::new()
        .with_file("models/sofa.obj", common::test_utils::CHAIR_OBJ)
        .with_file("models/sofa.mtl", "newmtl fabric\nmap_Kd sofa.png\n")
        .with_file("models/sofa.png", png_bytes([10, 20, 30, 255]));
    let loader = loader(Rc::new(files));

    let asset = block_on(loader.load_asset(&ModelDescriptor::new(
        "models/sofa.obj",
        MaterialInfo::FromMaterialFile {
            path: "models/sofa.mtl".to_string(),
            double_sided: false,
        },
    )))
    .expect("sofa loads");

    let seat = asset.scene.surfaces()[0].materials[0].clone();
    let seat = seat.borrow();
    assert_eq!(
        seat.diffuse_map.as_ref().map(|map| map.label.as_str()),
        Some("models/sofa.png")
    );
}

#[test]
fn should_load_a_product_through_the_context() {
    let context = Context::with_source(
        Config {
            environment_url: ENVIRONMENT_URL.to_string(),
            ..Config::default()
        },
        Rc::new(showroom()),
        Rc::new(ManualClock::new()),
    );
    let mut product = ProductItem::new("set", "Dining set").with_description("Table and lamp");

    block_on(context.load_product(&mut product, &[table(false), lamp(false)]))
        .expect("product loads");

    assert_eq!(product.assets.len(), 2);
    assert_eq!(product.materials().len(), 2);
    assert_eq!(context.environment().len(), 1);
}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::test]
async fn should_read_assets_from_the_file_system() {
    use flow_configurator::resources::io::FileSource;

    let root = std::env::temp_dir().join(format!("flow-configurator-{}", std::process::id()));
    std::fs::create_dir_all(root.join("textures")).expect("create asset dir");
    std::fs::write(root.join("table.obj"), common::test_utils::TABLE_OBJ).expect("write obj");
    std::fs::write(root.join("textures/wood.png"), png_bytes([150, 100, 50, 255]))
        .expect("write texture");
    std::fs::write(root.join("textures/wood_normal.png"), png_bytes([127, 127, 255, 255]))
        .expect("write normal map");
    let loader = loader(Rc::new(FileSource::new(&root)));
    let updates = RefCell::new(Vec::new());

    let asset = loader
        .load_asset_with_progress(&table(false), &|progress| {
            updates.borrow_mut().push(progress.clone())
        })
        .await
        .expect("table loads from disk");

    assert_eq!(asset.scene.surfaces().len(), 2);
    let obj_update = updates.borrow()[0].clone();
    assert_eq!(obj_update.stage, LoadStage::Geometry);
    assert_eq!(
        Some(obj_update.loaded),
        Some(common::test_utils::TABLE_OBJ.len() as u64)
    );
    assert_eq!(obj_update.total, Some(obj_update.loaded));
    std::fs::remove_dir_all(&root).ok();
}
