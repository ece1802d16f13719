use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    future::Future,
    io::Cursor,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use flow_configurator::{
    data_structures::material::{Color, Material, MaterialRef},
    flow::{FrameLoop, FrameScheduler, ManualClock},
    resources::{
        environment::EnvironmentCache,
        io::{AssetSource, FetchProgress, MemorySource},
        AssetLoader,
    },
};
use futures::future::{FutureExt, LocalBoxFuture};

pub(crate) const ENVIRONMENT_URL: &str = "textures/environment.png";

pub(crate) type ManualFrames = FrameLoop<Rc<ManualClock>>;

/// A frame loop whose clock only moves when the test says so.
pub(crate) fn manual_frames() -> (Rc<ManualClock>, Rc<ManualFrames>) {
    let clock = Rc::new(ManualClock::new());
    let frames = Rc::new(FrameLoop::new(clock.clone()));
    (clock, frames)
}

pub(crate) fn scheduler(frames: &Rc<ManualFrames>) -> Rc<dyn FrameScheduler> {
    frames.clone()
}

pub(crate) fn color(r: f32, g: f32, b: f32) -> Color {
    Color::new(r, g, b)
}

pub(crate) fn flat_material(name: &str, initial: Color) -> MaterialRef {
    Material::new(name).with_color(initial).into_ref()
}

pub(crate) fn color_of(material: &MaterialRef) -> Color {
    material.borrow().color().expect("material has a color slot")
}

/// A 2x2 PNG filled with `rgba`.
pub(crate) fn png_bytes(rgba: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .expect("encode png");
    bytes.into_inner()
}

/// Resolves on the second poll so that concurrently awaited loads interleave.
struct YieldNow(bool);

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            return Poll::Ready(());
        }
        self.0 = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// In-memory source that counts reads per path.
pub(crate) struct CountingSource {
    files: MemorySource,
    reads: RefCell<HashMap<String, usize>>,
    yield_first: Cell<bool>,
}

impl CountingSource {
    pub(crate) fn new(files: MemorySource) -> Self {
        Self {
            files,
            reads: RefCell::new(HashMap::new()),
            yield_first: Cell::new(false),
        }
    }

    /// Suspend once before serving each read.
    pub(crate) fn yielding(self) -> Self {
        self.yield_first.set(true);
        self
    }

    pub(crate) fn reads(&self, path: &str) -> usize {
        self.reads.borrow().get(path).copied().unwrap_or(0)
    }
}

impl AssetSource for CountingSource {
    fn read_bytes<'a>(
        &'a self,
        path: &'a str,
        progress: FetchProgress<'a>,
    ) -> LocalBoxFuture<'a, anyhow::Result<Vec<u8>>> {
        *self.reads.borrow_mut().entry(path.to_string()).or_default() += 1;
        let yield_first = self.yield_first.get();
        async move {
            if yield_first {
                YieldNow(false).await;
            }
            self.files.read_bytes(path, progress).await
        }
        .boxed_local()
    }
}

pub(crate) fn loader(source: Rc<dyn AssetSource>) -> AssetLoader {
    let environment = Rc::new(EnvironmentCache::new(source.clone()));
    AssetLoader::new(source, environment, ENVIRONMENT_URL, 0.1)
}

pub(crate) const CHAIR_OBJ: &str = "\
mtllib chair.mtl
o seat
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
usemtl fabric
f 1/1/1 2/2/1 3/3/1
o legs
v 0 0 1
v 1 0 1
v 0 1 1
usemtl chrome
f 4/1/1 5/2/1 6/3/1
";

/// Defines `fabric` but not `chrome`.
pub(crate) const CHAIR_MTL: &str = "\
newmtl fabric
Kd 0.8 0.1 0.1
";

pub(crate) const TABLE_OBJ: &str = "\
o top
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
f 1/1 2/2 3/3
o leg
v 0 0 1
v 1 0 1
v 0 1 1
f 4/1 5/2 6/3
";

/// Three vec3 positions: (0,0,0), (1,0,0), (0,1,0).
const TRIANGLE_BUFFER: &str = "AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA";

/// Two root nodes sharing one triangle mesh, one of them with a camera child.
pub(crate) fn lamp_gltf() -> String {
    format!(
        r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0, 1] }}],
  "nodes": [
    {{ "name": "shade", "mesh": 0, "translation": [0.0, 2.0, 0.0] }},
    {{ "name": "base", "mesh": 0, "children": [2] }},
    {{ "name": "camera", "camera": 0 }}
  ],
  "cameras": [{{ "type": "perspective", "perspective": {{ "yfov": 0.8, "znear": 0.1 }} }}],
  "materials": [{{
    "name": "brass",
    "pbrMetallicRoughness": {{ "baseColorFactor": [0.2, 0.4, 0.6, 1.0] }}
  }}],
  "meshes": [{{
    "name": "triangle",
    "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "material": 0 }}]
  }}],
  "accessors": [{{
    "bufferView": 0,
    "componentType": 5126,
    "count": 3,
    "type": "VEC3",
    "min": [0.0, 0.0, 0.0],
    "max": [1.0, 1.0, 0.0]
  }}],
  "bufferViews": [{{ "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 }}],
  "buffers": [{{
    "byteLength": 36,
    "uri": "data:application/octet-stream;base64,{TRIANGLE_BUFFER}"
  }}]
}}"#
    )
}

/// Assets most tests need: the chair, the table, the lamp, and textures.
pub(crate) fn showroom() -> MemorySource {
    MemorySource::new()
        .with_file("chair.obj", CHAIR_OBJ)
        .with_file("chair.mtl", CHAIR_MTL)
        .with_file("table.obj", TABLE_OBJ)
        .with_file("textures/wood.png", png_bytes([150, 100, 50, 255]))
        .with_file("textures/wood_normal.png", png_bytes([127, 127, 255, 255]))
        .with_file("lamp.gltf", lamp_gltf())
        .with_file("models/lamp.gltf", lamp_gltf())
        .with_file(ENVIRONMENT_URL, png_bytes([200, 200, 255, 255]))
}
