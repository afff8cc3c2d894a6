use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{EulerRot, Mat4, Quat, Vec3};
use image::RgbaImage;

use crate::geometry::{Aabb, Mesh};
use crate::layers::Layers;

// ── ObjectId: generational index ─────────────────────────────────────────────

/// Handle to an object in a [`SceneGraph`]. Stale handles (the object was
/// removed, possibly with its slot reused) never resolve.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

// ── Payload types ────────────────────────────────────────────────────────────

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Decoded RGBA texture shared between materials and the GPU cache.
#[derive(Debug)]
pub struct Texture {
    id: u64,
    pub image: RgbaImage,
}

impl Texture {
    pub fn new(image: RgbaImage) -> Self {
        Self { id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed), image }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Clone, Debug)]
pub struct Material {
    /// Linear RGBA base colour.
    pub color: [f32; 4],
    pub texture: Option<Arc<Texture>>,
}

impl Material {
    pub fn solid(rgb: u32) -> Self {
        Self { color: rgb_to_linear(rgb), texture: None }
    }
}

/// `0xRRGGBB` to linear RGBA (opaque).
pub fn rgb_to_linear(rgb: u32) -> [f32; 4] {
    let channel = |shift: u32| {
        let c = ((rgb >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
    };
    [channel(16), channel(8), channel(0), 1.0]
}

#[derive(Clone, Debug)]
pub struct Renderable {
    pub mesh: Arc<Mesh>,
    pub material: Material,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LightKind {
    Ambient,
    /// Point light at the object's position; `distance == 0` means no falloff.
    Point { distance: f32 },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: [f32; 3],
    pub intensity: f32,
}

impl Light {
    pub fn ambient(color: [f32; 3], intensity: f32) -> Self {
        Self { kind: LightKind::Ambient, color, intensity }
    }

    pub fn point(color: [f32; 3], intensity: f32) -> Self {
        Self { kind: LightKind::Point { distance: 0.0 }, color, intensity }
    }
}

/// What an object is, which decides its render layer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ObjectKind {
    /// The primary rotating shape.
    Shape,
    /// A star; jittered every unpaused tick.
    Particle,
    /// Title or description text.
    Text,
    /// Static decoration such as the terrain plane.
    Scenery,
    Light(Light),
}

impl ObjectKind {
    pub fn is_light(&self) -> bool {
        matches!(self, ObjectKind::Light(_))
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// XYZ Euler angles in radians.
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self { position: Vec3::ZERO, rotation: Vec3::ZERO, scale: Vec3::ONE }
    }
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self { position, ..Self::default() }
    }

    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quat(), self.position)
    }
}

#[derive(Clone, Debug)]
pub struct VisualObject {
    pub kind: ObjectKind,
    pub transform: Transform,
    pub layers: Layers,
    /// Lights carry no renderable.
    pub renderable: Option<Renderable>,
}

impl VisualObject {
    pub fn mesh(kind: ObjectKind, mesh: Arc<Mesh>, material: Material, transform: Transform) -> Self {
        Self {
            kind,
            transform,
            layers: Layers::default(),
            renderable: Some(Renderable { mesh, material }),
        }
    }

    pub fn light(light: Light, position: Vec3) -> Self {
        Self {
            kind: ObjectKind::Light(light),
            transform: Transform::at(position),
            layers: Layers::default(),
            renderable: None,
        }
    }
}

// ── SceneGraph ───────────────────────────────────────────────────────────────

struct Slot {
    generation: u32,
    object: Option<VisualObject>,
}

/// Owns every visual object and its transform.
#[derive(Default)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, object: VisualObject) -> ObjectId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(object);
            return ObjectId { index, generation: slot.generation };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, object: Some(object) });
        ObjectId { index, generation: 0 }
    }

    /// Remove and return the object; `None` if `id` is stale.
    pub fn remove(&mut self, id: ObjectId) -> Option<VisualObject> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let object = slot.object.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(object)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: ObjectId) -> Option<&VisualObject> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.object.as_ref())
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut VisualObject> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.object.as_mut())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &VisualObject)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.object
                .as_ref()
                .map(|o| (ObjectId { index: i as u32, generation: s.generation }, o))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ObjectId, &mut VisualObject)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, s)| {
            let generation = s.generation;
            s.object
                .as_mut()
                .map(move |o| (ObjectId { index: i as u32, generation }, o))
        })
    }

    /// Ids of every object of the given kind (lights match on variant only).
    pub fn ids_of_kind(&self, kind: ObjectKind) -> Vec<ObjectId> {
        self.iter()
            .filter(|(_, o)| std::mem::discriminant(&o.kind) == std::mem::discriminant(&kind))
            .map(|(id, _)| id)
            .collect()
    }

    /// Objects whose layer mask intersects `camera_layers`.
    pub fn visible_to(&self, camera_layers: Layers) -> impl Iterator<Item = (ObjectId, &VisualObject)> {
        self.iter().filter(move |(_, o)| o.layers.test(camera_layers))
    }

    /// World-space bounds of an object's mesh after its transform is applied.
    pub fn world_bounds(&self, id: ObjectId) -> Option<Aabb> {
        let object = self.get(id)?;
        let renderable = object.renderable.as_ref()?;
        Some(renderable.mesh.bounds().transformed(&object.transform.matrix()))
    }
}
