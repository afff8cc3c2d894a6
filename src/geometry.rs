// ── CPU-side meshes ───────────────────────────────────────────────────────────
//
// Everything the renderer draws starts here as plain vertex/index data:
// - Torus (the rotating centrepiece)
// - UV sphere (one shared unit sphere, scaled per star)
// - Subdivided plane with optional heightmap displacement (terrain)
// - Axis-aligned bounding boxes (camera-follow targeting)

use std::f32::consts::{PI, TAU};
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat4, Vec3};
use image::RgbaImage;

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

/// Vertex layout shared by every mesh (matches `mesh.wgsl`).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3, // normal
        2 => Float32x2, // uv
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

// ── Aabb ─────────────────────────────────────────────────────────────────────

/// Axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// An inverted box that any point will expand.
    pub const EMPTY: Self = Self { min: Vec3::INFINITY, max: Vec3::NEG_INFINITY };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |b, p| b.expanded(p))
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expanded(self, p: Vec3) -> Self {
        Self { min: self.min.min(p), max: self.max.max(p) }
    }

    pub fn union(self, other: Aabb) -> Self {
        Self { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    /// Average of the minimum and maximum corners.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() { Vec3::ZERO } else { self.max - self.min }
    }

    /// Bounds of the eight transformed corners.
    pub fn transformed(&self, m: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let (a, b) = (self.min, self.max);
        let corners = [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ];
        Self::from_points(corners.into_iter().map(|c| m.transform_point3(c)))
    }
}

// ── Mesh ─────────────────────────────────────────────────────────────────────

/// Indexed triangle list. Each mesh gets a process-unique `id` so GPU buffers
/// can be cached and dropped when no object references the mesh any more.
#[derive(Debug)]
pub struct Mesh {
    id: u64,
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    bounds: Aabb,
}

impl Mesh {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        let bounds = Aabb::from_points(vertices.iter().map(|v| Vec3::from(v.position)));
        Self {
            id: NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed),
            vertices,
            indices,
            bounds,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Local-space bounds (empty for an empty mesh).
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Torus around the Z axis.
    ///
    /// `radius` is the distance from the centre to the middle of the tube.
    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Self {
        let radial = radial_segments.max(3);
        let tubular = tubular_segments.max(3);
        let mut vertices = Vec::with_capacity(((radial + 1) * (tubular + 1)) as usize);

        for j in 0..=radial {
            for i in 0..=tubular {
                let u = i as f32 / tubular as f32 * TAU;
                let v = j as f32 / radial as f32 * TAU;

                let position = Vec3::new(
                    (radius + tube * v.cos()) * u.cos(),
                    (radius + tube * v.cos()) * u.sin(),
                    tube * v.sin(),
                );
                let centre = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
                let normal = (position - centre).normalize_or_zero();

                vertices.push(MeshVertex {
                    position: position.into(),
                    normal: normal.into(),
                    uv: [i as f32 / tubular as f32, j as f32 / radial as f32],
                });
            }
        }

        let row = tubular + 1;
        let mut indices = Vec::with_capacity((radial * tubular * 6) as usize);
        for j in 1..=radial {
            for i in 1..=tubular {
                let a = row * j + i - 1;
                let b = row * (j - 1) + i - 1;
                let c = row * (j - 1) + i;
                let d = row * j + i;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self::new(vertices, indices)
    }

    /// UV sphere centred at the origin.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let ws = width_segments.max(3);
        let hs = height_segments.max(2);
        let mut vertices = Vec::with_capacity(((ws + 1) * (hs + 1)) as usize);

        for iy in 0..=hs {
            let v = iy as f32 / hs as f32;
            for ix in 0..=ws {
                let u = ix as f32 / ws as f32;
                let position = Vec3::new(
                    -radius * (u * TAU).cos() * (v * PI).sin(),
                    radius * (v * PI).cos(),
                    radius * (u * TAU).sin() * (v * PI).sin(),
                );
                vertices.push(MeshVertex {
                    position: position.into(),
                    normal: position.normalize_or_zero().into(),
                    uv: [u, 1.0 - v],
                });
            }
        }

        let row = ws + 1;
        let mut indices = Vec::new();
        for iy in 0..hs {
            for ix in 0..ws {
                let a = row * iy + ix + 1;
                let b = row * iy + ix;
                let c = row * (iy + 1) + ix;
                let d = row * (iy + 1) + ix + 1;
                // The poles collapse to a single triangle fan.
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != hs - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self::new(vertices, indices)
    }

    /// Flat plane in the XY plane facing +Z, optionally displaced along its
    /// normal by the luminance of `heightmap` times `displacement_scale`.
    pub fn plane(
        width: f32,
        height: f32,
        width_segments: u32,
        height_segments: u32,
        heightmap: Option<(&RgbaImage, f32)>,
    ) -> Self {
        let gx = width_segments.max(1);
        let gy = height_segments.max(1);
        let seg_w = width / gx as f32;
        let seg_h = height / gy as f32;

        let mut vertices = Vec::with_capacity(((gx + 1) * (gy + 1)) as usize);
        for iy in 0..=gy {
            let y = iy as f32 * seg_h - height / 2.0;
            for ix in 0..=gx {
                let x = ix as f32 * seg_w - width / 2.0;
                let uv = [ix as f32 / gx as f32, 1.0 - iy as f32 / gy as f32];
                let z = match heightmap {
                    Some((map, scale)) => sample_height(map, uv) * scale,
                    None => 0.0,
                };
                vertices.push(MeshVertex { position: [x, -y, z], normal: [0.0, 0.0, 1.0], uv });
            }
        }

        let row = gx + 1;
        let mut indices = Vec::with_capacity((gx * gy * 6) as usize);
        for iy in 0..gy {
            for ix in 0..gx {
                let a = ix + row * iy;
                let b = ix + row * (iy + 1);
                let c = ix + 1 + row * (iy + 1);
                let d = ix + 1 + row * iy;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        if heightmap.is_some() {
            recompute_normals(&mut vertices, &indices);
        }
        Self::new(vertices, indices)
    }
}

/// Nearest-texel luminance in `[0, 1]`. `uv.y = 1` is the top image row.
fn sample_height(map: &RgbaImage, uv: [f32; 2]) -> f32 {
    let (w, h) = map.dimensions();
    if w == 0 || h == 0 {
        return 0.0;
    }
    let px = (uv[0].clamp(0.0, 1.0) * (w - 1) as f32).round() as u32;
    let py = ((1.0 - uv[1].clamp(0.0, 1.0)) * (h - 1) as f32).round() as u32;
    let [r, g, b, _] = map.get_pixel(px, py).0;
    (0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32) / 255.0
}

/// Smooth per-vertex normals from area-weighted face normals.
pub fn recompute_normals(vertices: &mut [MeshVertex], indices: &[u32]) {
    let mut acc = vec![Vec3::ZERO; vertices.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let pa = Vec3::from(vertices[a].position);
        let pb = Vec3::from(vertices[b].position);
        let pc = Vec3::from(vertices[c].position);
        let n = (pb - pa).cross(pc - pa);
        acc[a] += n;
        acc[b] += n;
        acc[c] += n;
    }
    for (v, n) in vertices.iter_mut().zip(acc) {
        v.normal = n.normalize_or(Vec3::from(v.normal)).into();
    }
}
