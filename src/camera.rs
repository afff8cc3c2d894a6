use glam::{Mat4, Quat, Vec2, Vec3};

use crate::layers::Layers;

/// Film gauge in millimetres used to convert a focal length into a field of view.
pub const FILM_GAUGE_MM: f32 = 35.0;

/// Camera uniform uploaded to the GPU.
///
/// Layout (matches `mesh.wgsl`):
/// ```text
/// view_proj: mat4x4<f32>   column-major projection * view
/// position:  vec4<f32>     world-space eye position, w unused
/// ```
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 4],
}

/// Perspective camera with a render-layer mask.
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub orientation: Quat,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Layers this camera sees. The compositor switches this between passes.
    pub layers: Layers,
}

impl Camera {
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            fov_y,
            aspect,
            near,
            far,
            layers: Layers::default(),
        }
    }

    /// Set the field of view from a focal length in millimetres, using the
    /// vertical extent of a 35 mm film gauge at the current aspect.
    pub fn set_focal_length(&mut self, focal_length: f32) {
        if focal_length <= 0.0 || !focal_length.is_finite() {
            log::warn!("camera: ignoring invalid focal length {focal_length}");
            return;
        }
        let film_height = FILM_GAUGE_MM / self.aspect.max(1.0);
        let slope = 0.5 * film_height / focal_length;
        self.fov_y = (2.0 * slope.atan()).to_degrees();
    }

    pub fn focal_length(&self) -> f32 {
        let film_height = FILM_GAUGE_MM / self.aspect.max(1.0);
        0.5 * film_height / (self.fov_y.to_radians() * 0.5).tan()
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Rotate so the camera's -Z axis points at `target`. No-op when the
    /// target coincides with the camera position.
    pub fn look_at(&mut self, target: Vec3) {
        let forward = target - self.position;
        if forward.length_squared() < f32::EPSILON {
            return;
        }
        let view = Mat4::look_at_rh(self.position, target, Vec3::Y);
        let (_, rotation, _) = view.inverse().to_scale_rotation_translation();
        self.orientation = rotation.normalize();
    }

    /// Unit vector the camera faces.
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position).inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y.to_radians(), self.aspect.max(1e-4), self.near, self.far)
    }

    pub fn uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: (self.projection_matrix() * self.view_matrix()).to_cols_array_2d(),
            position: self.position.extend(1.0).into(),
        }
    }
}

// ── OrbitControls ───────────────────────────────────────────────────────────

/// Pointer-drag orbit around a target point.
///
/// Drags accumulate between ticks; [`OrbitControls::update`] applies them,
/// keeping the camera's distance to the target and re-aiming at it.
#[derive(Clone, Debug)]
pub struct OrbitControls {
    pub enabled: bool,
    pub target: Vec3,
    /// Radians per pixel of drag.
    pub rotate_speed: f32,
    pending: Vec2,
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self { enabled: true, target, rotate_speed: 0.005, pending: Vec2::ZERO }
    }

    /// Record a pointer drag in pixels. Ignored while disabled.
    pub fn drag(&mut self, dx: f32, dy: f32) {
        if self.enabled {
            self.pending += Vec2::new(dx, dy);
        }
    }

    /// Apply accumulated drag. Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let delta = std::mem::take(&mut self.pending);
        if !self.enabled || delta == Vec2::ZERO {
            return false;
        }

        let offset = camera.position - self.target;
        let radius = offset.length();
        if radius < f32::EPSILON {
            return false;
        }

        // Spherical coordinates around +Y.
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();
        theta -= delta.x * self.rotate_speed;
        phi = (phi - delta.y * self.rotate_speed).clamp(1e-3, std::f32::consts::PI - 1e-3);

        camera.position = self.target
            + Vec3::new(phi.sin() * theta.sin(), phi.cos(), phi.sin() * theta.cos()) * radius;
        camera.look_at(self.target);
        true
    }
}
