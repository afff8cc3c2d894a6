use glam::Vec3;

use crate::camera::Camera;
use crate::compositor::{BloomSettings, RenderBackend};
use crate::error::Result;
use crate::layers::Layers;
use crate::scene::{ObjectId, SceneGraph};

/// Snapshot of one render call.
#[derive(Clone, Debug, PartialEq)]
pub struct PassRecord {
    /// Camera layer mask at the moment of the call.
    pub layers: Layers,
    /// Drawable objects that passed the layer filter, in scene order.
    pub objects: Vec<ObjectId>,
    /// Lights that passed the layer filter.
    pub lights: usize,
    pub camera_position: Vec3,
    pub camera_forward: Vec3,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    BeginFrame,
    ClearColor,
    ClearDepth,
    RenderBloom(PassRecord, BloomSettings),
    RenderBase(PassRecord),
    EndFrame,
    Resize { width: u32, height: u32 },
}

/// A [`RenderBackend`] that draws nothing and records every call.
///
/// A counting backend keeps only the counters, so long runs stay in
/// constant memory.
#[derive(Clone, Debug)]
pub struct HeadlessBackend {
    recording: bool,
    calls: Vec<BackendCall>,
    frames: u64,
    bloom_passes: u64,
    base_passes: u64,
    resizes: u32,
    size: (u32, u32),
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            recording: true,
            calls: Vec::new(),
            frames: 0,
            bloom_passes: 0,
            base_passes: 0,
            resizes: 0,
            size: (0, 0),
        }
    }

    /// A backend that counts frames and passes without logging calls.
    pub fn counting() -> Self {
        Self { recording: false, ..Self::new() }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    fn push(&mut self, call: BackendCall) {
        if self.recording {
            self.calls.push(call);
        }
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Drain recorded calls, keeping counters.
    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        std::mem::take(&mut self.calls)
    }

    /// Frames completed with `end_frame`.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn bloom_passes(&self) -> u64 {
        self.bloom_passes
    }

    pub fn base_passes(&self) -> u64 {
        self.base_passes
    }

    /// Number of `resize` calls that reached the backend.
    pub fn resize_count(&self) -> u32 {
        self.resizes
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Every recorded pass in order, bloom and base alike.
    pub fn passes(&self) -> impl Iterator<Item = &PassRecord> {
        self.calls.iter().filter_map(|c| match c {
            BackendCall::RenderBloom(p, _) | BackendCall::RenderBase(p) => Some(p),
            _ => None,
        })
    }

    fn record(scene: &SceneGraph, camera: &Camera) -> PassRecord {
        let mut objects = Vec::new();
        let mut lights = 0;
        for (id, object) in scene.visible_to(camera.layers) {
            if object.kind.is_light() {
                lights += 1;
            } else if object.renderable.is_some() {
                objects.push(id);
            }
        }
        PassRecord {
            layers: camera.layers,
            objects,
            lights,
            camera_position: camera.position,
            camera_forward: camera.forward(),
        }
    }
}

impl RenderBackend for HeadlessBackend {
    fn begin_frame(&mut self) -> Result<()> {
        self.push(BackendCall::BeginFrame);
        Ok(())
    }

    fn clear_color(&mut self) {
        self.push(BackendCall::ClearColor);
    }

    fn clear_depth(&mut self) {
        self.push(BackendCall::ClearDepth);
    }

    fn render_bloom(&mut self, scene: &SceneGraph, camera: &Camera, bloom: &BloomSettings) -> Result<()> {
        self.bloom_passes += 1;
        if self.recording {
            self.calls.push(BackendCall::RenderBloom(Self::record(scene, camera), *bloom));
        }
        Ok(())
    }

    fn render_base(&mut self, scene: &SceneGraph, camera: &Camera) -> Result<()> {
        self.base_passes += 1;
        if self.recording {
            self.calls.push(BackendCall::RenderBase(Self::record(scene, camera)));
        }
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        self.push(BackendCall::EndFrame);
        self.frames += 1;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.push(BackendCall::Resize { width, height });
        self.resizes += 1;
        self.size = (width, height);
    }
}
