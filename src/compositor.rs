//! Dual-pass compositing: a bloom pass over the `Bloom` layer followed by a
//! crisp, depth-cleared base pass over the `Base` layer into the same target.

use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::error::Result;
use crate::layers::Layer;
use crate::scene::SceneGraph;

/// Parameters of the bloom post-process chain.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    /// Multiplier applied to the blurred highlights when composited.
    pub strength: f32,
    /// Widens the blur taps from one texel (0) to four texels (1).
    pub radius: f32,
    /// Luminance below which pixels contribute nothing to the glow.
    pub threshold: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self { strength: 1.5, radius: 0.0, threshold: 0.3 }
    }
}

/// What the compositor needs from a rendering target.
///
/// Calls arrive in frame order: `begin_frame`, then for each pass a clear
/// followed by a render, then `end_frame`. The camera passed to a render call
/// has exactly one layer enabled.
pub trait RenderBackend {
    fn begin_frame(&mut self) -> Result<()>;

    /// Clear colour (but not depth) before the next pass.
    fn clear_color(&mut self);

    /// Clear depth (but not colour) before the next pass.
    fn clear_depth(&mut self);

    /// Render objects visible to `camera` through the bloom chain and
    /// composite the result into the frame.
    fn render_bloom(&mut self, scene: &SceneGraph, camera: &Camera, bloom: &BloomSettings) -> Result<()>;

    /// Render objects visible to `camera` directly into the frame.
    fn render_base(&mut self, scene: &SceneGraph, camera: &Camera) -> Result<()>;

    fn end_frame(&mut self) -> Result<()>;

    /// Reallocate size-dependent targets.
    fn resize(&mut self, width: u32, height: u32);
}

/// Runs the two passes over any [`RenderBackend`] and keeps the viewport in
/// sync with the drawable's measured size.
#[derive(Clone, Debug, Default)]
pub struct DualPassCompositor {
    pub bloom: BloomSettings,
    viewport: Option<(u32, u32)>,
}

impl DualPassCompositor {
    pub fn new(bloom: BloomSettings) -> Self {
        Self { bloom, viewport: None }
    }

    pub fn viewport(&self) -> Option<(u32, u32)> {
        self.viewport
    }

    /// Resize targets and camera aspect to the measured drawable size.
    ///
    /// Returns `false` without touching the backend when the size is already
    /// current or degenerate.
    pub fn resize(&mut self, backend: &mut dyn RenderBackend, camera: &mut Camera, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 || self.viewport == Some((width, height)) {
            return false;
        }
        backend.resize(width, height);
        camera.set_aspect(width, height);
        self.viewport = Some((width, height));
        log::debug!("compositor: viewport {width}x{height}");
        true
    }

    pub fn begin_frame(&mut self, backend: &mut dyn RenderBackend) -> Result<()> {
        backend.begin_frame()
    }

    pub fn end_frame(&mut self, backend: &mut dyn RenderBackend) -> Result<()> {
        backend.end_frame()
    }

    /// Clear colour, switch the camera to `Bloom` only and render through
    /// the bloom chain.
    pub fn bloom_pass(&mut self, backend: &mut dyn RenderBackend, scene: &SceneGraph, camera: &mut Camera) -> Result<()> {
        backend.clear_color();
        camera.layers.set(Layer::Bloom);
        backend.render_bloom(scene, camera, &self.bloom)
    }

    /// Clear depth, switch the camera to `Base` only and render directly over
    /// what the bloom pass left in the colour buffer.
    pub fn base_pass(&mut self, backend: &mut dyn RenderBackend, scene: &SceneGraph, camera: &mut Camera) -> Result<()> {
        backend.clear_depth();
        camera.layers.set(Layer::Base);
        backend.render_base(scene, camera)
    }

    /// A full frame: bloom pass then base pass.
    pub fn compose(&mut self, backend: &mut dyn RenderBackend, scene: &SceneGraph, camera: &mut Camera) -> Result<()> {
        self.begin_frame(backend)?;
        self.bloom_pass(backend, scene, camera)?;
        self.base_pass(backend, scene, camera)?;
        self.end_frame(backend)
    }
}
