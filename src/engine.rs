use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

use crate::animation::{AnimationTargets, CameraRig, FrameScheduler, LoopHandle, PauseFlag, TickReport};
use crate::assets::{AssetEvent, AssetLoader, AssetRequest, LoadedAsset, TextureRole};
use crate::camera::{Camera, OrbitControls};
use crate::compositor::{DualPassCompositor, RenderBackend};
use crate::config::BackdropConfig;
use crate::error::{Error, Result};
use crate::follow::{CameraFollow, ScrollNudge};
use crate::geometry::Mesh;
use crate::i18n::{Language, LanguageContext, TextCatalog};
use crate::input::{Action, ActionMap, InputState};
use crate::intro::IntroText;
use crate::partition;
use crate::renderer::{HeadlessBackend, Renderer};
use crate::scene::{Light, LightKind, Material, ObjectKind, SceneGraph, Transform, VisualObject, rgb_to_linear};
use crate::window::{WindowMode, apply_window_settings};

/// Frame interval used for simulated time in headless runs.
pub const HEADLESS_FRAME: Duration = Duration::from_millis(16);

// ── Backdrop ────────────────────────────────────────────────────────────────

/// The mounted backdrop: scene, camera, loop state and the intro text.
///
/// Everything here runs on the loop thread. Other threads interact only
/// through [`PauseFlag`] and [`LoopHandle`].
pub struct Backdrop {
    config: BackdropConfig,
    scene: SceneGraph,
    camera: Camera,
    orbit: OrbitControls,
    follow: CameraFollow,
    nudge: ScrollNudge,
    scheduler: FrameScheduler,
    compositor: DualPassCompositor,
    targets: AnimationTargets,
    intro: IntroText,
    language: LanguageContext,
    rng: StdRng,
}

impl Backdrop {
    /// Build the scene and partition it into layers. Text appears once a
    /// font is handed to [`handle_asset`](Self::handle_asset).
    pub fn new(config: BackdropConfig, language: LanguageContext, catalog: Rc<TextCatalog>) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let c = &config.camera;
        let mut camera = Camera::perspective(c.fov, config.window.aspect_ratio(), c.near, c.far);
        camera.position = c.position;
        if let Some(focal) = c.focal_length {
            camera.set_focal_length(focal);
        }

        let mut scene = SceneGraph::new();
        populate(&mut scene, &config, &mut rng);

        let mut intro = IntroText::new(catalog, &language, config.text.clone(), config.terrain.clone())?;
        intro.place_terrain(&mut scene);

        partition::assign_layers(&mut scene, &mut camera);
        let targets = AnimationTargets::from_scene(&scene);

        let s = &config.scroll;
        let nudge = ScrollNudge::new(s.duration(), s.step, s.easing);
        log::info!(
            "backdrop: {} objects, {} particles, language {}",
            scene.len(),
            targets.particles.len(),
            language.current()
        );

        Ok(Self {
            scheduler: FrameScheduler::new(config.motion),
            compositor: DualPassCompositor::new(config.bloom),
            orbit: OrbitControls::new(Vec3::ZERO),
            follow: CameraFollow::new(),
            nudge,
            scene,
            camera,
            targets,
            intro,
            language,
            rng,
            config,
        })
    }

    /// Assets the backdrop wants loaded at startup.
    pub fn asset_requests(&self) -> Vec<AssetRequest> {
        let a = &self.config.assets;
        let mut requests = vec![AssetRequest::Font(a.font.clone())];
        if self.config.terrain.enabled {
            requests.push(AssetRequest::Texture(TextureRole::TerrainHeight, a.terrain_height.clone()));
            requests.push(AssetRequest::Texture(TextureRole::TerrainColor, a.terrain_color.clone()));
        }
        requests
    }

    /// Fold a finished load into the scene. Failures were already logged by
    /// the loader and leave the scene as it is.
    pub fn handle_asset(&mut self, event: AssetEvent) -> bool {
        match event.result {
            Ok(LoadedAsset::Font(font)) => {
                self.intro.on_font_loaded(font, &mut self.scene, &mut self.follow);
                true
            }
            Ok(LoadedAsset::Texture(role, image)) => self.intro.apply_terrain_texture(&mut self.scene, role, image),
            Err(_) => false,
        }
    }

    pub fn pause(&self) {
        self.scheduler.pause();
    }

    pub fn resume(&self) {
        self.scheduler.resume();
    }

    pub fn is_paused(&self) -> bool {
        self.scheduler.is_paused()
    }

    pub fn pauses(&self) -> PauseFlag {
        self.scheduler.pauses()
    }

    pub fn loop_handle(&self) -> LoopHandle {
        self.scheduler.loop_handle()
    }

    /// Match the render targets and camera aspect to the drawable size.
    pub fn resize(&mut self, backend: &mut dyn RenderBackend, width: u32, height: u32) -> bool {
        self.compositor.resize(backend, &mut self.camera, width, height)
    }

    pub fn on_wheel(&mut self, wheel: f32, now: Instant) {
        self.nudge.on_wheel(wheel, now);
    }

    pub fn on_drag(&mut self, dx: f32, dy: f32) {
        self.orbit.drag(dx, dy);
    }

    /// Switch to the next language. The text is rebuilt on the next tick.
    pub fn cycle_language(&self) -> Language {
        let next = self.language.current().next();
        self.language.update_language(next);
        next
    }

    /// One loop iteration. `None` once the loop handle has been stopped.
    pub fn tick(&mut self, backend: &mut dyn RenderBackend, now: Instant) -> Result<Option<TickReport>> {
        if !self.scheduler.loop_handle().is_running() {
            return Ok(None);
        }
        self.intro.sync(&mut self.scene, &mut self.follow);
        self.nudge.apply(&mut self.camera, now);

        let rig = CameraRig {
            camera: &mut self.camera,
            follow: &self.follow,
            orbit: &mut self.orbit,
            text_ready: self.intro.is_ready(),
        };
        self.scheduler.tick(
            &mut self.scene,
            &self.targets,
            &mut self.rng,
            rig,
            &mut self.compositor,
            backend,
        )
    }

    pub fn config(&self) -> &BackdropConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn orbit(&self) -> &OrbitControls {
        &self.orbit
    }

    pub fn follow(&self) -> &CameraFollow {
        &self.follow
    }

    pub fn intro(&self) -> &IntroText {
        &self.intro
    }

    pub fn language(&self) -> &LanguageContext {
        &self.language
    }

    pub fn targets(&self) -> &AnimationTargets {
        &self.targets
    }

    pub fn compositor(&self) -> &DualPassCompositor {
        &self.compositor
    }
}

/// Uniform in `[-range/2, range/2]`.
fn spread<R: Rng + ?Sized>(rng: &mut R, range: f32) -> f32 {
    let half = range * 0.5;
    if half > 0.0 { rng.random_range(-half..=half) } else { 0.0 }
}

fn rgb3(rgb: u32) -> [f32; 3] {
    let [r, g, b, _] = rgb_to_linear(rgb);
    [r, g, b]
}

/// Shape, stars and lights. Terrain and text are owned by the intro.
fn populate<R: Rng + ?Sized>(scene: &mut SceneGraph, config: &BackdropConfig, rng: &mut R) {
    let sh = &config.shape;
    let torus = Mesh::torus(sh.radius, sh.tube, sh.radial_segments, sh.tubular_segments);
    scene.add(VisualObject::mesh(
        ObjectKind::Shape,
        Arc::new(torus),
        Material::solid(sh.color),
        Transform::at(sh.position),
    ));

    let st = &config.stars;
    let sphere = Arc::new(Mesh::sphere(1.0, st.segments, st.segments));
    for _ in 0..st.count {
        let position = st.offset
            + Vec3::new(
                spread(rng, st.spread.x),
                spread(rng, st.spread.y),
                spread(rng, st.spread.z),
            );
        let radius = st.radius + spread(rng, st.radius_spread);
        let transform = Transform { position, scale: Vec3::splat(radius), ..Transform::default() };
        scene.add(VisualObject::mesh(ObjectKind::Particle, Arc::clone(&sphere), Material::solid(st.color), transform));
    }

    let l = &config.lights;
    let point = Light {
        kind: LightKind::Point { distance: l.point_distance },
        color: rgb3(l.point_color),
        intensity: l.point_intensity,
    };
    scene.add(VisualObject::light(point, l.point_position));
    scene.add(VisualObject::light(Light::ambient(rgb3(l.ambient_color), l.ambient_intensity), Vec3::ZERO));
}

// ── BackdropBuilder ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct BackdropBuilder {
    config: BackdropConfig,
    language: Language,
    asset_root: Option<PathBuf>,
}

impl BackdropBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: BackdropConfig) -> Self { self.config = config; self }
    pub fn with_title(mut self, title: &str) -> Self { self.config.window.title = title.into(); self }
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.config.window.width = width;
        self.config.window.height = height;
        self
    }
    pub fn with_mode(mut self, mode: WindowMode) -> Self { self.config.window.mode = mode; self }
    pub fn with_language(mut self, language: Language) -> Self { self.language = language; self }
    pub fn with_seed(mut self, seed: u64) -> Self { self.config.seed = Some(seed); self }

    /// Resolve relative asset paths against `root` instead of the working
    /// directory.
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = Some(root.into());
        self
    }

    fn resolved_config(&self) -> BackdropConfig {
        let mut config = self.config.clone();
        if let Some(root) = &self.asset_root {
            config.assets = config.assets.relative_to(root);
        }
        config
    }

    /// Load the text catalog and build the backdrop.
    pub fn build(&self) -> Result<Backdrop> {
        let config = self.resolved_config();
        let catalog = TextCatalog::load(&config.assets.catalog).map_err(|e| Error::asset(&config.assets.catalog, e))?;
        catalog.validate()?;
        Backdrop::new(config, LanguageContext::new(self.language), Rc::new(catalog))
    }

    /// Run `frames` ticks against a counting [`HeadlessBackend`] with every
    /// asset loaded up front and time advancing [`HEADLESS_FRAME`] per tick.
    /// Only counters are kept, so memory does not grow with `frames`.
    pub fn run_headless(&self, frames: u64) -> Result<(Backdrop, HeadlessBackend)> {
        let mut backdrop = self.build()?;
        let mut backend = HeadlessBackend::counting();
        let w = &backdrop.config.window;
        let (width, height) = (w.width, w.height);
        backdrop.resize(&mut backend, width, height);

        let mut loader = AssetLoader::new();
        for request in backdrop.asset_requests() {
            loader.request(request);
        }
        for event in loader.wait_all() {
            backdrop.handle_asset(event);
        }

        let start = Instant::now();
        for frame in 0..frames {
            let now = start + HEADLESS_FRAME * frame as u32;
            if backdrop.tick(&mut backend, now)?.is_none() {
                break;
            }
        }
        log::info!("backdrop: headless run finished after {} frames", backend.frames());
        Ok((backdrop, backend))
    }

    /// Open a window and run until the loop handle is stopped or the window
    /// is closed.
    pub fn run(self) -> Result<()> {
        let backdrop = self.build()?;
        let event_loop = EventLoop::new().map_err(|e| Error::Gpu(e.to_string()))?;
        let mut app = App {
            backdrop,
            loader: AssetLoader::new(),
            input: InputState::new(),
            actions: ActionMap::backdrop_defaults(),
            renderer: None,
            fatal: None,
        };
        event_loop.run_app(&mut app).map_err(|e| Error::Gpu(e.to_string()))?;
        match app.fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ── App (winit ApplicationHandler) ──────────────────────────────────────────

struct App {
    backdrop: Backdrop,
    loader: AssetLoader,
    input: InputState,
    actions: ActionMap<Action>,
    renderer: Option<Renderer>,
    fatal: Option<Error>,
}

impl App {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: Error) {
        log::error!("backdrop: {error}");
        self.fatal = Some(error);
        self.backdrop.loop_handle().stop();
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        for event in self.loader.poll() {
            self.backdrop.handle_asset(event);
        }

        let actions: Vec<Action> = self.actions.pressed(&self.input).collect();
        for action in actions {
            match action {
                Action::TogglePause => self.backdrop.pauses().toggle(),
                Action::CycleLanguage => {
                    self.backdrop.cycle_language();
                }
                Action::Quit => self.backdrop.loop_handle().stop(),
            }
        }

        let drag: Vec2 = self.input.take_drag(MouseButton::Left);
        if drag != Vec2::ZERO {
            self.backdrop.on_drag(drag.x, drag.y);
        }
        self.input.clear_frame_state();

        let Some(renderer) = self.renderer.as_mut() else { return };
        match self.backdrop.tick(renderer, Instant::now()) {
            Ok(Some(_)) => {}
            Ok(None) => event_loop.exit(),
            Err(Error::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                log::warn!("backdrop: surface lost, reconfiguring");
                renderer.reconfigure();
            }
            Err(Error::Surface(wgpu::SurfaceError::Timeout)) => {
                log::warn!("backdrop: surface timeout, frame skipped");
            }
            Err(e) => self.fail(event_loop, e),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        let w = self.backdrop.config().window.clone();
        let attributes = Window::default_attributes()
            .with_title(&w.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(w.width, w.height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, Error::Gpu(e.to_string())),
        };
        apply_window_settings(&window, &w);

        let mut renderer = match pollster::block_on(Renderer::new(Arc::clone(&window), self.backdrop.config().bloom)) {
            Ok(renderer) => renderer,
            Err(e) => return self.fail(event_loop, e),
        };
        let size = window.inner_size();
        self.backdrop.resize(&mut renderer, size.width, size.height);
        self.renderer = Some(renderer);

        for request in self.backdrop.asset_requests() {
            self.loader.request(request);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if !self.backdrop.loop_handle().is_running() {
            event_loop.exit();
            return;
        }
        if let Some(renderer) = self.renderer.as_ref() {
            renderer.window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.backdrop.loop_handle().stop();
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    self.backdrop.resize(renderer, size.width, size.height);
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.input.cursor_moved(Vec2::new(position.x as f32, position.y as f32));
            }

            WindowEvent::CursorLeft { .. } => self.input.cursor_left(),

            WindowEvent::MouseInput { button, state, .. } => match state {
                ElementState::Pressed => self.input.mouse_down(button),
                ElementState::Released => self.input.mouse_up(button),
            },

            WindowEvent::MouseWheel { delta, .. } => {
                let wheel = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => (pos.y / 100.0) as f32,
                };
                self.backdrop.on_wheel(wheel, Instant::now());
            }

            WindowEvent::KeyboardInput {
                event: KeyEvent { physical_key: PhysicalKey::Code(code), state, .. },
                ..
            } => match state {
                ElementState::Pressed => self.input.key_down(code),
                ElementState::Released => self.input.key_up(code),
            },

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spread_stays_within_half_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let v = spread(&mut rng, 300.0);
            assert!((-150.0..=150.0).contains(&v));
        }
        assert_eq!(spread(&mut rng, 0.0), 0.0);
    }

    #[test]
    fn populate_places_stars_inside_volume() {
        let mut config = BackdropConfig::default();
        config.stars.count = 50;
        let mut scene = SceneGraph::new();
        populate(&mut scene, &config, &mut StdRng::seed_from_u64(9));

        let stars = scene.ids_of_kind(ObjectKind::Particle);
        assert_eq!(stars.len(), 50);
        for id in stars {
            let t = scene.get(id).unwrap().transform;
            assert!((-500.0..=500.0).contains(&t.position.x));
            assert!((-50.0..=250.0).contains(&t.position.y));
            assert!((-350.0..=-50.0).contains(&t.position.z));
            assert!((0.25..=0.75).contains(&t.scale.x));
        }
        assert_eq!(scene.ids_of_kind(ObjectKind::Shape).len(), 1);
    }
}
