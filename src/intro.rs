//! The intro block: localized title and description rendered as extruded text
//! over a textured terrain plane.
//!
//! Text can only be built once the font has loaded, and must be rebuilt when
//! the language changes. Both happen asynchronously relative to the render
//! loop; [`IntroText::sync`] folds them in at the start of a tick.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use glam::Vec3;
use image::RgbaImage;

use crate::assets::TextureRole;
use crate::config::{TerrainConfig, TextConfig};
use crate::error::Result;
use crate::events::{Event, EventBus, Subscription};
use crate::follow::CameraFollow;
use crate::geometry::Mesh;
use crate::i18n::{Language, LanguageContext, LanguageEvent, LocalizedText, TextCatalog};
use crate::partition;
use crate::renderer::text::{Font, TextGeometry};
use crate::scene::{Material, ObjectId, ObjectKind, SceneGraph, Texture, Transform, VisualObject};

#[derive(Clone, Debug, PartialEq)]
pub enum IntroEvent {
    /// The font arrived. Recorded, so late listeners still see it.
    Loaded,
    /// Text objects were (re)built; `center` is the new follow target.
    TextsPlaced { center: Option<Vec3> },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IntroEventKind {
    Loaded,
    TextsPlaced,
}

impl Event for IntroEvent {
    type Kind = IntroEventKind;

    fn kind(&self) -> Self::Kind {
        match self {
            IntroEvent::Loaded => IntroEventKind::Loaded,
            IntroEvent::TextsPlaced { .. } => IntroEventKind::TextsPlaced,
        }
    }
}

pub struct IntroText {
    settings: TextConfig,
    terrain_settings: TerrainConfig,
    font: Option<Font>,
    title: LocalizedText,
    description: LocalizedText,
    title_id: Option<ObjectId>,
    description_id: Option<ObjectId>,
    terrain_id: Option<ObjectId>,
    pending_language: Rc<Cell<Option<Language>>>,
    subscription: Subscription<LanguageEvent>,
    events: EventBus<IntroEvent>,
}

impl IntroText {
    /// Resolve both strings for the context's current language and start
    /// observing language changes.
    pub fn new(
        catalog: Rc<TextCatalog>,
        language: &LanguageContext,
        settings: TextConfig,
        terrain_settings: TerrainConfig,
    ) -> Result<Self> {
        let current = language.current();
        let title = LocalizedText::new(Rc::clone(&catalog), settings.title_key.clone(), current)?;
        let description = LocalizedText::new(catalog, settings.description_key.clone(), current)?;

        let pending_language = Rc::new(Cell::new(None));
        let pending = Rc::clone(&pending_language);
        let subscription = language.on_updated(move |l| pending.set(Some(l)));

        Ok(Self {
            settings,
            terrain_settings,
            font: None,
            title,
            description,
            title_id: None,
            description_id: None,
            terrain_id: None,
            pending_language,
            subscription,
            events: EventBus::new(),
        })
    }

    pub fn events(&self) -> &EventBus<IntroEvent> {
        &self.events
    }

    pub fn title(&self) -> &str {
        self.title.text()
    }

    pub fn description(&self) -> &str {
        self.description.text()
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Both text objects are in the scene.
    pub fn is_ready(&self) -> bool {
        self.title_id.is_some() && self.description_id.is_some()
    }

    pub fn text_ids(&self) -> Option<(ObjectId, ObjectId)> {
        self.title_id.zip(self.description_id)
    }

    pub fn terrain_id(&self) -> Option<ObjectId> {
        self.terrain_id
    }

    /// Store the font, announce it and lay out the text.
    pub fn on_font_loaded(&mut self, font: Font, scene: &mut SceneGraph, follow: &mut CameraFollow) -> Option<Vec3> {
        self.font = Some(font);
        self.events.emit_and_record(IntroEvent::Loaded);
        self.layout(scene, follow)
    }

    /// Apply a language change observed since the last call. Returns whether
    /// the text was rebuilt.
    pub fn sync(&mut self, scene: &mut SceneGraph, follow: &mut CameraFollow) -> bool {
        let Some(language) = self.pending_language.take() else {
            return false;
        };
        for text in [&mut self.title, &mut self.description] {
            if let Err(e) = text.on_language_change(language) {
                log::warn!("intro: keeping '{}': {e}", text.text());
            }
        }
        self.layout(scene, follow);
        self.font.is_some()
    }

    /// Replace the text objects with freshly built ones and retarget the
    /// camera. Without a font this does nothing.
    pub fn layout(&mut self, scene: &mut SceneGraph, follow: &mut CameraFollow) -> Option<Vec3> {
        let Some(font) = &self.font else {
            log::debug!("intro: no font yet, layout deferred");
            return None;
        };

        for id in [self.title_id.take(), self.description_id.take()].into_iter().flatten() {
            scene.remove(id);
        }

        let s = &self.settings;
        let title = place_text(scene, font, self.title.text(), s.title_size, s.title_y, s);
        let description = place_text(scene, font, self.description.text(), s.description_size, s.description_y, s);
        self.title_id = Some(title);
        self.description_id = Some(description);

        let center = follow.retarget(scene, title, description);
        log::info!("intro: placed '{}' / '{}'", self.title.text(), self.description.text());
        self.events.emit(IntroEvent::TextsPlaced { center });
        center
    }

    /// Add the untextured terrain plane. Calling again returns the existing id.
    pub fn place_terrain(&mut self, scene: &mut SceneGraph) -> Option<ObjectId> {
        let t = &self.terrain_settings;
        if !t.enabled {
            return None;
        }
        if let Some(id) = self.terrain_id.filter(|id| scene.contains(*id)) {
            return Some(id);
        }
        let mesh = Mesh::plane(t.width, t.depth, t.segments, t.segments, None);
        let transform = Transform { position: t.position, rotation: t.rotation, ..Transform::default() };
        let mut object = VisualObject::mesh(ObjectKind::Scenery, Arc::new(mesh), Material::solid(t.color), transform);
        partition::tag(&mut object);
        let id = scene.add(object);
        self.terrain_id = Some(id);
        Some(id)
    }

    /// Attach a loaded terrain map. A height map rebuilds the plane with
    /// displacement; a colour map becomes the material texture. Returns
    /// whether the terrain changed.
    pub fn apply_terrain_texture(&mut self, scene: &mut SceneGraph, role: TextureRole, image: RgbaImage) -> bool {
        let t = &self.terrain_settings;
        let Some(terrain) = self.terrain_id.and_then(|id| scene.get_mut(id)) else {
            log::debug!("intro: no terrain for {role:?}");
            return false;
        };
        let Some(renderable) = terrain.renderable.as_mut() else {
            return false;
        };
        match role {
            TextureRole::TerrainHeight => {
                let mesh = Mesh::plane(t.width, t.depth, t.segments, t.segments, Some((&image, t.displacement_scale)));
                renderable.mesh = Arc::new(mesh);
            }
            TextureRole::TerrainColor => {
                renderable.material.texture = Some(Arc::new(Texture::new(image)));
            }
        }
        log::debug!("intro: terrain {role:?} applied");
        true
    }
}

impl Drop for IntroText {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

/// Build one extruded line, centred on x, and add it to the scene on the
/// bloom layer.
fn place_text(scene: &mut SceneGraph, font: &Font, text: &str, size: f32, y: f32, s: &TextConfig) -> ObjectId {
    let mesh = TextGeometry::build(text, font, size, s.depth);
    let bounds = mesh.bounds();
    let x = if bounds.is_empty() { 0.0 } else { -(bounds.min.x + bounds.size().x / 2.0) };
    let transform = Transform::at(Vec3::new(x, y, s.z));
    let mut object = VisualObject::mesh(ObjectKind::Text, Arc::new(mesh), Material::solid(s.color), transform);
    partition::tag(&mut object);
    scene.add(object)
}
