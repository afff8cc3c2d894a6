use std::cell::Cell;
use std::rc::Rc;

use backdrop::assets::TextureRole;
use backdrop::config::{TerrainConfig, TextConfig};
use backdrop::follow::CameraFollow;
use backdrop::i18n::{Language, LanguageContext, TextCatalog};
use backdrop::intro::{IntroEvent, IntroEventKind, IntroText};
use backdrop::layers::Layer;
use backdrop::renderer::text::Font;
use backdrop::scene::{ObjectKind, SceneGraph};
use image::{Rgba, RgbaImage};

const FONT: &str = r####"{
    "cell_height": 3,
    "glyphs": {
        "A": [".#.", "###", "#.#"],
        "B": ["##.", "###", "##."],
        "C": ["###", "#..", "###"]
    }
}"####;

const CATALOG: &str = r#"{
    "en-us": { "intro": { "title": "AB", "description": "C" } },
    "pt-br": { "intro": { "title": "ABCABC", "description": "CC" } }
}"#;

struct Fixture {
    scene: SceneGraph,
    follow: CameraFollow,
    language: LanguageContext,
    intro: IntroText,
}

fn fixture(terrain: TerrainConfig) -> Fixture {
    let language = LanguageContext::new(Language::EnUs);
    let catalog = Rc::new(TextCatalog::from_json(CATALOG).unwrap());
    let intro = IntroText::new(catalog, &language, TextConfig::default(), terrain).unwrap();
    Fixture { scene: SceneGraph::new(), follow: CameraFollow::new(), language, intro }
}

fn small_terrain() -> TerrainConfig {
    TerrainConfig { width: 20.0, depth: 20.0, segments: 4, displacement_scale: 10.0, ..TerrainConfig::default() }
}

fn text_count(scene: &SceneGraph) -> usize {
    scene.ids_of_kind(ObjectKind::Text).len()
}

#[test]
fn nothing_is_placed_before_the_font_arrives() {
    let mut f = fixture(small_terrain());
    assert_eq!(f.intro.title(), "AB");
    assert!(f.intro.layout(&mut f.scene, &mut f.follow).is_none());
    assert!(!f.intro.is_ready());
    assert_eq!(text_count(&f.scene), 0);
    assert_eq!(f.follow.target(), None);
}

#[test]
fn font_load_places_centred_bloom_text() {
    let mut f = fixture(small_terrain());
    let center = f.intro.on_font_loaded(Font::from_json(FONT).unwrap(), &mut f.scene, &mut f.follow);

    assert!(f.intro.is_ready());
    assert_eq!(f.intro.events().recorded(IntroEventKind::Loaded), Some(IntroEvent::Loaded));
    let (title, description) = f.intro.text_ids().unwrap();
    for id in [title, description] {
        let object = f.scene.get(id).unwrap();
        assert_eq!(object.layers.single(), Some(Layer::Bloom));
        let bounds = f.scene.world_bounds(id).unwrap();
        assert!((bounds.center().x).abs() < 1e-4, "text not centred: {bounds:?}");
        assert_eq!(object.transform.position.z, 50.0);
    }
    assert_eq!(f.scene.get(title).unwrap().transform.position.y, 100.0);
    assert_eq!(f.scene.get(description).unwrap().transform.position.y, 80.0);

    let center = center.unwrap();
    assert_eq!(f.follow.target(), Some(center));
    // Title spans y 100..118, description 80..90.
    assert!((center.y - (109.0 + 85.0) / 2.0).abs() < 1e-3);
}

#[test]
fn language_change_replaces_texts_once_and_retargets() {
    let mut f = fixture(small_terrain());
    f.intro.on_font_loaded(Font::from_json(FONT).unwrap(), &mut f.scene, &mut f.follow);
    let (old_title, old_description) = f.intro.text_ids().unwrap();
    let old_target = f.follow.target();

    let placed = Rc::new(Cell::new(0));
    let counter = Rc::clone(&placed);
    f.intro.events().subscribe(IntroEventKind::TextsPlaced, move |_| counter.set(counter.get() + 1));

    f.language.update_language(Language::PtBr);
    // Applied on the next sync, not inside the notification.
    assert!(f.scene.contains(old_title));
    assert!(f.intro.sync(&mut f.scene, &mut f.follow));
    assert!(!f.intro.sync(&mut f.scene, &mut f.follow));

    assert_eq!(placed.get(), 1);
    assert!(!f.scene.contains(old_title) && !f.scene.contains(old_description));
    assert_eq!(text_count(&f.scene), 2);
    assert_eq!(f.intro.title(), "ABCABC");

    let (title, description) = f.intro.text_ids().unwrap();
    let a = f.scene.world_bounds(title).unwrap();
    let b = f.scene.world_bounds(description).unwrap();
    assert_eq!(f.follow.target(), Some(CameraFollow::midpoint(&a, &b)));
    assert_ne!(f.follow.target(), None);
    assert_eq!(old_target.map(|t| t.y), f.follow.target().map(|t| t.y));
}

#[test]
fn dropping_intro_stops_listening() {
    let f = fixture(small_terrain());
    let language = f.language.clone();
    assert_eq!(language.events().listener_count(backdrop::i18n::LanguageEventKind::Updated), 1);
    drop(f);
    assert_eq!(language.events().listener_count(backdrop::i18n::LanguageEventKind::Updated), 0);
}

#[test]
fn terrain_is_placed_once_and_textured_later() {
    let mut f = fixture(small_terrain());
    let id = f.intro.place_terrain(&mut f.scene).unwrap();
    assert_eq!(f.intro.place_terrain(&mut f.scene), Some(id));
    assert_eq!(f.scene.len(), 1);
    assert_eq!(f.scene.get(id).unwrap().layers.single(), Some(Layer::Base));

    let flat = f.scene.world_bounds(id).unwrap();
    // Black left column, white elsewhere: displacement spans 0..10.
    let mut ridge = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
    for y in 0..4 {
        ridge.put_pixel(0, y, Rgba([0, 0, 0, 255]));
    }
    assert!(f.intro.apply_terrain_texture(&mut f.scene, TextureRole::TerrainHeight, ridge.clone()));
    let raised = f.scene.world_bounds(id).unwrap();
    assert!((raised.size().y - flat.size().y - 10.0).abs() < 1e-3, "{flat:?} -> {raised:?}");

    assert!(f.intro.apply_terrain_texture(&mut f.scene, TextureRole::TerrainColor, ridge));
    let material = &f.scene.get(id).unwrap().renderable.as_ref().unwrap().material;
    assert!(material.texture.is_some());
}

#[test]
fn disabled_terrain_ignores_textures() {
    let mut f = fixture(TerrainConfig { enabled: false, ..small_terrain() });
    assert_eq!(f.intro.place_terrain(&mut f.scene), None);
    let image = RgbaImage::new(2, 2);
    assert!(!f.intro.apply_terrain_texture(&mut f.scene, TextureRole::TerrainColor, image));
}
