use std::path::{Path, PathBuf};

use backdrop::assets::*;
use backdrop::Error;

fn asset(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(rel)
}

#[test]
fn shipped_font_covers_both_languages() {
    let LoadedAsset::Font(font) = load(&AssetRequest::Font(asset("assets/fonts/pixel.json"))).unwrap() else {
        panic!("expected a font");
    };
    for ch in "JOÃO PINHEIRO DESENVOLVEDOR DE SOFTWARE".chars().filter(|c| *c != ' ') {
        assert!(font.glyph(ch).is_some(), "missing glyph {ch:?}");
    }
}

#[test]
fn shipped_textures_decode_to_rgba() {
    let request = AssetRequest::Texture(TextureRole::TerrainHeight, asset("assets/textures/height.png"));
    match load(&request).unwrap() {
        LoadedAsset::Texture(role, image) => {
            assert_eq!(role, TextureRole::TerrainHeight);
            assert!(image.width() > 0 && image.height() > 0);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn missing_file_reports_its_path() {
    let path = asset("assets/fonts/nope.json");
    match load(&AssetRequest::Font(path.clone())) {
        Err(Error::AssetLoad { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected AssetLoad, got {other:?}"),
    }
}

#[test]
fn loader_delivers_every_request_once() {
    let mut loader = AssetLoader::new();
    let font = loader.request(AssetRequest::Font(asset("assets/fonts/pixel.json")));
    let broken = loader.request(AssetRequest::Texture(TextureRole::TerrainColor, asset("missing.png")));
    assert_eq!(loader.pending(), 2);

    let events = loader.wait_all();
    assert_eq!(events.len(), 2);
    assert_eq!(loader.pending(), 0);
    for event in &events {
        if event.id == font {
            assert!(matches!(event.result, Ok(LoadedAsset::Font(_))));
        } else {
            assert_eq!(event.id, broken);
            assert!(event.result.is_err());
        }
    }
    assert!(loader.poll().is_empty());
}
