use backdrop::window::*;

#[test]
fn default_is_1280x720_windowed() {
    let cfg = WindowConfig::default();
    assert_eq!((cfg.width, cfg.height), (1280, 720));
    assert_eq!(cfg.mode, WindowMode::Windowed);
    assert_eq!(cfg.title, "backdrop");
}

#[test]
fn aspect_ratio_1280x720() {
    let ratio = WindowConfig::default().aspect_ratio();
    assert!((ratio - 16.0 / 9.0).abs() < 1e-5, "expected 16/9, got {ratio}");
}

#[test]
fn aspect_ratio_zero_height_returns_zero() {
    let cfg = WindowConfig { height: 0, ..WindowConfig::default() };
    assert_eq!(cfg.aspect_ratio(), 0.0);
}

#[test]
fn mode_deserializes_kebab_case() {
    let cfg: WindowConfig = serde_json::from_str(r#"{ "mode": "borderless", "width": 800 }"#).unwrap();
    assert_eq!(cfg.mode, WindowMode::Borderless);
    assert_eq!((cfg.width, cfg.height), (800, 720));
    assert!((cfg.aspect_ratio() - 800.0 / 720.0).abs() < 1e-5);
}

#[test]
fn closest_mode_compares_pixel_area() {
    let modes = [(640, 480), (1920, 1080), (1280, 800), (1280, 720)];
    assert_eq!(closest_by_area(modes, 1280, 720), Some(3));
    assert_eq!(closest_by_area(modes, 4000, 3000), Some(1));
    assert_eq!(closest_by_area(modes, 1, 1), Some(0));
    assert_eq!(closest_by_area(std::iter::empty(), 1280, 720), None);
}
