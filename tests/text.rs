use backdrop::Error;
use backdrop::renderer::text::*;

fn font() -> Font {
    Font::from_json(
        r###"{
            "cell_height": 2,
            "letter_spacing": 1,
            "space_width": 2,
            "glyphs": {
                "I": ["#", "#"],
                "L": ["#.", "##"],
                "Ã": [".#", "##"]
            }
        }"###,
    )
    .unwrap()
}

#[test]
fn from_json_parses_glyph_rows() {
    let font = font();
    assert_eq!(font.cell_height, 2);
    assert_eq!(font.glyphs.len(), 3);
    let l = &font.glyphs[&'L'];
    assert_eq!(l.width, 2);
    assert_eq!(l.rows, vec![vec![true, false], vec![true, true]]);
}

#[test]
fn from_json_rejects_wrong_row_count() {
    let json = r##"{ "cell_height": 3, "glyphs": { "A": ["#", "#"] } }"##;
    assert!(matches!(Font::from_json(json), Err(Error::Configuration(_))));
}

#[test]
fn from_json_rejects_zero_height_and_bad_json() {
    assert!(Font::from_json(r#"{ "cell_height": 0, "glyphs": {} }"#).is_err());
    assert!(matches!(Font::from_json("not json"), Err(Error::Json(_))));
}

#[test]
fn lookup_falls_back_to_upper_case() {
    let font = font();
    assert_eq!(font.glyph('l').map(|g| g.id), Some('L'));
    assert_eq!(font.glyph('ã').map(|g| g.id), Some('Ã'));
    assert!(font.glyph('x').is_none());
}

#[test]
fn empty_text_builds_empty_mesh() {
    let mesh = TextGeometry::build("", &font(), 10.0, 1.0);
    assert!(mesh.is_empty());
    assert!(mesh.bounds().is_empty());
}

#[test]
fn one_box_per_horizontal_run() {
    // "L": row 0 has one run, row 1 has one run of two pixels.
    let mesh = TextGeometry::build("L", &font(), 10.0, 1.0);
    assert_eq!(mesh.triangle_count(), 2 * 12);
    assert_eq!(mesh.vertices.len(), 2 * 24);
}

#[test]
fn glyph_height_is_size_and_depth_is_extrusion() {
    let mesh = TextGeometry::build("I", &font(), 18.0, 4.0);
    let b = mesh.bounds();
    assert!((b.min.y - 0.0).abs() < 1e-5 && (b.max.y - 18.0).abs() < 1e-5);
    assert!((b.min.z - 0.0).abs() < 1e-5 && (b.max.z - 4.0).abs() < 1e-5);
    assert!((b.size().x - 9.0).abs() < 1e-5);
}

#[test]
fn unknown_characters_are_skipped_but_spaces_advance() {
    let f = font();
    let px = 10.0 / 2.0;
    let plain = TextGeometry::build("II", &f, 10.0, 1.0).bounds();
    let unknown = TextGeometry::build("I?I", &f, 10.0, 1.0).bounds();
    let spaced = TextGeometry::build("I I", &f, 10.0, 1.0).bounds();
    assert_eq!(plain, unknown);
    assert!((spaced.size().x - plain.size().x - (2.0 + 1.0) * px).abs() < 1e-4);
}

#[test]
fn newline_moves_down_a_line() {
    let mesh = TextGeometry::build("I\nI", &font(), 10.0, 1.0);
    let b = mesh.bounds();
    // Second line drops by cell height plus spacing: 3 pixels of 5 units.
    assert!((b.min.y + 15.0).abs() < 1e-4, "{b:?}");
    assert!((b.max.y - 10.0).abs() < 1e-4);
}

#[test]
fn shipped_font_covers_intro_strings() {
    let json = std::fs::read_to_string(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/fonts/pixel.json")).unwrap();
    let font = Font::from_json(&json).unwrap();
    for text in ["JOÃO PINHEIRO", "SOFTWARE DEVELOPER", "DESENVOLVEDOR DE SOFTWARE"] {
        for ch in text.chars().filter(|c| *c != ' ') {
            assert!(font.glyph(ch).is_some(), "missing glyph {ch:?}");
        }
    }
}
