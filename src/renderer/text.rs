use std::collections::HashMap;

use glam::Vec3;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::geometry::{Mesh, MeshVertex};

// ── Glyph ────────────────────────────────────────────────────────────────────

/// One character of a bitmap font: `rows[0]` is the top row, `true` = filled.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub id: char,
    pub width: u32,
    pub rows: Vec<Vec<bool>>,
}

// ── Font ─────────────────────────────────────────────────────────────────────

/// A bitmap font loaded from a JSON description.
///
/// ```json
/// {
///   "cell_height": 7, "letter_spacing": 1, "space_width": 3,
///   "glyphs": { "I": ["###", ".#.", ".#.", ".#.", ".#.", ".#.", "###"] }
/// }
/// ```
///
/// Glyph rows use `#` for a filled pixel and any other character for empty.
/// Every glyph must have exactly `cell_height` rows.
#[derive(Debug, Clone)]
pub struct Font {
    pub glyphs: HashMap<char, Glyph>,
    /// Rows per glyph; text `size` maps to this many pixel rows.
    pub cell_height: u32,
    /// Empty pixel columns between consecutive glyphs.
    pub letter_spacing: u32,
    /// Advance, in pixel columns, of a space when the font has no ' ' glyph.
    pub space_width: u32,
}

impl Font {
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawFont = serde_json::from_str(json)?;
        if raw.cell_height == 0 {
            return Err(Error::Configuration("font cell_height must be positive".into()));
        }

        let mut glyphs = HashMap::with_capacity(raw.glyphs.len());
        for (key, rows) in raw.glyphs {
            // Only accept single-character keys.
            let mut chars = key.chars();
            let (Some(ch), None) = (chars.next(), chars.next()) else {
                log::warn!("font: skipping multi-character glyph key '{key}'");
                continue;
            };
            if rows.len() != raw.cell_height as usize {
                return Err(Error::Configuration(format!(
                    "glyph '{ch}' has {} rows, expected {}",
                    rows.len(),
                    raw.cell_height
                )));
            }
            let rows: Vec<Vec<bool>> =
                rows.iter().map(|r| r.chars().map(|c| c == '#').collect()).collect();
            let width = rows.iter().map(|r| r.len() as u32).max().unwrap_or(0);
            glyphs.insert(ch, Glyph { id: ch, width, rows });
        }

        Ok(Self {
            glyphs,
            cell_height: raw.cell_height,
            letter_spacing: raw.letter_spacing,
            space_width: raw.space_width,
        })
    }

    /// The glyph for `ch`, falling back to its upper-case form.
    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch).or_else(|| {
            let mut upper = ch.to_uppercase();
            match (upper.next(), upper.next()) {
                (Some(u), None) => self.glyphs.get(&u),
                _ => None,
            }
        })
    }
}

#[derive(Deserialize)]
struct RawFont {
    cell_height: u32,
    #[serde(default = "default_spacing")]
    letter_spacing: u32,
    #[serde(default = "default_space_width")]
    space_width: u32,
    glyphs: HashMap<String, Vec<String>>,
}

fn default_spacing() -> u32 { 1 }
fn default_space_width() -> u32 { 3 }

// ── TextGeometry ─────────────────────────────────────────────────────────────

/// Extruded 3-D text built from a bitmap [`Font`].
pub struct TextGeometry;

impl TextGeometry {
    /// Convert `text` into a closed, extruded mesh.
    ///
    /// # Layout
    /// - The first line's baseline sits on `y = 0` and glyphs rise to `y = size`.
    /// - The cursor starts at `x = 0` and advances right.
    /// - The front face is at `z = depth`, the back face at `z = 0`.
    ///
    /// Each horizontal run of filled pixels becomes one box, so a glyph costs
    /// a handful of boxes rather than one per pixel.
    ///
    /// # Skipping rules
    /// - `'\n'` resets X and moves down one line (cell height plus spacing).
    /// - Characters absent from the font (after upper-casing) are skipped and
    ///   do not advance the cursor, except space which advances `space_width`.
    pub fn build(text: &str, font: &Font, size: f32, depth: f32) -> Mesh {
        let px = size / font.cell_height as f32;
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        let mut cursor_x = 0.0_f32;
        let mut baseline = 0.0_f32;

        for ch in text.chars() {
            if ch == '\n' {
                cursor_x = 0.0;
                baseline -= (font.cell_height + font.letter_spacing) as f32 * px;
                continue;
            }

            let Some(glyph) = font.glyph(ch) else {
                if ch == ' ' {
                    cursor_x += (font.space_width + font.letter_spacing) as f32 * px;
                }
                continue;
            };

            for (r, row) in glyph.rows.iter().enumerate() {
                let top = baseline + size - r as f32 * px;
                let mut col = 0;
                while col < row.len() {
                    if !row[col] {
                        col += 1;
                        continue;
                    }
                    let start = col;
                    while col < row.len() && row[col] {
                        col += 1;
                    }
                    push_box(
                        &mut vertices,
                        &mut indices,
                        Vec3::new(cursor_x + start as f32 * px, top - px, 0.0),
                        Vec3::new(cursor_x + col as f32 * px, top, depth),
                    );
                }
            }

            cursor_x += (glyph.width + font.letter_spacing) as f32 * px;
        }

        Mesh::new(vertices, indices)
    }
}

/// Append an axis-aligned box with flat per-face normals.
fn push_box(vertices: &mut Vec<MeshVertex>, indices: &mut Vec<u32>, min: Vec3, max: Vec3) {
    // (normal, four corners counter-clockwise seen from outside)
    let faces: [([f32; 3], [Vec3; 4]); 6] = [
        ([0.0, 0.0, 1.0], [
            Vec3::new(min.x, min.y, max.z), Vec3::new(max.x, min.y, max.z),
            Vec3::new(max.x, max.y, max.z), Vec3::new(min.x, max.y, max.z),
        ]),
        ([0.0, 0.0, -1.0], [
            Vec3::new(max.x, min.y, min.z), Vec3::new(min.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z), Vec3::new(max.x, max.y, min.z),
        ]),
        ([1.0, 0.0, 0.0], [
            Vec3::new(max.x, min.y, max.z), Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, max.y, min.z), Vec3::new(max.x, max.y, max.z),
        ]),
        ([-1.0, 0.0, 0.0], [
            Vec3::new(min.x, min.y, min.z), Vec3::new(min.x, min.y, max.z),
            Vec3::new(min.x, max.y, max.z), Vec3::new(min.x, max.y, min.z),
        ]),
        ([0.0, 1.0, 0.0], [
            Vec3::new(min.x, max.y, max.z), Vec3::new(max.x, max.y, max.z),
            Vec3::new(max.x, max.y, min.z), Vec3::new(min.x, max.y, min.z),
        ]),
        ([0.0, -1.0, 0.0], [
            Vec3::new(min.x, min.y, min.z), Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, min.y, max.z), Vec3::new(min.x, min.y, max.z),
        ]),
    ];
    const UVS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

    for (normal, corners) in faces {
        let base = vertices.len() as u32;
        for (corner, uv) in corners.into_iter().zip(UVS) {
            vertices.push(MeshVertex { position: corner.into(), normal, uv });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}
