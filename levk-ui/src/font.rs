// Copyright (c) 2024-present the levk contributors
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! A fixed-grid bitmap font: one texture holding every printable ASCII glyph
//! laid out on a regular grid, and the quad-strip layout routine that turns a
//! string into renderable [`Geometry`].

use levk_core::math::{Vector2, Vector3, Vector4};
use levk_core::Uri;
use levk_scene::Geometry;

/// Glyphs run from `b' '` (32) through `b'\x7f'` (127) inclusive, 96 in total,
/// laid out left-to-right, top-to-bottom on a 16-column grid.
const FIRST_GLYPH: u8 = 32;
const LAST_GLYPH: u8 = 127;
const GRID_COLUMNS: u32 = 16;
const GRID_ROWS: u32 = 6;

/// A monospace bitmap font backed by a single grid-atlas texture.
#[derive(Debug, Clone)]
pub struct AsciiFont {
    pub texture: Uri,
    /// Glyph cell width divided by height, used to size each quad so glyphs
    /// don't appear stretched at an arbitrary line height.
    pub glyph_aspect: f32,
}

impl AsciiFont {
    pub fn new(texture: Uri, glyph_aspect: f32) -> Self {
        Self {
            texture,
            glyph_aspect,
        }
    }

    /// UV rectangle `(u_min, v_min, u_max, v_max)` for `ch`. Bytes outside
    /// `32..=127` fall back to the blank space glyph rather than panicking.
    pub fn glyph_uv(&self, ch: u8) -> (f32, f32, f32, f32) {
        let index = if (FIRST_GLYPH..=LAST_GLYPH).contains(&ch) {
            (ch - FIRST_GLYPH) as u32
        } else {
            0
        };
        let column = index % GRID_COLUMNS;
        let row = index / GRID_COLUMNS;
        let cell_w = 1.0 / GRID_COLUMNS as f32;
        let cell_h = 1.0 / GRID_ROWS as f32;
        let u_min = column as f32 * cell_w;
        let v_min = row as f32 * cell_h;
        (u_min, v_min, u_min + cell_w, v_min + cell_h)
    }

    /// Lays out `text` left-to-right as one quad per byte, each `height`
    /// tall and `height * glyph_aspect` wide, advancing along +x with no
    /// kerning. Newlines advance one line down and reset x to zero.
    pub fn layout(&self, text: &str, height: f32) -> Geometry {
        let advance = height * self.glyph_aspect;
        let mut geometry = Geometry::default();
        let mut cursor_x = 0.0f32;
        let mut cursor_y = 0.0f32;

        for byte in text.bytes() {
            if byte == b'\n' {
                cursor_x = 0.0;
                cursor_y -= height;
                continue;
            }
            let (u0, v0, u1, v1) = self.glyph_uv(byte);
            let base = geometry.positions.len() as u32;

            geometry.positions.push(Vector3::new(cursor_x, cursor_y - height, 0.0));
            geometry.positions.push(Vector3::new(cursor_x + advance, cursor_y - height, 0.0));
            geometry.positions.push(Vector3::new(cursor_x + advance, cursor_y, 0.0));
            geometry.positions.push(Vector3::new(cursor_x, cursor_y, 0.0));

            geometry.uvs.push(Vector2::new(u0, v1));
            geometry.uvs.push(Vector2::new(u1, v1));
            geometry.uvs.push(Vector2::new(u1, v0));
            geometry.uvs.push(Vector2::new(u0, v0));

            for _ in 0..4 {
                geometry.normals.push(Vector3::new(0.0, 0.0, 1.0));
                geometry.rgbas.push(Vector4::new(1.0, 1.0, 1.0, 1.0));
            }

            geometry.indices.extend_from_slice(&[
                base,
                base + 1,
                base + 2,
                base,
                base + 2,
                base + 3,
            ]);

            cursor_x += advance;
        }
        geometry
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn glyph_uv_maps_space_to_the_first_cell() {
        let font = AsciiFont::new(Uri::new("fonts/ascii.png"), 0.6);
        let (u0, v0, u1, v1) = font.glyph_uv(b' ');
        assert_eq!((u0, v0), (0.0, 0.0));
        assert!(u1 > u0 && v1 > v0);
    }

    #[test]
    fn glyph_uv_falls_back_to_space_for_out_of_range_bytes() {
        let font = AsciiFont::new(Uri::new("fonts/ascii.png"), 0.6);
        assert_eq!(font.glyph_uv(0), font.glyph_uv(b' '));
        assert_eq!(font.glyph_uv(200), font.glyph_uv(b' '));
    }

    #[test]
    fn layout_emits_one_quad_per_byte() {
        let font = AsciiFont::new(Uri::new("fonts/ascii.png"), 0.6);
        let geometry = font.layout("hi", 10.0);
        assert_eq!(geometry.positions.len(), 8);
        assert_eq!(geometry.indices.len(), 12);
    }

    #[test]
    fn layout_of_empty_string_is_empty_geometry() {
        let font = AsciiFont::new(Uri::new("fonts/ascii.png"), 0.6);
        let geometry = font.layout("", 10.0);
        assert!(geometry.positions.is_empty());
        assert!(geometry.indices.is_empty());
    }

    #[test]
    fn newline_resets_x_and_advances_y() {
        let font = AsciiFont::new(Uri::new("fonts/ascii.png"), 0.6);
        let geometry = font.layout("a\nb", 10.0);
        // Second glyph's first vertex should be back at x=0, one line down.
        assert_eq!(geometry.positions[4].x, 0.0);
        assert_eq!(geometry.positions[4].y, -20.0);
    }
}
