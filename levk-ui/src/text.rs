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

//! Text content: a view that lays out a string through an [`AsciiFont`] into
//! a [`DynamicPrimitive`], rebuilt only when the text or line height actually
//! changes.

use crate::font::AsciiFont;
use crate::view::{ViewContent, WorldFrame};
use levk_core::math::{Matrix4, UnitQuaternion, Vector3};
use levk_core::Uri;
use levk_resource::AssetProviders;
use levk_scene::{DrawList, Drawable, DynamicPrimitive, Geometry, SceneAssetProviders, DEFAULT_MATERIAL_URI};
use std::sync::Arc;

/// Renders a string at a fixed line height using a shared [`AsciiFont`].
/// `set_text`/`set_height` only rebuild the underlying geometry when the
/// value actually changed, since a fresh `Arc<DynamicPrimitive>` is built
/// wholesale rather than mutated in place through the existing one.
pub struct TextContent {
    font: Arc<AsciiFont>,
    material: Uri,
    text: String,
    height: f32,
    primitive: Arc<DynamicPrimitive>,
}

impl TextContent {
    pub fn new(font: Arc<AsciiFont>, material: Uri, text: impl Into<String>, height: f32) -> Self {
        let text = text.into();
        let geometry = font.layout(&text, height);
        let primitive = Arc::new(DynamicPrimitive::new(geometry));
        Self {
            font,
            material,
            text,
            height,
            primitive,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text != self.text {
            self.text = text;
            self.rebuild();
        }
    }

    pub fn set_height(&mut self, height: f32) {
        if (height - self.height).abs() > f32::EPSILON {
            self.height = height;
            self.rebuild();
        }
    }

    fn rebuild(&mut self) {
        let geometry: Geometry = self.font.layout(&self.text, self.height);
        self.primitive = Arc::new(DynamicPrimitive::new(geometry));
    }
}

impl ViewContent for TextContent {
    fn render(&self, frame: &WorldFrame, providers: &AssetProviders, out: &mut DrawList) {
        let translation = Matrix4::new_translation(&Vector3::new(
            frame.center.x - frame.extent.x * 0.5,
            frame.center.y + frame.extent.y * 0.5,
            0.0,
        ));
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), frame.rotation)
            .to_homogeneous();
        let material = if providers.materials().find(&self.material).is_some() {
            self.material.clone()
        } else {
            Uri::new(DEFAULT_MATERIAL_URI)
        };
        out.push(Drawable::Dynamic {
            primitive: self.primitive.clone(),
            material,
            parent_mat: translation * rotation,
            instances: vec![Matrix4::identity()],
        });
    }
}
