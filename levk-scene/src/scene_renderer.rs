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

//! Thin orchestrator sitting between a [`Scene`] and a [`Device`]: allocates
//! the per-frame [`RenderList`], asks the scene to fill its half of it, and
//! submits the result to the device. Owns nothing the device itself doesn't
//! — no GPU resources live here, only the CPU-side scratch the render list
//! needs from one frame to the next.

use crate::device::{CameraView, Device, Frame};
use crate::draw_list::RenderList;
use crate::scene::Scene;
use levk_core::LevkError;

/// Renders one [`Scene`] through one [`Device`] each frame. `aspect_ratio` is
/// supplied by the caller (the runtime loop, which owns the window) rather
/// than computed here, since the scene renderer has no window access of its
/// own.
pub struct SceneRenderer {
    render_list: RenderList,
}

impl Default for SceneRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneRenderer {
    pub fn new() -> Self {
        Self {
            render_list: RenderList::new((0, 0)),
        }
    }

    /// Clears the render list, asks `scene` to fill its 3D half, merges in
    /// whatever the caller already accumulated for the UI half via
    /// [`Self::render_list_mut`], then hands the merged list to `device`.
    pub fn render(
        &mut self,
        scene: &Scene,
        device: &mut dyn Device,
        aspect_ratio: f32,
    ) -> Result<(), LevkError> {
        self.render_list.scene.clear();
        scene.render(&mut self.render_list);

        let camera = CameraView {
            view_projection: scene.camera.camera.projection_matrix(aspect_ratio)
                * scene.camera.camera.view_matrix(),
            position: scene.camera.camera.transform.position(),
            exposure: 1.0,
        };

        device.render(Frame {
            render_list: &self.render_list,
            asset_providers: scene.providers(),
            lights: &scene.lights,
            camera: &camera,
        })
    }

    /// The UI layer writes its drawables in here before [`Self::render`] is
    /// called; the scene half is overwritten every frame, the UI half is the
    /// caller's responsibility to clear.
    pub fn render_list_mut(&mut self) -> &mut RenderList {
        &mut self.render_list
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device::{DeviceInfo, VsyncMode};
    use levk_core::math::Vector3;

    struct NullDevice {
        draw_calls: u32,
        frames_rendered: u32,
    }

    impl Device for NullDevice {
        fn info(&self) -> DeviceInfo {
            DeviceInfo {
                color_space: crate::device::ColorSpace::Srgb,
                msaa_samples: 1,
                vsync: VsyncMode::On,
                render_scale: 1.0,
            }
        }

        fn set_render_scale(&mut self, _scale: f32) {}
        fn set_vsync(&mut self, _mode: VsyncMode) {}
        fn set_clear(&mut self, _rgba: [f32; 4]) {}

        fn render(&mut self, frame: Frame<'_>) -> Result<(), LevkError> {
            self.draw_calls = frame.render_list.scene.len() as u32;
            self.frames_rendered += 1;
            Ok(())
        }

        fn draw_calls_last_frame(&self) -> u32 {
            self.draw_calls
        }

        fn drain(&mut self) {}
    }

    #[test]
    fn render_clears_and_rebuilds_scene_list_each_frame() {
        let scene = Scene::new("test");
        let mut renderer = SceneRenderer::new();
        let mut device = NullDevice {
            draw_calls: 0,
            frames_rendered: 0,
        };

        renderer.render(&scene, &mut device, 16.0 / 9.0).unwrap();
        assert_eq!(device.frames_rendered, 1);

        renderer.render(&scene, &mut device, 16.0 / 9.0).unwrap();
        assert_eq!(device.frames_rendered, 2);
    }

    #[test]
    fn camera_view_uses_the_supplied_aspect_ratio() {
        let mut scene = Scene::new("test");
        scene.camera.camera.transform.set_position(Vector3::new(0.0, 0.0, 5.0));
        let mut renderer = SceneRenderer::new();
        let mut device = NullDevice {
            draw_calls: 0,
            frames_rendered: 0,
        };
        renderer.render(&scene, &mut device, 1.0).unwrap();
        assert_eq!(device.frames_rendered, 1);
    }
}
