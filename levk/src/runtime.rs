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

//! The runtime loop (spec.md §4.14): initialize logger, vfs, asset providers,
//! render device and scene manager, run the caller's `setup`, then loop
//! window poll -> tick -> render -> present until the window closes, and
//! drain the device on the way out.
//!
//! Generic over the render device and the windowing back-end, since both are
//! named as external collaborators in spec.md §1 rather than concrete types
//! this crate owns.

use crate::scene_manager::{Level, SceneManager};
use crate::window::Window;
use levk_core::config::EngineConfig;
use levk_core::log::LevkLog;
use levk_core::{LevkError, Uri};
use levk_resource::registry::TypeRegistry;
use levk_resource::vfs::DiskVfs;
use levk_resource::AssetProviders;
use levk_scene::{build_asset_plan, preload, register_materials, Device, Scene, SceneRenderer};
use std::sync::Arc;
use std::time::Instant;

/// Owns the window, the render device, the asset pipeline and every loaded
/// level, and drives the per-frame loop described in spec.md §4.14.
pub struct Runtime<W: Window, D: Device> {
    window: W,
    device: D,
    vfs: Arc<DiskVfs>,
    providers: Arc<AssetProviders>,
    registry: Arc<TypeRegistry>,
    scenes: SceneManager,
    scene_renderer: SceneRenderer,
    last_tick: Instant,
    running: bool,
}

impl<W: Window, D: Device> Runtime<W, D> {
    /// Mounts the vfs at `config.data_root`, wires a fresh [`AssetProviders`]
    /// to its modification monitor, and takes ownership of an
    /// already-constructed window and device (both fallible to build, so
    /// construction happens on the caller's side where the concrete backend
    /// types are known).
    pub fn new(window: W, device: D, config: &EngineConfig) -> Self {
        let vfs = Arc::new(DiskVfs::new(config.data_root.clone()));
        let providers = Arc::new(AssetProviders::new(vfs.clone(), vfs.monitor().clone()));
        let registry = Arc::new(TypeRegistry::new());
        register_materials(&registry);
        Self {
            window,
            device,
            vfs,
            providers,
            registry,
            scenes: SceneManager::new(),
            scene_renderer: SceneRenderer::new(),
            last_tick: Instant::now(),
            running: true,
        }
    }

    /// The type registry scenes loaded through [`Runtime::load_level`]
    /// deserialize materials against. Already carries every shipped material
    /// kind ([`register_materials`]); a host application registers its own
    /// component/attachment kinds here before the first `load_level` call.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Reads the scene JSON at `uri`, pre-loads every asset it transitively
    /// references across `rayon`'s worker pool (spec.md §5), then builds a
    /// [`Level`] around the populated scene and inserts it under `name`.
    /// Returns `false` (and leaves `name` unloaded) if the scene JSON itself
    /// fails to read or parse.
    pub fn load_level(&mut self, name: impl Into<String>, uri: &Uri) -> bool {
        let plan = build_asset_plan(self.vfs.as_ref(), uri);
        preload(self.vfs.as_ref(), &self.providers, &self.registry, &plan);

        let mut scene = Scene::with_providers(name.into(), self.providers.clone());
        if !scene.import_json(self.vfs.as_ref(), uri) {
            return false;
        }
        let name = scene.name.clone();
        self.scenes.insert(name, Level::new(scene));
        true
    }

    pub fn vfs(&self) -> &Arc<DiskVfs> {
        &self.vfs
    }

    pub fn providers(&self) -> &Arc<AssetProviders> {
        &self.providers
    }

    pub fn scenes(&self) -> &SceneManager {
        &self.scenes
    }

    pub fn scenes_mut(&mut self) -> &mut SceneManager {
        &mut self.scenes
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Requests the loop stop after the current iteration finishes, the same
    /// way a window close event does.
    pub fn request_exit(&mut self) {
        self.running = false;
    }

    /// Runs `setup` once, then loops window poll -> tick -> render -> present
    /// until the window reports a close request or [`Runtime::request_exit`]
    /// is called, then drains the device and clears every asset provider.
    ///
    /// Per spec.md §6, the caller's binary maps `Ok(())` to exit code 0 and a
    /// propagated [`LevkError`] to exit code 1.
    pub fn run(mut self, mut setup: impl FnMut(&mut Self)) -> Result<(), LevkError> {
        setup(&mut self);
        self.last_tick = Instant::now();

        while self.running {
            let input = self.window.poll();
            if input.close_requested {
                self.running = false;
                break;
            }

            let now = Instant::now();
            let dt = (now - self.last_tick).as_secs_f32();
            self.last_tick = now;

            self.vfs.dispatch_modified();

            if let Some(level) = self.scenes.active_mut() {
                level.scene.tick(dt);
                level.ui.tick(dt, &input);
            }

            let (width, height) = self.window.framebuffer_extent();
            let aspect_ratio = width as f32 / height.max(1) as f32;

            if let Some(level) = self.scenes.active() {
                let render_list = self.scene_renderer.render_list_mut();
                render_list.ui.clear();
                level.ui.render(
                    levk_core::math::Vector2::new(width as f32, height as f32),
                    &self.providers,
                    &mut render_list.ui,
                );
                if let Err(error) =
                    self.scene_renderer
                        .render(&level.scene, &mut self.device, aspect_ratio)
                {
                    LevkLog::err(format!("runtime: frame failed: {error}"));
                    return Err(error);
                }
            }
        }

        self.device.drain();
        self.providers.clear_all();
        Ok(())
    }
}
