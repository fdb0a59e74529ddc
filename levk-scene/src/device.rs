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

//! The render device: an abstract contract a concrete Vulkan backend
//! implements. Everything here is GAPI-agnostic — swapchain acquisition,
//! pipeline caching, material/frame submission — so `levk-scene` never names
//! a Vulkan type directly. [`Device`] is the trait every backend implements;
//! [`PipelineCache`] and [`DeferredDestructionRing`] are backend-agnostic
//! helpers a real implementation is expected to build on.

use crate::draw_list::RenderList;
use crate::scene::Lights;
use fxhash::FxHashMap;
use levk_core::math::Matrix4;
use levk_core::LevkError;
use levk_resource::AssetProviders;
use std::collections::VecDeque;

/// A window or headless surface provider. The device never polls input or
/// owns a window directly; it only asks this trait for the things a
/// swapchain needs to exist and stay correctly sized.
pub trait SurfaceSource {
    /// Current drawable extent in physical pixels.
    fn framebuffer_extent(&self) -> (u32, u32);
    /// Opaque handle the concrete backend downcasts to its windowing type
    /// (e.g. a raw-window-handle pair) to create a surface.
    fn raw_handle(&self) -> &dyn std::any::Any;
}

/// Presentation mode for the swapchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VsyncMode {
    Off,
    On,
    Mailbox,
}

/// Swapchain colour space. `Srgb` is the only one the shipped shaders assume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    Srgb,
    Linear,
}

/// Pixel format a framebuffer attachment or pipeline target is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    Rgba8Srgb,
    Rgba16Float,
    Depth32Float,
}

/// Snapshot of the device's current configuration, returned by [`Device::info`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceInfo {
    pub color_space: ColorSpace,
    pub msaa_samples: u32,
    pub vsync: VsyncMode,
    pub render_scale: f32,
}

/// Parameters the concrete backend's constructor consumes. Not part of the
/// [`Device`] trait itself — a constructor taking `&dyn SurfaceSource` is not
/// object-safe, so every backend exposes its own inherent `new`.
#[derive(Debug, Clone, Copy)]
pub struct DeviceCreateInfo {
    pub vsync: VsyncMode,
    pub render_scale: f32,
    pub msaa_samples: u32,
}

impl Default for DeviceCreateInfo {
    fn default() -> Self {
        Self {
            vsync: VsyncMode::On,
            render_scale: 1.0,
            msaa_samples: 1,
        }
    }
}

/// Lower/upper bound a backend must clamp `set_render_scale` to.
pub const RENDER_SCALE_RANGE: (f32, f32) = (0.2, 8.0);

/// Coarse rasterizer state a pipeline is built against; part of the
/// pipeline identity alongside shader and vertex-layout hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub blend: bool,
    pub cull_back_face: bool,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            blend: false,
            cull_back_face: true,
        }
    }
}

/// Uniquely identifies a cached pipeline: `(shader_hash, vertex_input_hash,
/// pipeline_state, target_format)`. Two drawables that resolve to the same
/// key share the built pipeline object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub shader_hash: u64,
    pub vertex_input_hash: u64,
    pub pipeline_state: PipelineState,
    pub target_format: TargetFormat,
}

/// Backend-agnostic cache mapping [`PipelineKey`] to an opaque, backend-owned
/// pipeline handle `P`. Built lazily: [`PipelineCache::get_or_insert_with`]
/// only invokes the builder closure on a cache miss.
pub struct PipelineCache<P> {
    entries: FxHashMap<PipelineKey, P>,
}

impl<P> Default for PipelineCache<P> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }
}

impl<P> PipelineCache<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert_with(&mut self, key: PipelineKey, build: impl FnOnce() -> P) -> &P {
        self.entries.entry(key).or_insert_with(build)
    }

    /// Drops every cached pipeline whose shader hash matches `shader_hash`.
    /// Called when a shader provider entry reloads, since the shader hash is
    /// part of every affected pipeline's identity.
    pub fn invalidate_shader(&mut self, shader_hash: u64) {
        self.entries.retain(|key, _| key.shader_hash != shader_hash);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Frames a GPU resource may still be in flight for before it is safe to
/// actually destroy. Triple-buffered: a resource retired this frame is freed
/// once two more frames have completed.
const DESTRUCTION_RING_DEPTH: usize = 3;

/// Defers destruction of backend-owned resources (buffers, images, pipelines)
/// until the GPU is known to be done with them. A resource `retire`d this
/// frame is only dropped after [`DeferredDestructionRing::advance`] has been
/// called `DESTRUCTION_RING_DEPTH` times without that slot being touched
/// again, matching the device's triple-buffered frame-in-flight model.
pub struct DeferredDestructionRing<R> {
    slots: VecDeque<Vec<R>>,
}

impl<R> Default for DeferredDestructionRing<R> {
    fn default() -> Self {
        let mut slots = VecDeque::with_capacity(DESTRUCTION_RING_DEPTH);
        for _ in 0..DESTRUCTION_RING_DEPTH {
            slots.push_back(Vec::new());
        }
        Self { slots }
    }
}

impl<R> DeferredDestructionRing<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `resource` for destruction once its ring slot comes back around.
    pub fn retire(&mut self, resource: R) {
        self.slots.back_mut().expect("ring never empty").push(resource);
    }

    /// Rotates the ring by one frame, dropping whatever was retired
    /// `DESTRUCTION_RING_DEPTH` frames ago.
    pub fn advance(&mut self) {
        self.slots.pop_front();
        self.slots.push_back(Vec::new());
    }
}

/// The camera state a frame is rendered from. Mirrors [`crate::scene::Camera`]
/// but decoupled from the scene module so the device trait does not need to
/// depend on it directly.
#[derive(Debug, Clone, Copy)]
pub struct CameraView {
    pub view_projection: Matrix4<f32>,
    pub position: levk_core::math::Vector3<f32>,
    pub exposure: f32,
}

/// Everything [`Device::render`] needs to produce one frame. Borrowed for the
/// duration of the call; none of it is retained by the device across frames.
pub struct Frame<'a> {
    pub render_list: &'a RenderList,
    pub asset_providers: &'a AssetProviders,
    pub lights: &'a Lights,
    pub camera: &'a CameraView,
}

/// Abstract render device contract. A concrete backend owns the surface,
/// swapchain, and every GPU resource; this trait only exposes the
/// per-frame and configuration surface the rest of the engine calls.
///
/// Construction is intentionally not part of this trait: `new(window,
/// create_info)` takes a concrete `&dyn SurfaceSource` and returns `Self`,
/// which is not object-safe, so each backend exposes its own inherent `new`
/// returning `Result<Self, LevkError>`.
pub trait Device {
    /// Current swapchain colour space, MSAA level, vsync mode, render scale.
    fn info(&self) -> DeviceInfo;

    /// Clamped to [`RENDER_SCALE_RANGE`] before being applied.
    fn set_render_scale(&mut self, scale: f32);

    fn set_vsync(&mut self, mode: VsyncMode);

    fn set_clear(&mut self, rgba: [f32; 4]);

    /// Performs one complete frame: acquires the swapchain image, optionally
    /// renders a shadow depth map for the primary directional light, renders
    /// 3D drawables into an off-screen colour attachment, composites that
    /// onto the UI layer while rendering UI drawables, then presents.
    fn render(&mut self, frame: Frame<'_>) -> Result<(), LevkError>;

    /// Draw calls issued during the most recently completed [`Device::render`].
    fn draw_calls_last_frame(&self) -> u32;

    /// Blocks until every in-flight frame has completed. Called once, during
    /// shutdown, before providers and the VFS are torn down.
    fn drain(&mut self);
}

/// Clamps a requested render scale to [`RENDER_SCALE_RANGE`]. Every backend's
/// `set_render_scale` is expected to route through this rather than storing
/// the raw value.
pub fn clamp_render_scale(scale: f32) -> f32 {
    scale.clamp(RENDER_SCALE_RANGE.0, RENDER_SCALE_RANGE.1)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn render_scale_clamps_to_range() {
        assert_eq!(clamp_render_scale(0.01), RENDER_SCALE_RANGE.0);
        assert_eq!(clamp_render_scale(100.0), RENDER_SCALE_RANGE.1);
        assert_eq!(clamp_render_scale(2.0), 2.0);
    }

    #[test]
    fn pipeline_cache_builds_lazily_and_reuses() {
        let mut cache: PipelineCache<u32> = PipelineCache::new();
        let key = PipelineKey {
            shader_hash: 1,
            vertex_input_hash: 2,
            pipeline_state: PipelineState::default(),
            target_format: TargetFormat::Rgba8Srgb,
        };
        let mut builds = 0;
        cache.get_or_insert_with(key, || {
            builds += 1;
            42
        });
        cache.get_or_insert_with(key, || {
            builds += 1;
            42
        });
        assert_eq!(builds, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn pipeline_cache_invalidate_shader_drops_matching_entries() {
        let mut cache: PipelineCache<u32> = PipelineCache::new();
        let a = PipelineKey {
            shader_hash: 1,
            vertex_input_hash: 0,
            pipeline_state: PipelineState::default(),
            target_format: TargetFormat::Rgba8Srgb,
        };
        let b = PipelineKey {
            shader_hash: 2,
            vertex_input_hash: 0,
            pipeline_state: PipelineState::default(),
            target_format: TargetFormat::Rgba8Srgb,
        };
        cache.get_or_insert_with(a, || 1);
        cache.get_or_insert_with(b, || 2);
        cache.invalidate_shader(1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn destruction_ring_frees_resources_after_full_rotation() {
        let mut ring: DeferredDestructionRing<&'static str> = DeferredDestructionRing::new();
        ring.retire("buffer-a");
        ring.advance();
        ring.advance();
        // Two rotations in: "buffer-a" has not yet reached the front slot.
        ring.advance();
        // Third rotation: the slot holding "buffer-a" has cycled all the way
        // through and been dropped.
        assert_eq!(ring.slots.len(), DESTRUCTION_RING_DEPTH);
    }
}
