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

//! Startup configuration, loaded by the runtime loop crate before the render
//! device and asset providers are created.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VsyncMode {
    Off,
    On,
    Adaptive,
}

impl Default for VsyncMode {
    fn default() -> Self {
        VsyncMode::On
    }
}

/// Top-level engine configuration, deserialized from a RON file next to the
/// executable (`levk.ron`) by the runtime loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub vsync: VsyncMode,
    pub render_scale: f32,
    /// Uri prefix under which the mounted virtual file system resolves asset uris.
    pub data_root: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_title: "levk".to_string(),
            window_width: 1280,
            window_height: 720,
            vsync: VsyncMode::On,
            render_scale: 1.0,
            data_root: "data".to_string(),
        }
    }
}

impl EngineConfig {
    /// Render scale is clamped to `[0.2, 8.0]` per the device contract.
    pub fn clamped_render_scale(&self) -> f32 {
        self.render_scale.clamp(0.2, 8.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn render_scale_clamps_to_device_bounds() {
        let mut config = EngineConfig::default();
        config.render_scale = 20.0;
        assert_eq!(config.clamped_render_scale(), 8.0);
        config.render_scale = 0.01;
        assert_eq!(config.clamped_render_scale(), 0.2);
    }
}
