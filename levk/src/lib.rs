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

//! Single-crate facade over the levk engine, mirroring how Fyrox's `fyrox`
//! crate re-exports `fyrox-impl`: a downstream game depends on `levk` alone
//! and reaches every subsystem through its re-exports, while the engine itself
//! stays split into `levk-core`/`levk-resource`/`levk-scene`/`levk-ui` for
//! separate publishing and compile-time isolation.
//!
//! This crate additionally owns what none of those satellite crates can: the
//! runtime loop (window poll -> tick -> render -> present) and the scene
//! manager that switches between named, independently loaded levels, since
//! both need to see the 3D scene and the 2D UI tree at once and those two live
//! in separate crates to avoid a dependency cycle.

pub mod runtime;
pub mod scene_manager;
pub mod window;

pub use levk_core as core;
pub use levk_resource as resource;
pub use levk_scene as scene;
pub use levk_ui as ui;

pub use runtime::Runtime;
pub use scene_manager::{Level, SceneManager};
pub use window::Window;
