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

//! The 3D scene: node hierarchy, entity/component runtime, meshes, materials,
//! skeletal animation, collision and the per-frame draw list. Everything here
//! is device-agnostic CPU state; uploading geometry and dispatching draw
//! calls happens behind the render device, which lives outside this crate.

pub mod assets;
pub mod collision;
pub mod device;
pub mod draw_list;
pub mod entity;
pub mod material;
pub mod mesh;
pub mod node;
pub mod scene;
pub mod scene_renderer;
pub mod shader;
pub mod skeleton;
pub mod texture;
pub mod transform;

pub use assets::{build_asset_list, build_asset_plan, preload, AssetPlan, SceneAssetProviders};
pub use collision::Collision;
pub use device::{CameraView, Device, DeviceCreateInfo, DeviceInfo, Frame, SurfaceSource};
pub use draw_list::{Drawable, DrawList, RenderList};
pub use entity::{Component, ColliderComponent, Entity, EntityCreateInfo, RenderComponent};
pub use material::{register_materials, Material, DEFAULT_MATERIAL_URI};
pub use mesh::{DynamicPrimitive, Geometry, Primitive, SkinnedMesh, StaticMesh, StaticPrimitive};
pub use node::{EntityId, Node, NodeId, NodeTree};
pub use scene::Scene;
pub use scene_renderer::SceneRenderer;
pub use shader::Shader;
pub use skeleton::{Skeleton, SkeletalAnimation, SkeletonController, SkeletonInstance};
pub use texture::Texture;
pub use transform::Transform;
