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

//! Typed accessors over [`AssetProviders`] plus `build_asset_list`/
//! `build_asset_plan`, the transitive scene-JSON scan the level loader runs
//! before instantiating a scene so every referenced asset can be pre-loaded
//! off the main thread, and [`preload`], the `rayon`-backed worker pool that
//! actually does that pre-loading (spec.md §5).
//!
//! `levk-resource` cannot know these concrete payload types without creating a
//! dependency cycle back into this crate (see that crate's `providers`
//! module), so the typed `shaders()`/`textures()`/... accessors live here as
//! an extension trait over the generic [`AssetProviders::provider`].

use crate::material::{default_unlit, Material};
use crate::mesh::{SkinnedMesh, StaticMesh};
use crate::shader::Shader;
use crate::skeleton::{Skeleton, SkeletalAnimation};
use crate::texture::Texture;
use crate::{material, mesh, shader, skeleton, texture};
use fxhash::FxHashSet;
use levk_core::log::LevkLog;
use levk_core::Uri;
use levk_resource::registry::TypeRegistry;
use levk_resource::vfs::DataSource;
use levk_resource::{AssetProvider, AssetProviders};
use std::sync::Arc;

pub trait SceneAssetProviders {
    fn shaders(&self) -> Arc<AssetProvider<Shader>>;
    fn textures(&self) -> Arc<AssetProvider<Texture>>;
    fn materials(&self) -> Arc<AssetProvider<Arc<dyn Material>>>;
    fn static_meshes(&self) -> Arc<AssetProvider<StaticMesh>>;
    fn skinned_meshes(&self) -> Arc<AssetProvider<SkinnedMesh>>;
    fn skeletons(&self) -> Arc<AssetProvider<Skeleton>>;
    fn animations(&self) -> Arc<AssetProvider<SkeletalAnimation>>;
}

impl SceneAssetProviders for AssetProviders {
    fn shaders(&self) -> Arc<AssetProvider<Shader>> {
        self.provider(|| Arc::new(Shader::empty()))
    }

    fn textures(&self) -> Arc<AssetProvider<Texture>> {
        self.provider(|| Arc::new(Texture::white()))
    }

    fn materials(&self) -> Arc<AssetProvider<Arc<dyn Material>>> {
        self.provider(|| Arc::new(default_unlit()))
    }

    fn static_meshes(&self) -> Arc<AssetProvider<StaticMesh>> {
        self.provider(|| Arc::new(StaticMesh { primitives: Vec::new() }))
    }

    fn skinned_meshes(&self) -> Arc<AssetProvider<SkinnedMesh>> {
        self.provider(|| {
            Arc::new(SkinnedMesh {
                primitives: Vec::new(),
                inverse_bind_matrices: Vec::new(),
                skeleton: Uri::empty(),
            })
        })
    }

    fn skeletons(&self) -> Arc<AssetProvider<Skeleton>> {
        self.provider(|| Arc::new(Skeleton::empty()))
    }

    fn animations(&self) -> Arc<AssetProvider<SkeletalAnimation>> {
        self.provider(|| Arc::new(SkeletalAnimation::empty()))
    }
}

/// Maps a material's `type_name` to the shader URI its kind always uses,
/// mirroring `Material::shader_uri` for the shipped concrete kinds without
/// having to construct one. Open question (DESIGN.md): a material JSON never
/// stores its own shader URI, so scanning it for transitively-referenced
/// shaders has to go through this table instead of a JSON field.
fn implicit_shader_for_material_type(type_name: &str) -> Option<Uri> {
    match type_name {
        "UnlitMaterial" => Some(Uri::new("shaders/unlit.json")),
        "LitMaterial" => Some(Uri::new("shaders/lit.json")),
        _ => None,
    }
}

/// Reads `uri` from `vfs` and parses it as JSON, warning and returning `None`
/// on any failure rather than propagating an error.
fn read_json(vfs: &dyn DataSource, uri: &Uri) -> Option<serde_json::Value> {
    let bytes = vfs.read(uri);
    if bytes.is_empty() {
        return None;
    }
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(error) => {
            LevkLog::warn(format!("build_asset_list: '{uri}' failed to parse: {error}"));
            None
        }
    }
}

/// The per-kind breakdown of a scene's transitively-referenced assets, built
/// by [`build_asset_plan`] and consumed by [`preload`]. Kept as separate
/// buckets rather than one flat set so `preload` can hand each bucket to the
/// provider that actually knows how to load it.
#[derive(Debug, Clone, Default)]
pub struct AssetPlan {
    pub shaders: FxHashSet<Uri>,
    pub textures: FxHashSet<Uri>,
    pub materials: FxHashSet<Uri>,
    pub static_meshes: FxHashSet<Uri>,
    pub skinned_meshes: FxHashSet<Uri>,
    pub skeletons: FxHashSet<Uri>,
    pub animations: FxHashSet<Uri>,
}

impl AssetPlan {
    pub fn len(&self) -> usize {
        self.shaders.len()
            + self.textures.len()
            + self.materials.len()
            + self.static_meshes.len()
            + self.skinned_meshes.len()
            + self.skeletons.len()
            + self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flattens every bucket into one set, for callers that only need "is
    /// this URI referenced" and don't care which provider owns it.
    pub fn union(&self) -> FxHashSet<Uri> {
        self.shaders
            .iter()
            .chain(&self.textures)
            .chain(&self.materials)
            .chain(&self.static_meshes)
            .chain(&self.skinned_meshes)
            .chain(&self.skeletons)
            .chain(&self.animations)
            .cloned()
            .collect()
    }
}

/// Reads the scene JSON at `scene_uri` and transitively collects every
/// shader/texture/material/mesh/skeleton/animation URI it references, sorted
/// by which provider will eventually load it — used by the level loader to
/// pre-load assets before instantiating the scene.
pub fn build_asset_plan(vfs: &dyn DataSource, scene_uri: &Uri) -> AssetPlan {
    let mut plan = AssetPlan::default();
    let Some(scene) = read_json(vfs, scene_uri) else {
        return plan;
    };

    let entities = scene.get("entities").and_then(|v| v.as_array());
    for entity in entities.into_iter().flatten() {
        let Some(attachments) = entity.get("attachments").and_then(|v| v.as_array()) else {
            continue;
        };
        for attachment in attachments {
            if let Some(mesh_uri) = attachment.get("mesh").and_then(|v| v.as_str()) {
                collect_mesh(vfs, &Uri::new(mesh_uri), &mut plan);
            }
        }
    }
    plan
}

/// Flattened form of [`build_asset_plan`], for callers that just want "every
/// URI this scene touches" without the per-kind breakdown.
pub fn build_asset_list(vfs: &dyn DataSource, scene_uri: &Uri) -> FxHashSet<Uri> {
    build_asset_plan(vfs, scene_uri).union()
}

fn collect_mesh(vfs: &dyn DataSource, mesh_uri: &Uri, plan: &mut AssetPlan) {
    if plan.static_meshes.contains(mesh_uri) || plan.skinned_meshes.contains(mesh_uri) {
        return;
    }
    let skinned = {
        let Some(mesh) = read_json(vfs, mesh_uri) else {
            plan.static_meshes.insert(mesh_uri.clone());
            return;
        };
        let skinned = mesh.get("skeleton").and_then(|v| v.as_str()).is_some();
        if let Some(primitives) = mesh.get("primitives").and_then(|v| v.as_array()) {
            for primitive in primitives {
                if let Some(material_uri) = primitive.get("material").and_then(|v| v.as_str()) {
                    collect_material(vfs, &Uri::new(material_uri), plan);
                }
            }
        }
        if let Some(skeleton_uri) = mesh.get("skeleton").and_then(|v| v.as_str()) {
            collect_skeleton(vfs, &Uri::new(skeleton_uri), plan);
        }
        skinned
    };
    if skinned {
        plan.skinned_meshes.insert(mesh_uri.clone());
    } else {
        plan.static_meshes.insert(mesh_uri.clone());
    }
}

fn collect_material(vfs: &dyn DataSource, material_uri: &Uri, plan: &mut AssetPlan) {
    if !plan.materials.insert(material_uri.clone()) {
        return;
    }
    let Some(material) = read_json(vfs, material_uri) else {
        return;
    };
    if let Some(type_name) = material.get("type_name").and_then(|v| v.as_str()) {
        if let Some(shader) = implicit_shader_for_material_type(type_name) {
            plan.shaders.insert(shader);
        }
    }
    if let Some(uris) = material
        .get("textures")
        .and_then(|v| v.get("uris"))
        .and_then(|v| v.as_array())
    {
        for uri in uris {
            if let Some(uri) = uri.as_str() {
                if !uri.is_empty() {
                    plan.textures.insert(Uri::new(uri));
                }
            }
        }
    }
}

fn collect_skeleton(vfs: &dyn DataSource, skeleton_uri: &Uri, plan: &mut AssetPlan) {
    if !plan.skeletons.insert(skeleton_uri.clone()) {
        return;
    }
    let Some(skeleton) = read_json(vfs, skeleton_uri) else {
        return;
    };
    if let Some(animations) = skeleton.get("animations").and_then(|v| v.as_array()) {
        for uri in animations {
            if let Some(uri) = uri.as_str() {
                plan.animations.insert(Uri::new(uri));
            }
        }
    }
}

/// Populates every provider's cache for the URIs named in `plan`, spreading
/// the (I/O-bound) loads across `rayon`'s global thread pool instead of the
/// caller's thread (spec.md §5: a worker pool backs both asset pre-loaders
/// and I/O-bound asset reads). Call this before a level's scene and UI are
/// first ticked or rendered so the first in-loop [`AssetProvider::get`] for
/// each URI is already a cache hit.
///
/// `registry` must already carry every material `type_name` the plan's
/// scene can reference (see `crate::material::register_materials`); a
/// `type_name` it doesn't know falls back the same way a request-time load
/// would.
pub fn preload(
    vfs: &dyn DataSource,
    providers: &AssetProviders,
    registry: &TypeRegistry,
    plan: &AssetPlan,
) {
    rayon::scope(|scope| {
        let shaders = providers.shaders();
        scope.spawn(move |_| {
            for uri in &plan.shaders {
                shaders.get(uri, |u| shader::load(vfs, u));
            }
        });

        let textures = providers.textures();
        scope.spawn(move |_| {
            for uri in &plan.textures {
                textures.get(uri, |u| texture::load(vfs, u));
            }
        });

        let materials = providers.materials();
        scope.spawn(move |_| {
            for uri in &plan.materials {
                materials.get(uri, |u| material::load(registry, vfs, u));
            }
        });

        let static_meshes = providers.static_meshes();
        scope.spawn(move |_| {
            for uri in &plan.static_meshes {
                static_meshes.get(uri, |u| mesh::load_static(vfs, u));
            }
        });

        let skinned_meshes = providers.skinned_meshes();
        scope.spawn(move |_| {
            for uri in &plan.skinned_meshes {
                skinned_meshes.get(uri, |u| mesh::load_skinned(vfs, u));
            }
        });

        let skeletons = providers.skeletons();
        scope.spawn(move |_| {
            for uri in &plan.skeletons {
                skeletons.get(uri, |u| skeleton::load(vfs, u));
            }
        });

        let animations = providers.animations();
        scope.spawn(move |_| {
            for uri in &plan.animations {
                animations.get(uri, |u| skeleton::load_animation(vfs, u));
            }
        });
    });
}

#[cfg(test)]
mod test {
    use super::*;
    use fxhash::FxHashMap;
    use parking_lot::Mutex;

    struct StubVfs {
        files: Mutex<FxHashMap<String, Vec<u8>>>,
    }

    impl StubVfs {
        fn new(files: &[(&str, serde_json::Value)]) -> Self {
            let mut map = FxHashMap::default();
            for (uri, json) in files {
                map.insert(uri.to_string(), serde_json::to_vec(json).unwrap());
            }
            Self {
                files: Mutex::new(map),
            }
        }
    }

    impl DataSource for StubVfs {
        fn read(&self, uri: &Uri) -> Vec<u8> {
            self.files
                .lock()
                .get(uri.as_str())
                .cloned()
                .unwrap_or_default()
        }
    }

    #[test]
    fn build_asset_list_includes_material_shader_transitively() {
        let vfs = StubVfs::new(&[
            (
                "scene.json",
                serde_json::json!({
                    "entities": [
                        { "node_id": 1, "active": true, "attachments": [
                            { "type_name": "MeshAttachment", "mesh": "mesh.json" }
                        ]}
                    ]
                }),
            ),
            (
                "mesh.json",
                serde_json::json!({
                    "asset_type": "mesh",
                    "name": "cube",
                    "primitives": [{ "geometry": "cube.geom", "material": "mat.json" }],
                }),
            ),
            (
                "mat.json",
                serde_json::json!({
                    "type_name": "UnlitMaterial",
                    "textures": { "uris": ["tex.png", "", "", "", "", "", "", ""] },
                }),
            ),
        ]);

        let assets = build_asset_list(&vfs, &Uri::new("scene.json"));
        assert!(assets.contains(&Uri::new("mesh.json")));
        assert!(assets.contains(&Uri::new("mat.json")));
        assert!(assets.contains(&Uri::new("tex.png")));
        assert!(assets.contains(&Uri::new("shaders/unlit.json")));
    }
}
