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

//! Per-frame drawable accumulation. A [`DrawList`] is an append-only vector
//! built fresh every frame by the scene renderer; a [`RenderList`] pairs the
//! 3D scene list with the UI overlay list.

use crate::assets::SceneAssetProviders;
use crate::material::DEFAULT_MATERIAL_URI;
use crate::mesh::{Primitive, SkinnedMesh, SkinnedPrimitive, StaticMesh, StaticPrimitive};
use levk_core::math::Matrix4;
use levk_core::Uri;
use levk_resource::AssetProviders;
use std::sync::Arc;

/// One render submission unit: a primitive, the material that shades it, and
/// its instancing data.
pub enum Drawable {
    Static {
        primitive: Arc<StaticPrimitive>,
        material: Uri,
        parent_mat: Matrix4<f32>,
        instances: Vec<Matrix4<f32>>,
    },
    Dynamic {
        primitive: Arc<dyn Primitive>,
        material: Uri,
        parent_mat: Matrix4<f32>,
        instances: Vec<Matrix4<f32>>,
    },
    Skinned {
        primitive: Arc<SkinnedPrimitive>,
        material: Uri,
        inverse_bind_matrices: Vec<Matrix4<f32>>,
        joints: Vec<Matrix4<f32>>,
    },
}

/// An append-only sequence of [`Drawable`]s targeting an extent (colour
/// attachment width/height in pixels).
#[derive(Default)]
pub struct DrawList {
    drawables: Vec<Drawable>,
    extent: (u32, u32),
}

impl DrawList {
    pub fn new(extent: (u32, u32)) -> Self {
        Self {
            drawables: Vec::new(),
            extent,
        }
    }

    pub fn extent(&self) -> (u32, u32) {
        self.extent
    }

    pub fn set_extent(&mut self, extent: (u32, u32)) {
        self.extent = extent;
    }

    pub fn push(&mut self, drawable: Drawable) {
        self.drawables.push(drawable);
    }

    pub fn drawables(&self) -> &[Drawable] {
        &self.drawables
    }

    pub fn clear(&mut self) {
        self.drawables.clear();
    }

    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }

    /// Expands a [`StaticMesh`] into one `Drawable::Static` per primitive,
    /// looking up each primitive's material through `providers`. A lookup
    /// failure falls back to the process-wide default material rather than
    /// dropping the primitive.
    pub fn add_static_mesh(
        &mut self,
        mesh: &StaticMesh,
        parent_mat: Matrix4<f32>,
        instances: &[Matrix4<f32>],
        providers: &AssetProviders,
    ) {
        for entry in &mesh.primitives {
            let material = if providers.materials().find(&entry.material).is_some() {
                entry.material.clone()
            } else {
                Uri::new(DEFAULT_MATERIAL_URI)
            };
            self.push(Drawable::Static {
                primitive: entry.primitive.clone(),
                material,
                parent_mat,
                instances: instances.to_vec(),
            });
        }
    }

    /// Expands a [`SkinnedMesh`] into one `Drawable::Skinned` per primitive,
    /// carrying `joints` (already evaluated against the current pose) and the
    /// mesh's own inverse bind matrices. Same default-material fallback as
    /// [`DrawList::add_static_mesh`].
    pub fn add_skinned_mesh(
        &mut self,
        mesh: &SkinnedMesh,
        joints: &[Matrix4<f32>],
        providers: &AssetProviders,
    ) {
        for entry in &mesh.primitives {
            let material = if providers.materials().find(&entry.material).is_some() {
                entry.material.clone()
            } else {
                Uri::new(DEFAULT_MATERIAL_URI)
            };
            self.push(Drawable::Skinned {
                primitive: entry.primitive.clone(),
                material,
                inverse_bind_matrices: mesh.inverse_bind_matrices.clone(),
                joints: joints.to_vec(),
            });
        }
    }
}

/// Pairs the 3D scene draw list with the UI overlay draw list.
pub struct RenderList {
    pub scene: DrawList,
    pub ui: DrawList,
}

impl RenderList {
    pub fn new(extent: (u32, u32)) -> Self {
        Self {
            scene: DrawList::new(extent),
            ui: DrawList::new(extent),
        }
    }

    /// Concatenates `ui`'s drawables onto `scene`'s, returning the combined
    /// list and leaving `self` emptied of drawables.
    pub fn merge(mut self) -> DrawList {
        let mut merged = DrawList::new(self.scene.extent());
        merged.drawables.append(&mut self.scene.drawables);
        merged.drawables.append(&mut self.ui.drawables);
        merged
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn new_draw_list_is_empty() {
        let list = DrawList::new((640, 480));
        assert!(list.is_empty());
        assert_eq!(list.extent(), (640, 480));
    }

    #[test]
    fn clear_empties_an_accumulated_list() {
        let mut list = DrawList::new((1, 1));
        list.push(Drawable::Static {
            primitive: Arc::new(StaticPrimitive::empty()),
            material: Uri::new("mat.json"),
            parent_mat: Matrix4::identity(),
            instances: vec![Matrix4::identity()],
        });
        assert_eq!(list.len(), 1);
        list.clear();
        assert!(list.is_empty());
    }

    #[test]
    fn add_skinned_mesh_falls_back_to_default_material_on_miss() {
        use crate::mesh::{MeshEntry, SkinnedPrimitive};
        use levk_resource::{AssetProviders, UriMonitor};
        struct NullVfs;
        impl levk_resource::vfs::DataSource for NullVfs {
            fn read(&self, _uri: &Uri) -> Vec<u8> {
                Vec::new()
            }
        }
        let providers = AssetProviders::new(Arc::new(NullVfs), UriMonitor::new());
        let mesh = SkinnedMesh {
            primitives: vec![MeshEntry {
                primitive: Arc::new(SkinnedPrimitive::new(Default::default())),
                material: Uri::new("missing.json"),
            }],
            inverse_bind_matrices: vec![Matrix4::identity()],
            skeleton: Uri::new("skel.json"),
        };
        let mut list = DrawList::new((1, 1));
        list.add_skinned_mesh(&mesh, &[Matrix4::identity()], &providers);
        assert_eq!(list.len(), 1);
        match &list.drawables()[0] {
            Drawable::Skinned { material, joints, .. } => {
                assert_eq!(material.as_str(), DEFAULT_MATERIAL_URI);
                assert_eq!(joints.len(), 1);
            }
            _ => panic!("expected a skinned drawable"),
        }
    }

    #[test]
    fn merge_concatenates_scene_and_ui_drawables() {
        let mut render_list = RenderList::new((100, 100));
        render_list.scene.push(Drawable::Static {
            primitive: Arc::new(StaticPrimitive::empty()),
            material: Uri::new("a.json"),
            parent_mat: Matrix4::identity(),
            instances: vec![],
        });
        render_list.ui.push(Drawable::Static {
            primitive: Arc::new(StaticPrimitive::empty()),
            material: Uri::new("b.json"),
            parent_mat: Matrix4::identity(),
            instances: vec![],
        });
        let merged = render_list.merge();
        assert_eq!(merged.len(), 2);
    }
}
