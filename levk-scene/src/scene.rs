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

//! Ties the node hierarchy, the entity/component runtime, collision and the
//! camera together into one tickable, renderable unit.
//!
//! Scene JSON import/export scans entity and attachment objects directly by
//! key, the same way `crate::assets::build_asset_list` does, rather than
//! round-tripping through [`levk_resource::TypeRegistry`] — the handful of
//! shipped attachment kinds don't warrant a second polymorphic factory table.

use crate::collision::Collision;
use crate::draw_list::{DrawList, RenderList};
use crate::entity::{Component, Entity, EntityCreateInfo, TickContext};
use crate::mesh::{SkinnedMesh, StaticMesh};
use crate::node::{EntityId, Node, NodeCreateInfo, NodeId, NodeTree};
use crate::skeleton::{SkeletonController, SkeletonInstance};
use crate::transform::Transform;
use crate::SceneAssetProviders;
use fxhash::FxHashMap;
use levk_core::id::IdSource;
use levk_core::log::LevkLog;
use levk_core::math::{Matrix4, Vector3};
use levk_core::Uri;
use levk_resource::vfs::{DataSink, DataSource};
use levk_resource::AssetProviders;
use std::any::TypeId;
use std::sync::Arc;

/// A scene's camera: local transform plus projection parameters. `target`, if
/// set, is an entity whose global transform (position, orientation and
/// scale) the camera copies at the end of every tick.
#[derive(Debug, Clone)]
pub struct Camera {
    pub transform: Transform,
    pub fov_y_radians: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    pub orthographic: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            transform: Transform::default(),
            fov_y_radians: 45.0_f32.to_radians(),
            near_plane: 0.1,
            far_plane: 1000.0,
            orthographic: false,
        }
    }
}

impl Camera {
    pub fn view_matrix(&self) -> Matrix4<f32> {
        self.transform
            .matrix()
            .try_inverse()
            .unwrap_or_else(Matrix4::identity)
    }

    pub fn projection_matrix(&self, aspect_ratio: f32) -> Matrix4<f32> {
        if self.orthographic {
            let half_height = self.fov_y_radians.max(0.01);
            let half_width = half_height * aspect_ratio;
            Matrix4::new_orthographic(
                -half_width,
                half_width,
                -half_height,
                half_height,
                self.near_plane,
                self.far_plane,
            )
        } else {
            Matrix4::new_perspective(
                aspect_ratio.max(0.0001),
                self.fov_y_radians,
                self.near_plane,
                self.far_plane,
            )
        }
    }
}

/// Binds a [`Camera`] to an optional following target.
#[derive(Debug, Clone, Default)]
pub struct SceneCamera {
    pub camera: Camera,
    pub target: EntityId,
}

#[derive(Debug, Clone, Copy)]
pub struct DirLight {
    pub direction: Vector3<f32>,
    pub color: Vector3<f32>,
    pub intensity: f32,
}

impl Default for DirLight {
    fn default() -> Self {
        Self {
            direction: Vector3::new(0.0, -1.0, 0.0),
            color: Vector3::new(1.0, 1.0, 1.0),
            intensity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Lights {
    pub directional: Vec<DirLight>,
    pub ambient: Vector3<f32>,
}

/// Renders a [`StaticMesh`] bound by `mesh_uri`, instanced once at the node's
/// global transform.
pub struct MeshRenderer {
    pub mesh: Uri,
}

impl Component for MeshRenderer {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
    fn as_render_component(&self) -> Option<&dyn crate::entity::RenderComponent> {
        Some(self)
    }
}

impl crate::entity::RenderComponent for MeshRenderer {
    fn render(&self, ctx: &crate::entity::RenderContext, out: &mut DrawList) {
        let providers = ctx.scene.providers();
        let meshes = providers.static_meshes();
        let Some(mesh) = meshes.find(&self.mesh) else {
            return;
        };
        let parent_mat = ctx.scene.nodes().global_transform(ctx.node_id);
        add_static_mesh(out, &mesh, parent_mat, &[Matrix4::identity()], providers);
    }
}

fn add_static_mesh(
    out: &mut DrawList,
    mesh: &StaticMesh,
    parent_mat: Matrix4<f32>,
    instances: &[Matrix4<f32>],
    providers: &AssetProviders,
) {
    out.add_static_mesh(mesh, parent_mat, instances, providers);
}

/// Renders a [`SkinnedMesh`] bound by `mesh_uri`, posed by whatever wrote the
/// current global transforms of its joint nodes. Instantiates its own
/// [`SkeletonInstance`] once, in `setup`, so it owns the one true joint
/// locator for this entity — a sibling [`SkeletonController`] reaches into it
/// through `Scene::drive_skeleton_controllers` rather than each component
/// materializing (and diverging on) its own copy of the joint subtree.
pub struct SkinnedMeshRenderer {
    pub mesh: Uri,
    instance: Option<SkeletonInstance>,
}

impl SkinnedMeshRenderer {
    pub fn new(mesh: Uri) -> Self {
        Self {
            mesh,
            instance: None,
        }
    }

    pub fn instance(&self) -> Option<&SkeletonInstance> {
        self.instance.as_ref()
    }
}

impl Component for SkinnedMeshRenderer {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn setup(&mut self, ctx: &mut TickContext) {
        let providers = ctx.scene.providers();
        let Some(mesh) = providers.skinned_meshes().find(&self.mesh) else {
            return;
        };
        let Some(skeleton) = providers.skeletons().find(&mesh.skeleton) else {
            return;
        };
        self.instance = Some(skeleton.instantiate(ctx.scene.nodes_mut(), ctx.node_id));
    }

    fn as_render_component(&self) -> Option<&dyn crate::entity::RenderComponent> {
        Some(self)
    }
}

impl crate::entity::RenderComponent for SkinnedMeshRenderer {
    fn render(&self, ctx: &crate::entity::RenderContext, out: &mut DrawList) {
        let providers = ctx.scene.providers();
        let Some(mesh) = providers.skinned_meshes().find(&self.mesh) else {
            return;
        };
        let Some(instance) = &self.instance else {
            return;
        };
        let joints = instance.joint_matrices(ctx.scene.nodes(), &mesh.inverse_bind_matrices);
        out.add_skinned_mesh(&mesh, &joints, providers);
    }
}

/// The scene graph, entity/component runtime, collision state and camera,
/// bundled into one tickable/renderable unit.
pub struct Scene {
    pub name: String,
    nodes: NodeTree,
    entities: FxHashMap<EntityId, Entity>,
    entity_order: Vec<EntityId>,
    next_entity_id: IdSource<crate::node::EntityMarker>,
    pub camera: SceneCamera,
    pub lights: Lights,
    collision: Collision,
    providers: Arc<AssetProviders>,
}

struct NullVfs;
impl DataSource for NullVfs {
    fn read(&self, _uri: &Uri) -> Vec<u8> {
        Vec::new()
    }
}

impl Scene {
    /// Builds a scene with a no-op asset pipeline (no vfs, no providers wired
    /// to real storage) — fine for tests and for headless tooling that never
    /// touches textures/meshes; the runtime constructs scenes via
    /// [`Scene::with_providers`] instead.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_providers(
            name,
            Arc::new(AssetProviders::new(
                Arc::new(NullVfs),
                levk_resource::UriMonitor::new(),
            )),
        )
    }

    pub fn with_providers(name: impl Into<String>, providers: Arc<AssetProviders>) -> Self {
        Self {
            name: name.into(),
            nodes: NodeTree::new(),
            entities: FxHashMap::default(),
            entity_order: Vec::new(),
            next_entity_id: IdSource::new(),
            camera: SceneCamera::default(),
            lights: Lights::default(),
            collision: Collision::new(),
            providers,
        }
    }

    pub fn providers(&self) -> &AssetProviders {
        &self.providers
    }

    pub fn nodes(&self) -> &NodeTree {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut NodeTree {
        &mut self.nodes
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entity_order.iter().copied()
    }

    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn find_entity(&self, name: &str) -> Option<EntityId> {
        let node = self.nodes.find_by_name(name)?;
        if node.entity_id.is_some() {
            Some(node.entity_id)
        } else {
            None
        }
    }

    /// Creates a node plus a bound, empty entity, in that order: every
    /// entity owns exactly one node.
    pub fn spawn(&mut self, info: EntityCreateInfo) -> EntityId {
        let entity_id = self.next_entity_id.next();
        let node_id = self.nodes.add(NodeCreateInfo {
            name: info.name,
            parent: info.parent,
            transform: Transform::default(),
            entity_id,
        });
        self.entities
            .insert(entity_id, Entity::new(entity_id, node_id));
        self.entity_order.push(entity_id);
        entity_id
    }

    /// Destroys the entity and its node subtree. Nodes below it that carry no
    /// entity (e.g. skeleton joints) are destroyed along with it.
    pub fn destroy_entity(&mut self, id: EntityId) {
        if let Some(entity) = self.entities.remove(&id) {
            self.nodes.remove(entity.node_id);
        }
        self.entity_order.retain(|existing| *existing != id);
    }

    /// Attaches `component`, running its `setup` with an honest `&mut Scene`
    /// via the same removal trick [`Scene::with_entity_removed`] uses.
    pub fn attach<T: Component + 'static>(&mut self, entity_id: EntityId, component: T) {
        let type_id = TypeId::of::<T>();
        let Some(entity) = self.entities.get(&entity_id) else {
            LevkLog::warn(format!("scene: attach() given unknown entity {entity_id}"));
            return;
        };
        if entity.has_type(type_id) {
            entity.warn_duplicate(type_id);
            return;
        }
        self.with_entity_removed(entity_id, move |entity, scene| {
            entity.push_component(type_id, Box::new(component));
            let node_id = entity.node_id;
            if let Some(slot) = entity_last_component(entity) {
                let mut ctx = TickContext {
                    scene,
                    entity_id,
                    node_id,
                    dt: 0.0,
                };
                slot.setup(&mut ctx);
            }
        });
    }

    /// Temporarily removes `id`'s entity from the map, hands it (plus `self`,
    /// now missing that entry) to `f`, then reinserts it. This is how a
    /// component's `tick`/`setup` gets an honest `&mut Scene` without aliasing
    /// the very entity map it is being called from (see module docs on
    /// `crate::entity`).
    pub fn with_entity_removed(
        &mut self,
        id: EntityId,
        f: impl FnOnce(&mut Entity, &mut Scene),
    ) {
        let Some(mut entity) = self.entities.remove(&id) else {
            return;
        };
        f(&mut entity, self);
        self.entities.insert(id, entity);
    }

    /// Advances the scene by `dt` seconds: components tick in ascending
    /// entity-id order, then every [`SkeletonController`] writes its pose
    /// into its sibling renderer's joint nodes, then collision runs against
    /// the post-tick positions, then the camera follows its target, if any.
    pub fn tick(&mut self, dt: f32) {
        let ids: Vec<EntityId> = self.entity_order.clone();
        for id in ids.iter().copied() {
            self.with_entity_removed(id, |entity, scene| {
                if entity.active {
                    entity.tick_components(dt, scene);
                }
            });
        }

        self.drive_skeleton_controllers(&ids);

        let mut collision = std::mem::take(&mut self.collision);
        collision.tick(self, dt);
        self.collision = collision;

        if self.camera.target.is_some() {
            if let Some(entity) = self.entities.get(&self.camera.target) {
                let global = self.nodes.global_transform(entity.node_id);
                let (position, orientation, scale) = levk_core::math::decompose_trs(&global);
                self.camera
                    .camera
                    .transform
                    .set_position(position)
                    .set_orientation(orientation)
                    .set_scale(scale);
            }
        }
    }

    /// Writes every active [`SkeletonController`]'s current pose into its
    /// sibling [`SkinnedMeshRenderer`]'s joint nodes. Runs as a distinct pass
    /// over `ids` (rather than inline in the controller's own `tick`) because
    /// `tick_components` detaches the ticking entity from `self.entities` for
    /// the duration of its own tick, so a component cannot reach its own
    /// entity's other components from inside `Component::tick` — only from a
    /// separate scene-level step like this one, accessing the entity map and
    /// node tree as the two distinct fields they are.
    fn drive_skeleton_controllers(&mut self, ids: &[EntityId]) {
        let providers = self.providers.clone();
        for id in ids.iter().copied() {
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            if !entity.active {
                continue;
            }
            let Some((controller, renderer)) =
                entity.find_pair_mut::<SkeletonController, SkinnedMeshRenderer>()
            else {
                continue;
            };
            let Some(animation) = controller.selected_animation(&providers) else {
                continue;
            };
            let Some(instance) = renderer.instance() else {
                continue;
            };
            let elapsed = controller.elapsed;
            animation.update_nodes(&mut self.nodes, |index| instance.joint_node(index), elapsed);
        }
    }

    /// Renders every entity's render-capable components, in entity-id order,
    /// into `out.scene`. The UI overlay tree lives one layer up (in the `levk`
    /// facade crate) and writes into `out.ui` itself.
    pub fn render(&self, out: &mut RenderList) {
        for id in self.entity_order.iter().copied() {
            if let Some(entity) = self.entities.get(&id) {
                if entity.active {
                    entity.render(self, &mut out.scene);
                }
            }
        }
    }

    /// Test/tool helper: sets an entity's local position directly, bypassing
    /// a full transform component.
    pub fn set_local_position(&mut self, id: EntityId, position: Vector3<f32>) {
        if let Some(entity) = self.entities.get(&id) {
            if let Some(node) = self.nodes.get_mut(entity.node_id) {
                node.transform.set_position(position);
            }
        }
    }

    /// Reads a scene JSON document from `vfs` and populates `self` with it.
    /// Unknown attachment `type_name`s are skipped with a warning rather than
    /// aborting the whole load.
    pub fn import_json(&mut self, vfs: &dyn DataSource, uri: &Uri) -> bool {
        let bytes = vfs.read(uri);
        if bytes.is_empty() {
            return false;
        }
        let Ok(document) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
            LevkLog::warn(format!("scene '{uri}' failed to parse as JSON"));
            return false;
        };
        if let Some(name) = document.get("name").and_then(|v| v.as_str()) {
            self.name = name.to_string();
        }
        let Some(entities) = document.get("entities").and_then(|v| v.as_array()) else {
            return true;
        };

        let mut resolved: Vec<EntityId> = Vec::with_capacity(entities.len());
        for (index, entity_json) in entities.iter().enumerate() {
            let name = entity_json
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let parent_index = entity_json.get("parent").and_then(|v| v.as_u64());
            let parent_node = match parent_index {
                Some(parent_index) => resolved
                    .get(parent_index as usize)
                    .and_then(|id| self.get_entity(*id))
                    .map(|e| e.node_id)
                    .unwrap_or(NodeId::NONE),
                None => NodeId::NONE,
            };
            let active = entity_json
                .get("active")
                .and_then(|v| v.as_bool())
                .unwrap_or(true);

            let entity_id = self.spawn(EntityCreateInfo {
                name,
                parent: parent_node,
            });
            if let Some(entity) = self.get_entity_mut(entity_id) {
                entity.active = active;
            }
            if let Some(transform_json) = entity_json.get("transform") {
                apply_transform_json(&mut self.nodes, entity_id, &self.entities, transform_json);
            }

            if let Some(attachments) = entity_json.get("attachments").and_then(|v| v.as_array()) {
                for attachment in attachments {
                    self.apply_attachment(entity_id, attachment);
                }
            }
            resolved.push(entity_id);
            let _ = index;
        }
        true
    }

    fn apply_attachment(&mut self, entity_id: EntityId, attachment: &serde_json::Value) {
        let Some(type_name) = attachment.get("type_name").and_then(|v| v.as_str()) else {
            return;
        };
        match type_name {
            "MeshAttachment" => {
                let Some(mesh) = attachment.get("mesh").and_then(|v| v.as_str()) else {
                    LevkLog::warn("MeshAttachment missing 'mesh' field, skipping".to_string());
                    return;
                };
                self.attach(
                    entity_id,
                    MeshRenderer {
                        mesh: Uri::new(mesh),
                    },
                );
            }
            "SkinnedMeshAttachment" => {
                let Some(mesh) = attachment.get("mesh").and_then(|v| v.as_str()) else {
                    LevkLog::warn("SkinnedMeshAttachment missing 'mesh' field, skipping".to_string());
                    return;
                };
                self.attach(entity_id, SkinnedMeshRenderer::new(Uri::new(mesh)));
            }
            "SkeletonControllerAttachment" => {
                let Some(skeleton) = attachment.get("skeleton").and_then(|v| v.as_str()) else {
                    LevkLog::warn(
                        "SkeletonControllerAttachment missing 'skeleton' field, skipping".to_string(),
                    );
                    return;
                };
                let mut controller = SkeletonController::new(Uri::new(skeleton));
                controller.enabled = attachment
                    .get("enabled")
                    .and_then(|v| v.as_u64())
                    .map(|v| v as usize);
                controller.time_scale = attachment
                    .get("time_scale")
                    .and_then(|v| v.as_f64())
                    .map(|v| v as f32)
                    .unwrap_or(1.0);
                self.attach(entity_id, controller);
            }
            other => {
                LevkLog::warn(format!(
                    "scene import: unknown attachment type_name '{other}', skipping"
                ));
            }
        }
    }

    /// Writes the scene back to JSON in the same shape [`Scene::import_json`]
    /// reads.
    pub fn export_json(&self) -> serde_json::Value {
        let mut entities_json = Vec::new();
        for id in self.entity_order.iter().copied() {
            let Some(entity) = self.entities.get(&id) else {
                continue;
            };
            let Some(node) = self.nodes.get(entity.node_id) else {
                continue;
            };
            let mut attachments = Vec::new();
            if let Some(mesh_renderer) = entity.find::<MeshRenderer>() {
                attachments.push(serde_json::json!({
                    "type_name": "MeshAttachment",
                    "mesh": mesh_renderer.mesh.as_str(),
                }));
            }
            if let Some(skinned_renderer) = entity.find::<SkinnedMeshRenderer>() {
                attachments.push(serde_json::json!({
                    "type_name": "SkinnedMeshAttachment",
                    "mesh": skinned_renderer.mesh.as_str(),
                }));
            }
            if let Some(controller) = entity.find::<SkeletonController>() {
                attachments.push(serde_json::json!({
                    "type_name": "SkeletonControllerAttachment",
                    "skeleton": controller.skeleton.as_str(),
                    "enabled": controller.enabled,
                    "time_scale": controller.time_scale,
                }));
            }
            entities_json.push(serde_json::json!({
                "name": node.name,
                "active": entity.active,
                "transform": transform_json(node),
                "attachments": attachments,
            }));
        }
        serde_json::json!({
            "name": self.name,
            "entities": entities_json,
        })
    }

    pub fn export_to(&self, vfs: &dyn DataSink, uri: &Uri) -> bool {
        let json = self.export_json();
        let Ok(bytes) = serde_json::to_vec_pretty(&json) else {
            return false;
        };
        vfs.write(&bytes, uri)
    }
}

fn entity_last_component(entity: &mut Entity) -> Option<&mut dyn Component> {
    entity.last_component_mut()
}

fn transform_json(node: &Node) -> serde_json::Value {
    let position = node.transform.position();
    let orientation = node.transform.orientation();
    let scale = node.transform.scale();
    serde_json::json!({
        "position": [position.x, position.y, position.z],
        "orientation": [orientation.i, orientation.j, orientation.k, orientation.w],
        "scale": [scale.x, scale.y, scale.z],
    })
}

fn apply_transform_json(
    nodes: &mut NodeTree,
    entity_id: EntityId,
    entities: &FxHashMap<EntityId, Entity>,
    transform_json: &serde_json::Value,
) {
    let Some(entity) = entities.get(&entity_id) else {
        return;
    };
    let Some(node) = nodes.get_mut(entity.node_id) else {
        return;
    };
    if let Some(position) = transform_json.get("position").and_then(|v| v.as_array()) {
        if let Some(vector) = array_to_vec3(position) {
            node.transform.set_position(vector);
        }
    }
    if let Some(scale) = transform_json.get("scale").and_then(|v| v.as_array()) {
        if let Some(vector) = array_to_vec3(scale) {
            node.transform.set_scale(vector);
        }
    }
    if let Some(orientation) = transform_json.get("orientation").and_then(|v| v.as_array()) {
        if orientation.len() == 4 {
            let components: Option<Vec<f32>> =
                orientation.iter().map(|v| v.as_f64().map(|v| v as f32)).collect();
            if let Some(c) = components {
                let quat = nalgebra::Quaternion::new(c[3], c[0], c[1], c[2]);
                node.transform
                    .set_orientation(levk_core::math::UnitQuaternion::from_quaternion(quat));
            }
        }
    }
}

fn array_to_vec3(values: &[serde_json::Value]) -> Option<Vector3<f32>> {
    if values.len() != 3 {
        return None;
    }
    let x = values[0].as_f64()? as f32;
    let y = values[1].as_f64()? as f32;
    let z = values[2].as_f64()? as f32;
    Some(Vector3::new(x, y, z))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::any::Any;

    #[test]
    fn spawned_entity_binds_exactly_one_node() {
        let mut scene = Scene::new("test");
        let id = scene.spawn(EntityCreateInfo::default());
        let entity = scene.get_entity(id).unwrap();
        assert!(scene.nodes().get(entity.node_id).is_some());
    }

    struct Counter {
        ticks: Arc<std::sync::atomic::AtomicUsize>,
        order: Arc<parking_lot::Mutex<Vec<u32>>>,
        tag: u32,
    }

    impl Component for Counter {
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
        fn tick(&mut self, _ctx: &mut TickContext) {
            self.ticks.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.order.lock().push(self.tag);
        }
    }

    #[test]
    fn components_tick_in_ascending_entity_id_order_s2() {
        let mut scene = Scene::new("test");
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let ticks = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let a = scene.spawn(EntityCreateInfo::default());
        let b = scene.spawn(EntityCreateInfo::default());
        scene.attach(b, Counter { ticks: ticks.clone(), order: order.clone(), tag: 2 });
        scene.attach(a, Counter { ticks: ticks.clone(), order: order.clone(), tag: 1 });

        scene.tick(1.0 / 60.0);

        assert_eq!(ticks.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(*order.lock(), vec![1, 2]);
    }

    #[test]
    fn camera_follows_target_after_tick() {
        let mut scene = Scene::new("test");
        let target = scene.spawn(EntityCreateInfo::default());
        scene.set_local_position(target, Vector3::new(1.0, 2.0, 3.0));
        scene.camera.target = target;

        scene.tick(1.0 / 60.0);

        assert_eq!(scene.camera.camera.transform.position(), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn skeleton_controller_drives_skinned_mesh_renderer_pose() {
        use crate::draw_list::Drawable;
        use crate::mesh::{MeshEntry, SkinnedPrimitive};
        use crate::skeleton::{
            Channel, Interpolation, Interpolator, Joint, Skeleton, SkeletalAnimation,
            TransformChannel,
        };

        let providers = Arc::new(AssetProviders::new(
            Arc::new(NullVfs),
            levk_resource::UriMonitor::new(),
        ));
        let skeleton_uri = Uri::new("skeletons/arm.json");
        let animation_uri = Uri::new("animations/wave.json");
        let mesh_uri = Uri::new("meshes/arm.json");

        providers.skeletons().add(
            skeleton_uri.clone(),
            Skeleton {
                joints: vec![Joint {
                    self_index: 0,
                    parent_index: None,
                    children: vec![],
                    transform: Transform::default(),
                    name: "root".to_string(),
                }],
                animations: vec![animation_uri.clone()],
                self_uri: skeleton_uri.clone(),
            },
        );
        providers.animations().add(
            animation_uri.clone(),
            SkeletalAnimation {
                channels: vec![Channel {
                    sampler: TransformChannel::Translate(Interpolator {
                        keyframes: vec![
                            (0.0, Vector3::new(0.0, 0.0, 0.0)),
                            (2.0, Vector3::new(2.0, 0.0, 0.0)),
                        ],
                        interpolation: Interpolation::Linear,
                    }),
                    target_joint_index: 0,
                }],
                name: "wave".to_string(),
            },
        );
        providers.skinned_meshes().add(
            mesh_uri.clone(),
            SkinnedMesh {
                primitives: vec![MeshEntry {
                    primitive: Arc::new(SkinnedPrimitive::new(Default::default())),
                    material: Uri::new("materials/arm.json"),
                }],
                inverse_bind_matrices: vec![Matrix4::identity()],
                skeleton: skeleton_uri.clone(),
            },
        );

        let mut scene = Scene::with_providers("test", providers);
        let entity = scene.spawn(EntityCreateInfo::default());
        scene.attach(entity, SkinnedMeshRenderer::new(mesh_uri));
        let mut controller = SkeletonController::new(skeleton_uri);
        controller.enabled = Some(0);
        scene.attach(entity, controller);

        scene.tick(1.0);

        let mut render_list = RenderList::new((1, 1));
        scene.render(&mut render_list);

        let drawables = render_list.scene.drawables();
        assert_eq!(drawables.len(), 1);
        match &drawables[0] {
            Drawable::Skinned { joints, .. } => {
                assert!((joints[0][(0, 3)] - 1.0).abs() < 1e-4);
            }
            _ => panic!("expected a skinned drawable"),
        }
    }

    #[test]
    fn import_json_builds_entities_and_mesh_attachment() {
        let mut scene = Scene::new("test");
        struct StubVfs(Vec<u8>);
        impl DataSource for StubVfs {
            fn read(&self, _uri: &Uri) -> Vec<u8> {
                self.0.clone()
            }
        }
        let json = serde_json::json!({
            "name": "demo",
            "entities": [
                { "name": "cube", "attachments": [{ "type_name": "MeshAttachment", "mesh": "mesh.json" }] }
            ]
        });
        let vfs = StubVfs(serde_json::to_vec(&json).unwrap());
        assert!(scene.import_json(&vfs, &Uri::new("scene.json")));
        assert_eq!(scene.name, "demo");
        let id = scene.find_entity("cube").unwrap();
        assert!(scene.get_entity(id).unwrap().has::<MeshRenderer>());
    }

    #[test]
    fn unknown_attachment_type_is_skipped_without_failing_import() {
        let mut scene = Scene::new("test");
        struct StubVfs(Vec<u8>);
        impl DataSource for StubVfs {
            fn read(&self, _uri: &Uri) -> Vec<u8> {
                self.0.clone()
            }
        }
        let json = serde_json::json!({
            "entities": [
                { "name": "ghost", "attachments": [{ "type_name": "NotRegistered" }] }
            ]
        });
        let vfs = StubVfs(serde_json::to_vec(&json).unwrap());
        assert!(scene.import_json(&vfs, &Uri::new("scene.json")));
        assert!(scene.find_entity("ghost").is_some());
    }

    #[test]
    fn import_json_builds_skinned_mesh_and_skeleton_controller_attachments() {
        let mut scene = Scene::new("test");
        struct StubVfs(Vec<u8>);
        impl DataSource for StubVfs {
            fn read(&self, _uri: &Uri) -> Vec<u8> {
                self.0.clone()
            }
        }
        let json = serde_json::json!({
            "entities": [
                { "name": "puppet", "attachments": [
                    { "type_name": "SkinnedMeshAttachment", "mesh": "mesh.json" },
                    { "type_name": "SkeletonControllerAttachment", "skeleton": "skel.json", "enabled": 1, "time_scale": 2.0 },
                ]}
            ]
        });
        let vfs = StubVfs(serde_json::to_vec(&json).unwrap());
        assert!(scene.import_json(&vfs, &Uri::new("scene.json")));
        let id = scene.find_entity("puppet").unwrap();
        let entity = scene.get_entity(id).unwrap();
        assert!(entity.has::<SkinnedMeshRenderer>());
        let controller = entity.find::<SkeletonController>().unwrap();
        assert_eq!(controller.enabled, Some(1));
        assert_eq!(controller.time_scale, 2.0);

        let exported = scene.export_json();
        let attachments = exported["entities"][0]["attachments"].as_array().unwrap();
        assert!(attachments
            .iter()
            .any(|a| a["type_name"] == "SkinnedMeshAttachment" && a["mesh"] == "mesh.json"));
        assert!(attachments
            .iter()
            .any(|a| a["type_name"] == "SkeletonControllerAttachment" && a["skeleton"] == "skel.json"));
    }
}
