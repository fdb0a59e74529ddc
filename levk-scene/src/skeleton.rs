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

//! Joint trees, keyframe interpolation and sampler evaluation.
//!
//! A [`Skeleton`] asset is a flat, index-addressed joint hierarchy plus the
//! uris of the [`SkeletalAnimation`] assets that animate it. Instantiating a
//! skeleton under a live [`NodeTree`] root (`Skeleton::instantiate`) mirrors
//! the recursive, memoized joint walk the original engine uses rather than
//! assuming joints are declared in parent-before-child order.

use crate::assets::SceneAssetProviders;
use crate::entity::{Component, TickContext};
use crate::node::{NodeCreateInfo, NodeId, NodeTree};
use crate::transform::Transform;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use fxhash::{FxHashMap, FxHasher64};
use levk_core::log::LevkLog;
use levk_core::math::{UnitQuaternion, Vector3};
use levk_core::Uri;
use levk_resource::vfs::DataSource;
use levk_resource::AssetProviders;
use std::hash::Hasher;
use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

/// A single joint in a [`Skeleton`]'s flat, index-addressed hierarchy.
#[derive(Debug, Clone)]
pub struct Joint {
    pub self_index: usize,
    pub parent_index: Option<usize>,
    pub children: Vec<usize>,
    pub transform: Transform,
    pub name: String,
}

/// A skeleton asset: joints plus the uris of the animations that target them.
#[derive(Debug, Clone)]
pub struct Skeleton {
    pub joints: Vec<Joint>,
    pub animations: Vec<Uri>,
    pub self_uri: Uri,
}

impl Default for Skeleton {
    fn default() -> Self {
        Self {
            joints: Vec::new(),
            animations: Vec::new(),
            self_uri: Uri::empty(),
        }
    }
}

impl Skeleton {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Materializes this skeleton into `tree` under `root`, one node per
    /// joint. Recursive and memoized so joint declaration order need not put
    /// a parent before its children; `ordered_joints[i]` is the node created
    /// for `joints[i]`, matching the source joint order 1-1.
    pub fn instantiate(&self, tree: &mut NodeTree, root: NodeId) -> SkeletonInstance {
        let mut mapped: FxHashMap<usize, NodeId> = FxHashMap::default();
        for index in 0..self.joints.len() {
            self.add_joint(tree, &mut mapped, index, root);
        }
        let ordered_joints: Vec<NodeId> = self
            .joints
            .iter()
            .map(|joint| {
                mapped
                    .get(&joint.self_index)
                    .copied()
                    .unwrap_or(NodeId::NONE)
            })
            .collect();
        SkeletonInstance {
            root,
            ordered_joints,
            source_uri: self.self_uri.clone(),
        }
    }

    fn add_joint(
        &self,
        tree: &mut NodeTree,
        mapped: &mut FxHashMap<usize, NodeId>,
        index: usize,
        default_parent: NodeId,
    ) -> NodeId {
        if let Some(existing) = mapped.get(&index) {
            return *existing;
        }
        let Some(joint) = self.joints.get(index) else {
            return NodeId::NONE;
        };
        let parent = match joint.parent_index {
            Some(parent_index) => self.add_joint(tree, mapped, parent_index, default_parent),
            None => default_parent,
        };
        let id = tree.add(NodeCreateInfo {
            name: joint.name.clone(),
            parent,
            transform: joint.transform.clone(),
            ..Default::default()
        });
        mapped.insert(index, id);
        id
    }
}

/// Reads a skeleton descriptor JSON: `{"joints": [{"parent": <index or
/// null>, "name": <str>, "position": [x,y,z], "orientation": [x,y,z,w],
/// "scale": [x,y,z]}], "animations": [<uri>, ...]}`. `children` lists are
/// derived from the declared `parent` indices rather than read back from the
/// file, so a malformed file cannot desync them from the parent links.
pub fn load(vfs: &dyn DataSource, uri: &Uri) -> Option<(Skeleton, Vec<Uri>)> {
    let bytes = vfs.read(uri);
    if bytes.is_empty() {
        return None;
    }
    let descriptor: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => {
            LevkLog::warn(format!("skeleton '{uri}' failed to parse: {err}"));
            return None;
        }
    };

    let mut joints = Vec::new();
    for (index, entry) in descriptor.get("joints")?.as_array()?.iter().enumerate() {
        let parent_index = match entry.get("parent") {
            Some(serde_json::Value::Number(n)) => Some(n.as_u64()? as usize),
            _ => None,
        };
        let name = entry
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let position = array_to_vec3(entry.get("position")?.as_array()?)?;
        let scale = array_to_vec3(entry.get("scale")?.as_array()?)?;
        let orientation = array_to_quat(entry.get("orientation")?.as_array()?)?;

        let mut transform = Transform::default();
        transform.set_position(position);
        transform.set_orientation(orientation);
        transform.set_scale(scale);

        joints.push(Joint {
            self_index: index,
            parent_index,
            children: Vec::new(),
            transform,
            name,
        });
    }
    for index in 0..joints.len() {
        if let Some(parent_index) = joints[index].parent_index {
            if parent_index < joints.len() {
                joints[parent_index].children.push(index);
            }
        }
    }

    let mut dependencies = vec![uri.clone()];
    let mut animations = Vec::new();
    if let Some(list) = descriptor.get("animations").and_then(|v| v.as_array()) {
        for entry in list {
            if let Some(animation_uri) = entry.as_str() {
                let animation_uri = Uri::new(animation_uri);
                dependencies.push(animation_uri.clone());
                animations.push(animation_uri);
            }
        }
    }

    Some((
        Skeleton {
            joints,
            animations,
            self_uri: uri.clone(),
        },
        dependencies,
    ))
}

fn array_to_vec3(values: &[serde_json::Value]) -> Option<Vector3<f32>> {
    if values.len() != 3 {
        return None;
    }
    Some(Vector3::new(
        values[0].as_f64()? as f32,
        values[1].as_f64()? as f32,
        values[2].as_f64()? as f32,
    ))
}

fn array_to_quat(values: &[serde_json::Value]) -> Option<UnitQuaternion<f32>> {
    if values.len() != 4 {
        return None;
    }
    let (x, y, z, w) = (
        values[0].as_f64()? as f32,
        values[1].as_f64()? as f32,
        values[2].as_f64()? as f32,
        values[3].as_f64()? as f32,
    );
    Some(UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(
        w, x, y, z,
    )))
}

/// Reads a binary animation blob at `uri`, for use as an
/// [`levk_resource::AssetProvider::get`] loader closure.
pub fn load_animation(vfs: &dyn DataSource, uri: &Uri) -> Option<(SkeletalAnimation, Vec<Uri>)> {
    let bytes = vfs.read(uri);
    if bytes.is_empty() {
        return None;
    }
    SkeletalAnimation::read_binary(&bytes).map(|animation| (animation, vec![uri.clone()]))
}

/// Materialization of a [`Skeleton`] into a concrete [`NodeTree`] subtree.
#[derive(Debug, Clone)]
pub struct SkeletonInstance {
    pub root: NodeId,
    /// `ordered_joints[i]` is the live node for `Skeleton::joints[i]`.
    pub ordered_joints: Vec<NodeId>,
    pub source_uri: Uri,
}

impl SkeletonInstance {
    /// Resolves a sampler's target joint index to the node it animates, or
    /// `None` if the index is out of range — animation binding to a missing
    /// joint skips that channel rather than failing.
    pub fn joint_node(&self, target_joint_index: usize) -> Option<NodeId> {
        self.ordered_joints.get(target_joint_index).copied()
    }

    /// `joint_matrices[i] = global(ordered_joints[i]) * inverse_bind_matrices[i]`,
    /// the per-draw uniform a [`crate::entity::RenderComponent`] skinned mesh
    /// renderer uploads.
    pub fn joint_matrices(
        &self,
        tree: &NodeTree,
        inverse_bind_matrices: &[levk_core::math::Matrix4<f32>],
    ) -> Vec<levk_core::math::Matrix4<f32>> {
        self.ordered_joints
            .iter()
            .zip(inverse_bind_matrices)
            .map(|(node, inverse_bind)| tree.global_transform(*node) * inverse_bind)
            .collect()
    }
}

/// Linear or step interpolation mode for an [`Interpolator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
}

/// Value types an [`Interpolator`] can carry: vectors lerp component-wise,
/// quaternions slerp.
pub trait Interpolate: Copy {
    fn interpolate(a: Self, b: Self, t: f32) -> Self;
}

impl Interpolate for Vector3<f32> {
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        levk_core::math::lerp_vec3(a, b, t)
    }
}

impl Interpolate for UnitQuaternion<f32> {
    fn interpolate(a: Self, b: Self, t: f32) -> Self {
        levk_core::math::slerp_quat(a, b, t)
    }
}

/// A keyframed sequence `[(time, value)]`, evaluated
#[derive(Debug, Clone, Default)]
pub struct Interpolator<V> {
    pub keyframes: Vec<(f32, V)>,
    pub interpolation: Interpolation,
}

impl Default for Interpolation {
    fn default() -> Self {
        Interpolation::Linear
    }
}

impl<V: Interpolate> Interpolator<V> {
    pub fn duration(&self) -> f32 {
        self.keyframes.last().map(|(t, _)| *t).unwrap_or(0.0)
    }

    /// Evaluates at `t`: empty yields `None`; `t` at or past
    /// the last keyframe clamps to the last value; `t` before the first
    /// keyframe clamps to the first; otherwise interpolates between the
    /// bracketing pair according to [`Interpolation`].
    pub fn eval(&self, t: f32) -> Option<V> {
        if self.keyframes.is_empty() {
            return None;
        }
        let last = self.keyframes.len() - 1;
        if t >= self.keyframes[last].0 {
            return Some(self.keyframes[last].1);
        }
        let next_index = self.keyframes.iter().position(|(time, _)| *time >= t)?;
        if next_index == 0 {
            return Some(self.keyframes[0].1);
        }
        let (prev_time, prev_value) = self.keyframes[next_index - 1];
        let (next_time, next_value) = self.keyframes[next_index];
        match self.interpolation {
            Interpolation::Step => Some(prev_value),
            Interpolation::Linear => {
                let span = next_time - prev_time;
                let ratio = if span > 0.0 { (t - prev_time) / span } else { 0.0 };
                Some(V::interpolate(prev_value, next_value, ratio))
            }
        }
    }
}

/// A tagged Translate/Rotate/Scale sampler, one per channel of a
/// [`SkeletalAnimation`].
#[derive(Debug, Clone)]
pub enum TransformChannel {
    Translate(Interpolator<Vector3<f32>>),
    Rotate(Interpolator<UnitQuaternion<f32>>),
    Scale(Interpolator<Vector3<f32>>),
}

impl TransformChannel {
    pub fn duration(&self) -> f32 {
        match self {
            TransformChannel::Translate(i) => i.duration(),
            TransformChannel::Rotate(i) => i.duration(),
            TransformChannel::Scale(i) => i.duration(),
        }
    }

    /// Evaluates at `t` and writes the result into `transform`'s matching
    /// field, if the sampler produced a value.
    fn apply(&self, transform: &mut Transform, t: f32) {
        match self {
            TransformChannel::Translate(i) => {
                if let Some(value) = i.eval(t) {
                    transform.set_position(value);
                }
            }
            TransformChannel::Rotate(i) => {
                if let Some(value) = i.eval(t) {
                    transform.set_orientation(value);
                }
            }
            TransformChannel::Scale(i) => {
                if let Some(value) = i.eval(t) {
                    transform.set_scale(value);
                }
            }
        }
    }

    fn kind_tag(&self) -> u8 {
        match self {
            TransformChannel::Translate(_) => 0,
            TransformChannel::Rotate(_) => 1,
            TransformChannel::Scale(_) => 2,
        }
    }
}

/// One channel of a [`SkeletalAnimation`]: a sampler plus the joint index (in
/// the owning skeleton's flat joint list) it targets.
#[derive(Debug, Clone)]
pub struct Channel {
    pub sampler: TransformChannel,
    pub target_joint_index: usize,
}

/// An animation clip asset, bound to a skeleton's joint indices rather than
/// to any concrete [`SkeletonInstance`] — so the same asset can drive any
/// instance of the skeleton it was authored against.
#[derive(Debug, Clone, Default)]
pub struct SkeletalAnimation {
    pub channels: Vec<Channel>,
    pub name: String,
}

impl SkeletalAnimation {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Max channel endpoint.
    pub fn duration(&self) -> f32 {
        self.channels
            .iter()
            .map(|c| c.sampler.duration())
            .fold(0.0, f32::max)
    }

    /// Writes each channel's evaluated value, at `t`, into the node resolved
    /// by `locate(target_joint_index)`. A channel whose joint index does not
    /// resolve is skipped with a warning.
    pub fn update_nodes(
        &self,
        tree: &mut NodeTree,
        locate: impl Fn(usize) -> Option<NodeId>,
        t: f32,
    ) {
        for channel in &self.channels {
            let Some(node_id) = locate(channel.target_joint_index) else {
                LevkLog::warn(format!(
                    "skeletal animation '{}': channel targets unresolved joint index {}, skipping",
                    self.name, channel.target_joint_index
                ));
                continue;
            };
            if let Some(node) = tree.get_mut(node_id) {
                channel.sampler.apply(&mut node.transform, t);
            }
        }
    }

    /// Encodes the binary animation format: header, keyframe payloads, then
    /// the target joint indices and the clip name.
    pub fn write_binary<W: Write>(&self, mut out: W) -> io::Result<()> {
        let name_bytes = self.name.as_bytes();
        let header_hash = self.payload_hash();
        out.write_u64::<LittleEndian>(header_hash)?;
        out.write_u64::<LittleEndian>(self.channels.len() as u64)?;
        out.write_u64::<LittleEndian>(self.channels.len() as u64)?;
        out.write_u64::<LittleEndian>(name_bytes.len() as u64)?;

        for channel in &self.channels {
            let (interpolation, keyframe_count): (u8, u64) = match &channel.sampler {
                TransformChannel::Translate(i) => {
                    (interpolation_tag(i.interpolation), i.keyframes.len() as u64)
                }
                TransformChannel::Rotate(i) => {
                    (interpolation_tag(i.interpolation), i.keyframes.len() as u64)
                }
                TransformChannel::Scale(i) => {
                    (interpolation_tag(i.interpolation), i.keyframes.len() as u64)
                }
            };
            out.write_u8(channel.sampler.kind_tag())?;
            out.write_u8(interpolation)?;
            out.write_u64::<LittleEndian>(keyframe_count)?;
            match &channel.sampler {
                TransformChannel::Translate(i) => write_vec3_keyframes(&mut out, i)?,
                TransformChannel::Scale(i) => write_vec3_keyframes(&mut out, i)?,
                TransformChannel::Rotate(i) => write_quat_keyframes(&mut out, i)?,
            }
        }
        for channel in &self.channels {
            out.write_u64::<LittleEndian>(channel.target_joint_index as u64)?;
        }
        out.write_all(name_bytes)?;
        Ok(())
    }

    /// Decodes a blob written by [`SkeletalAnimation::write_binary`]. Returns
    /// `None` on truncation or hash mismatch.
    pub fn read_binary(bytes: &[u8]) -> Option<Self> {
        let mut cursor = Cursor::new(bytes);
        let hash = cursor.read_u64::<LittleEndian>().ok()?;
        let samplers = cursor.read_u64::<LittleEndian>().ok()? as usize;
        let _target_joints = cursor.read_u64::<LittleEndian>().ok()? as usize;
        let name_length = cursor.read_u64::<LittleEndian>().ok()? as usize;

        let mut sampler_specs = Vec::with_capacity(samplers);
        for _ in 0..samplers {
            let type_tag = cursor.read_u8().ok()?;
            let interpolation_tag = cursor.read_u8().ok()?;
            let keyframe_count = cursor.read_u64::<LittleEndian>().ok()? as usize;
            let interpolation = if interpolation_tag == 1 {
                Interpolation::Step
            } else {
                Interpolation::Linear
            };
            let sampler = match type_tag {
                0 => TransformChannel::Translate(Interpolator {
                    keyframes: read_vec3_keyframes(&mut cursor, keyframe_count)?,
                    interpolation,
                }),
                2 => TransformChannel::Scale(Interpolator {
                    keyframes: read_vec3_keyframes(&mut cursor, keyframe_count)?,
                    interpolation,
                }),
                1 => TransformChannel::Rotate(Interpolator {
                    keyframes: read_quat_keyframes(&mut cursor, keyframe_count)?,
                    interpolation,
                }),
                _ => return None,
            };
            sampler_specs.push(sampler);
        }
        let mut target_indices = Vec::with_capacity(samplers);
        for _ in 0..samplers {
            target_indices.push(cursor.read_u64::<LittleEndian>().ok()? as usize);
        }
        let mut name_bytes = vec![0u8; name_length];
        cursor.read_exact(&mut name_bytes).ok()?;
        let name = String::from_utf8(name_bytes).ok()?;

        let channels = sampler_specs
            .into_iter()
            .zip(target_indices)
            .map(|(sampler, target_joint_index)| Channel {
                sampler,
                target_joint_index,
            })
            .collect();
        let animation = SkeletalAnimation { channels, name };
        if animation.payload_hash() != hash {
            return None;
        }
        Some(animation)
    }

    fn payload_hash(&self) -> u64 {
        let mut hasher = FxHasher64::default();
        for channel in &self.channels {
            hasher.write_u8(channel.sampler.kind_tag());
            hasher.write_u64(channel.target_joint_index as u64);
            match &channel.sampler {
                TransformChannel::Translate(i) => hash_vec3_keyframes(&mut hasher, i),
                TransformChannel::Scale(i) => hash_vec3_keyframes(&mut hasher, i),
                TransformChannel::Rotate(i) => hash_quat_keyframes(&mut hasher, i),
            }
        }
        hasher.write(self.name.as_bytes());
        hasher.finish()
    }
}

fn interpolation_tag(interpolation: Interpolation) -> u8 {
    match interpolation {
        Interpolation::Linear => 0,
        Interpolation::Step => 1,
    }
}

fn write_vec3_keyframes<W: Write>(out: &mut W, i: &Interpolator<Vector3<f32>>) -> io::Result<()> {
    for (time, value) in &i.keyframes {
        out.write_f32::<LittleEndian>(*time)?;
        out.write_f32::<LittleEndian>(value.x)?;
        out.write_f32::<LittleEndian>(value.y)?;
        out.write_f32::<LittleEndian>(value.z)?;
    }
    Ok(())
}

fn write_quat_keyframes<W: Write>(
    out: &mut W,
    i: &Interpolator<UnitQuaternion<f32>>,
) -> io::Result<()> {
    for (time, value) in &i.keyframes {
        out.write_f32::<LittleEndian>(*time)?;
        out.write_f32::<LittleEndian>(value.i())?;
        out.write_f32::<LittleEndian>(value.j())?;
        out.write_f32::<LittleEndian>(value.k())?;
        out.write_f32::<LittleEndian>(value.w())?;
    }
    Ok(())
}

fn read_vec3_keyframes<R: Read>(
    input: &mut R,
    count: usize,
) -> Option<Vec<(f32, Vector3<f32>)>> {
    let mut keyframes = Vec::with_capacity(count);
    for _ in 0..count {
        let time = input.read_f32::<LittleEndian>().ok()?;
        let x = input.read_f32::<LittleEndian>().ok()?;
        let y = input.read_f32::<LittleEndian>().ok()?;
        let z = input.read_f32::<LittleEndian>().ok()?;
        keyframes.push((time, Vector3::new(x, y, z)));
    }
    Some(keyframes)
}

fn read_quat_keyframes<R: Read>(
    input: &mut R,
    count: usize,
) -> Option<Vec<(f32, UnitQuaternion<f32>)>> {
    let mut keyframes = Vec::with_capacity(count);
    for _ in 0..count {
        let time = input.read_f32::<LittleEndian>().ok()?;
        let i = input.read_f32::<LittleEndian>().ok()?;
        let j = input.read_f32::<LittleEndian>().ok()?;
        let k = input.read_f32::<LittleEndian>().ok()?;
        let w = input.read_f32::<LittleEndian>().ok()?;
        keyframes.push((
            time,
            UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(w, i, j, k)),
        ));
    }
    Some(keyframes)
}

fn hash_vec3_keyframes(hasher: &mut FxHasher64, i: &Interpolator<Vector3<f32>>) {
    for (time, value) in &i.keyframes {
        hasher.write(&time.to_le_bytes());
        hasher.write(&value.x.to_le_bytes());
        hasher.write(&value.y.to_le_bytes());
        hasher.write(&value.z.to_le_bytes());
    }
}

fn hash_quat_keyframes(hasher: &mut FxHasher64, i: &Interpolator<UnitQuaternion<f32>>) {
    for (time, value) in &i.keyframes {
        hasher.write(&time.to_le_bytes());
        hasher.write(&value.i().to_le_bytes());
        hasher.write(&value.j().to_le_bytes());
        hasher.write(&value.k().to_le_bytes());
        hasher.write(&value.w().to_le_bytes());
    }
}

/// Selects and plays back one of `skeleton`'s animations (by index into
/// [`Skeleton::animations`]), advancing `elapsed`/`time_scale` playback state
/// every tick. Attached alongside a [`crate::scene::SkinnedMeshRenderer`] on
/// the same entity, whose [`SkeletonInstance`] it drives via
/// `Scene::drive_skeleton_controllers` — the controller only owns the clock,
/// the renderer owns the joint locator (see module docs).
#[derive(Debug, Clone)]
pub struct SkeletonController {
    pub skeleton: Uri,
    pub enabled: Option<usize>,
    pub time_scale: f32,
    pub elapsed: f32,
}

impl Default for SkeletonController {
    fn default() -> Self {
        Self::new(Uri::empty())
    }
}

impl SkeletonController {
    pub fn new(skeleton: Uri) -> Self {
        Self {
            skeleton,
            enabled: None,
            time_scale: 1.0,
            elapsed: 0.0,
        }
    }

    /// Advances `elapsed` by `dt * time_scale` and wraps it past `duration`
    /// via modulo rather than resetting to zero, so a `dt` comparable to the
    /// clip's own duration still lands mid-clip.
    /// No-ops if no animation is enabled or the clip has zero duration.
    pub fn advance(&mut self, dt: f32, duration: f32) {
        if self.enabled.is_none() || duration <= 0.0 {
            return;
        }
        self.elapsed += dt * self.time_scale;
        if self.elapsed >= duration {
            self.elapsed %= duration;
        }
    }

    /// Resolves `enabled` to a concrete animation asset through `providers`,
    /// `None` if no animation is selected or either lookup misses.
    pub fn selected_animation(&self, providers: &AssetProviders) -> Option<Arc<SkeletalAnimation>> {
        let index = self.enabled?;
        let skeleton = providers.skeletons().find(&self.skeleton)?;
        let animation_uri = skeleton.animations.get(index)?;
        providers.animations().find(animation_uri)
    }
}

impl Component for SkeletonController {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    /// Advances playback time only; writing the evaluated pose into the
    /// sibling renderer's joint nodes happens once per frame in
    /// `Scene::drive_skeleton_controllers`, after every entity has ticked.
    fn tick(&mut self, ctx: &mut TickContext) {
        let providers = ctx.scene.providers();
        let Some(animation) = self.selected_animation(providers) else {
            return;
        };
        self.advance(ctx.dt, animation.duration());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn interpolator_clamps_before_first_and_after_last_key() {
        let interpolator = Interpolator {
            keyframes: vec![(1.0, 10.0_f32), (2.0, 20.0)],
            interpolation: Interpolation::Linear,
        };
        assert_eq!(interpolator.eval(0.0), Some(10.0));
        assert_eq!(interpolator.eval(5.0), Some(20.0));
    }

    #[test]
    fn interpolator_linear_midpoint_matches_invariant_3() {
        let interpolator = Interpolator {
            keyframes: vec![(0.0, 0.0_f32), (2.0, 10.0)],
            interpolation: Interpolation::Linear,
        };
        assert_eq!(interpolator.eval(1.0), Some(5.0));
    }

    #[test]
    fn interpolator_step_holds_previous_value() {
        let interpolator = Interpolator {
            keyframes: vec![(0.0, 1.0_f32), (2.0, 2.0)],
            interpolation: Interpolation::Step,
        };
        assert_eq!(interpolator.eval(1.0), Some(1.0));
    }

    #[test]
    fn empty_interpolator_has_no_value() {
        let interpolator: Interpolator<f32> = Interpolator::default();
        assert_eq!(interpolator.eval(1.0), None);
    }

    #[test]
    fn skeleton_instantiate_preserves_joint_order_invariant_5() {
        let skeleton = Skeleton {
            joints: vec![
                Joint {
                    self_index: 0,
                    parent_index: None,
                    children: vec![1],
                    transform: Transform::default(),
                    name: "root".to_string(),
                },
                Joint {
                    self_index: 1,
                    parent_index: Some(0),
                    children: vec![],
                    transform: Transform::default(),
                    name: "child".to_string(),
                },
            ],
            animations: vec![],
            self_uri: Uri::new("skeletons/a.json"),
        };
        let mut tree = NodeTree::new();
        let root = tree.add(NodeCreateInfo::default());
        let instance = skeleton.instantiate(&mut tree, root);
        assert_eq!(instance.ordered_joints.len(), skeleton.joints.len());
        assert_eq!(tree.get(instance.ordered_joints[1]).unwrap().parent(), instance.ordered_joints[0]);
    }

    #[test]
    fn skeleton_instantiate_handles_children_declared_before_parent() {
        let skeleton = Skeleton {
            joints: vec![
                Joint {
                    self_index: 0,
                    parent_index: Some(1),
                    children: vec![],
                    transform: Transform::default(),
                    name: "child".to_string(),
                },
                Joint {
                    self_index: 1,
                    parent_index: None,
                    children: vec![0],
                    transform: Transform::default(),
                    name: "root".to_string(),
                },
            ],
            animations: vec![],
            self_uri: Uri::empty(),
        };
        let mut tree = NodeTree::new();
        let root = tree.add(NodeCreateInfo::default());
        let instance = skeleton.instantiate(&mut tree, root);
        assert_eq!(tree.get(instance.ordered_joints[0]).unwrap().parent(), instance.ordered_joints[1]);
    }

    #[test]
    fn animation_wraps_elapsed_past_duration_s3() {
        let mut controller = SkeletonController {
            skeleton: Uri::empty(),
            enabled: Some(0),
            time_scale: 1.0,
            elapsed: 0.0,
        };
        controller.advance(1.5, 2.0);
        assert!((controller.elapsed - 1.5).abs() < 1e-6);
        controller.advance(1.5, 2.0);
        assert!((controller.elapsed - 1.0).abs() < 1e-6);
        controller.advance(1.5, 2.0);
        assert!((controller.elapsed - 0.5).abs() < 1e-6);
    }

    #[test]
    fn skeletal_animation_binary_round_trips() {
        let animation = SkeletalAnimation {
            channels: vec![Channel {
                sampler: TransformChannel::Translate(Interpolator {
                    keyframes: vec![(0.0, Vector3::new(0.0, 0.0, 0.0)), (2.0, Vector3::new(1.0, 0.0, 0.0))],
                    interpolation: Interpolation::Linear,
                }),
                target_joint_index: 0,
            }],
            name: "walk".to_string(),
        };
        let mut bytes = Vec::new();
        animation.write_binary(&mut bytes).unwrap();
        let decoded = SkeletalAnimation::read_binary(&bytes).unwrap();
        assert_eq!(decoded.name, "walk");
        assert_eq!(decoded.channels.len(), 1);
        assert_eq!(decoded.duration(), 2.0);
    }

    #[test]
    fn missing_joint_index_skips_channel_without_panicking() {
        let animation = SkeletalAnimation {
            channels: vec![Channel {
                sampler: TransformChannel::Translate(Interpolator {
                    keyframes: vec![(0.0, Vector3::new(1.0, 0.0, 0.0))],
                    interpolation: Interpolation::Linear,
                }),
                target_joint_index: 99,
            }],
            name: String::new(),
        };
        let mut tree = NodeTree::new();
        animation.update_nodes(&mut tree, |_| None, 0.0);
    }
}
