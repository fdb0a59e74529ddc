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

//! Device-resident vertex/index geometry and its binary on-disk format.
//! `Primitive` is the trait object every drawable references; the
//! concrete upload to GPU buffers happens behind the [`crate::device::Device`]
//! contract, so this module only carries the CPU-side description plus the
//! binary codec used for on-disk geometry blobs.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use fxhash::FxHasher64;
use levk_core::log::LevkLog;
use levk_core::math::{Matrix4, Vector2, Vector3, Vector4};
use levk_core::Uri;
use levk_resource::vfs::DataSource;
use serde_json::Value;
use std::hash::Hasher;
use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

/// Topology-agnostic geometry payload shared by static and skinned primitives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<Vector3<f32>>,
    pub rgbas: Vec<Vector4<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub uvs: Vec<Vector2<f32>>,
    pub indices: Vec<u32>,
    pub joints: Vec<[u32; 4]>,
    pub weights: Vec<Vector4<f32>>,
}

/// Header fields of the binary geometry format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryHeader {
    pub hash: u64,
    pub positions: u64,
    pub indices: u64,
    pub joints: u64,
    pub weights: u64,
}

impl Geometry {
    pub fn is_skinned(&self) -> bool {
        !self.joints.is_empty()
    }

    /// Hashes every payload array in declaration order, matching the hash the
    /// header must carry.
    pub fn payload_hash(&self) -> u64 {
        let mut hasher = FxHasher64::default();
        for p in &self.positions {
            hasher.write(bytemuck_like_bytes_vec3(p));
        }
        for c in &self.rgbas {
            hasher.write(bytemuck_like_bytes_vec4(c));
        }
        for n in &self.normals {
            hasher.write(bytemuck_like_bytes_vec3(n));
        }
        for uv in &self.uvs {
            hasher.write(bytemuck_like_bytes_vec2(uv));
        }
        for i in &self.indices {
            hasher.write(&i.to_le_bytes());
        }
        for j in &self.joints {
            for component in j {
                hasher.write(&component.to_le_bytes());
            }
        }
        for w in &self.weights {
            hasher.write(bytemuck_like_bytes_vec4(w));
        }
        hasher.finish()
    }

    /// Encodes header + payload. Joints/weights arrays are written only when
    /// the geometry is skinned.
    pub fn write_binary<W: Write>(&self, mut out: W) -> io::Result<()> {
        let header = GeometryHeader {
            hash: self.payload_hash(),
            positions: self.positions.len() as u64,
            indices: self.indices.len() as u64,
            joints: if self.is_skinned() {
                self.joints.len() as u64
            } else {
                0
            },
            weights: if self.is_skinned() {
                self.weights.len() as u64
            } else {
                0
            },
        };
        out.write_u64::<LittleEndian>(header.hash)?;
        out.write_u64::<LittleEndian>(header.positions)?;
        out.write_u64::<LittleEndian>(header.indices)?;
        out.write_u64::<LittleEndian>(header.joints)?;
        out.write_u64::<LittleEndian>(header.weights)?;

        for p in &self.positions {
            write_vec3(&mut out, p)?;
        }
        for c in &self.rgbas {
            write_vec4(&mut out, c)?;
        }
        for n in &self.normals {
            write_vec3(&mut out, n)?;
        }
        for uv in &self.uvs {
            write_vec2(&mut out, uv)?;
        }
        for i in &self.indices {
            out.write_u32::<LittleEndian>(*i)?;
        }
        if header.joints > 0 {
            for j in &self.joints {
                for component in j {
                    out.write_u32::<LittleEndian>(*component)?;
                }
            }
            for w in &self.weights {
                write_vec4(&mut out, w)?;
            }
        }
        Ok(())
    }

    /// Decodes a geometry blob written by [`Geometry::write_binary`]. Returns
    /// `None` on truncation or hash mismatch rather than panicking.
    pub fn read_binary(bytes: &[u8]) -> Option<Self> {
        let mut cursor = Cursor::new(bytes);
        let hash = cursor.read_u64::<LittleEndian>().ok()?;
        let positions_len = cursor.read_u64::<LittleEndian>().ok()? as usize;
        let indices_len = cursor.read_u64::<LittleEndian>().ok()? as usize;
        let joints_len = cursor.read_u64::<LittleEndian>().ok()? as usize;
        let weights_len = cursor.read_u64::<LittleEndian>().ok()? as usize;

        let positions = read_n_vec3(&mut cursor, positions_len)?;
        let rgbas = read_n_vec4(&mut cursor, positions_len)?;
        let normals = read_n_vec3(&mut cursor, positions_len)?;
        let uvs = read_n_vec2(&mut cursor, positions_len)?;
        let mut indices = Vec::with_capacity(indices_len);
        for _ in 0..indices_len {
            indices.push(cursor.read_u32::<LittleEndian>().ok()?);
        }
        let mut joints = Vec::with_capacity(joints_len);
        let mut weights = Vec::with_capacity(weights_len);
        if joints_len > 0 {
            for _ in 0..joints_len {
                let mut j = [0u32; 4];
                for slot in &mut j {
                    *slot = cursor.read_u32::<LittleEndian>().ok()?;
                }
                joints.push(j);
            }
            weights = read_n_vec4(&mut cursor, weights_len)?;
        }

        let geometry = Geometry {
            positions,
            rgbas,
            normals,
            uvs,
            indices,
            joints,
            weights,
        };
        if geometry.payload_hash() != hash {
            return None;
        }
        Some(geometry)
    }
}

fn write_vec2<W: Write>(out: &mut W, v: &Vector2<f32>) -> io::Result<()> {
    out.write_f32::<LittleEndian>(v.x)?;
    out.write_f32::<LittleEndian>(v.y)
}

fn write_vec3<W: Write>(out: &mut W, v: &Vector3<f32>) -> io::Result<()> {
    out.write_f32::<LittleEndian>(v.x)?;
    out.write_f32::<LittleEndian>(v.y)?;
    out.write_f32::<LittleEndian>(v.z)
}

fn write_vec4<W: Write>(out: &mut W, v: &Vector4<f32>) -> io::Result<()> {
    out.write_f32::<LittleEndian>(v.x)?;
    out.write_f32::<LittleEndian>(v.y)?;
    out.write_f32::<LittleEndian>(v.z)?;
    out.write_f32::<LittleEndian>(v.w)
}

fn read_n_vec2<R: Read>(input: &mut R, n: usize) -> Option<Vec<Vector2<f32>>> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let x = input.read_f32::<LittleEndian>().ok()?;
        let y = input.read_f32::<LittleEndian>().ok()?;
        out.push(Vector2::new(x, y));
    }
    Some(out)
}

fn read_n_vec3<R: Read>(input: &mut R, n: usize) -> Option<Vec<Vector3<f32>>> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let x = input.read_f32::<LittleEndian>().ok()?;
        let y = input.read_f32::<LittleEndian>().ok()?;
        let z = input.read_f32::<LittleEndian>().ok()?;
        out.push(Vector3::new(x, y, z));
    }
    Some(out)
}

fn read_n_vec4<R: Read>(input: &mut R, n: usize) -> Option<Vec<Vector4<f32>>> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let x = input.read_f32::<LittleEndian>().ok()?;
        let y = input.read_f32::<LittleEndian>().ok()?;
        let z = input.read_f32::<LittleEndian>().ok()?;
        let w = input.read_f32::<LittleEndian>().ok()?;
        out.push(Vector4::new(x, y, z, w));
    }
    Some(out)
}

fn bytemuck_like_bytes_vec2(v: &Vector2<f32>) -> &[u8] {
    bytemuck::bytes_of(v.as_ref())
}
fn bytemuck_like_bytes_vec3(v: &Vector3<f32>) -> &[u8] {
    bytemuck::bytes_of(v.as_ref())
}
fn bytemuck_like_bytes_vec4(v: &Vector4<f32>) -> &[u8] {
    bytemuck::bytes_of(v.as_ref())
}

/// A device-resident (or host-writable) vertex/index buffer with a topology.
/// The actual GPU handles live behind [`crate::device::Device`]; this trait
/// only exposes what the draw-list builder and device submission path need.
pub trait Primitive: Send + Sync {
    fn geometry(&self) -> &Geometry;
    /// `true` for a `Dynamic` primitive whose vertex buffer may be rewritten
    /// by the host between frames.
    fn is_dynamic(&self) -> bool {
        false
    }
}

/// A primitive with no skinning data.
pub struct StaticPrimitive {
    geometry: Geometry,
}

impl StaticPrimitive {
    pub fn new(geometry: Geometry) -> Self {
        Self { geometry }
    }

    pub fn empty() -> Self {
        Self {
            geometry: Geometry::default(),
        }
    }
}

impl Primitive for StaticPrimitive {
    fn geometry(&self) -> &Geometry {
        &self.geometry
    }
}

/// A primitive carrying per-vertex joint indices/weights.
pub struct SkinnedPrimitive {
    geometry: Geometry,
}

impl SkinnedPrimitive {
    pub fn new(geometry: Geometry) -> Self {
        Self { geometry }
    }
}

impl Primitive for SkinnedPrimitive {
    fn geometry(&self) -> &Geometry {
        &self.geometry
    }
}

/// A host-writable primitive, rebuilt on the CPU every time its geometry
/// changes (e.g. procedural UI quads).
pub struct DynamicPrimitive {
    geometry: Geometry,
}

impl DynamicPrimitive {
    pub fn new(geometry: Geometry) -> Self {
        Self { geometry }
    }

    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
    }
}

impl Primitive for DynamicPrimitive {
    fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn is_dynamic(&self) -> bool {
        true
    }
}

/// One primitive + the material that shades it, as stored inside a mesh.
pub struct MeshEntry<P: Primitive> {
    pub primitive: Arc<P>,
    pub material: Uri,
}

/// A list of primitives sharing no skeleton.
pub struct StaticMesh {
    pub primitives: Vec<MeshEntry<StaticPrimitive>>,
}

/// A list of primitives sharing a skeleton, plus the data needed to compute
/// joint matrices at render time.
pub struct SkinnedMesh {
    pub primitives: Vec<MeshEntry<SkinnedPrimitive>>,
    pub inverse_bind_matrices: Vec<levk_core::math::Matrix4<f32>>,
    pub skeleton: Uri,
}

fn read_json(vfs: &dyn DataSource, uri: &Uri) -> Option<Value> {
    let bytes = vfs.read(uri);
    if bytes.is_empty() {
        return None;
    }
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(error) => {
            LevkLog::warn(format!("mesh '{uri}' failed to parse: {error}"));
            None
        }
    }
}

fn read_geometry(vfs: &dyn DataSource, uri: &Uri) -> Option<Geometry> {
    let bytes = vfs.read(uri);
    if bytes.is_empty() {
        LevkLog::warn(format!("mesh: geometry blob '{uri}' is missing"));
        return None;
    }
    let geometry = Geometry::read_binary(&bytes);
    if geometry.is_none() {
        LevkLog::warn(format!("mesh: geometry blob '{uri}' failed its hash check"));
    }
    geometry
}

fn material_uri_of(entry: &Value) -> Uri {
    entry
        .get("material")
        .and_then(Value::as_str)
        .map(Uri::new)
        .unwrap_or_else(Uri::empty)
}

/// Reads a static-mesh descriptor (`{"primitives": [{"geometry": <uri>,
/// "material": <uri>}]}`) plus every primitive's binary geometry blob, for use
/// as an [`levk_resource::AssetProvider::get`] loader closure.
pub fn load_static(vfs: &dyn DataSource, uri: &Uri) -> Option<(StaticMesh, Vec<Uri>)> {
    let descriptor = read_json(vfs, uri)?;
    let mut dependencies = vec![uri.clone()];
    let mut primitives = Vec::new();
    for entry in descriptor.get("primitives")?.as_array()? {
        let geometry_uri = Uri::new(entry.get("geometry")?.as_str()?);
        let geometry = read_geometry(vfs, &geometry_uri)?;
        dependencies.push(geometry_uri);
        primitives.push(MeshEntry {
            primitive: Arc::new(StaticPrimitive::new(geometry)),
            material: material_uri_of(entry),
        });
    }
    Some((StaticMesh { primitives }, dependencies))
}

/// Reads a skinned-mesh descriptor (as [`load_static`], plus `"skeleton"` and
/// `"inverse_bind_matrices"`, a row-major 4x4-per-joint flat array matching
/// joint declaration order in the referenced skeleton).
pub fn load_skinned(vfs: &dyn DataSource, uri: &Uri) -> Option<(SkinnedMesh, Vec<Uri>)> {
    let descriptor = read_json(vfs, uri)?;
    let mut dependencies = vec![uri.clone()];
    let mut primitives = Vec::new();
    for entry in descriptor.get("primitives")?.as_array()? {
        let geometry_uri = Uri::new(entry.get("geometry")?.as_str()?);
        let geometry = read_geometry(vfs, &geometry_uri)?;
        dependencies.push(geometry_uri);
        primitives.push(MeshEntry {
            primitive: Arc::new(SkinnedPrimitive::new(geometry)),
            material: material_uri_of(entry),
        });
    }

    let skeleton = Uri::new(descriptor.get("skeleton")?.as_str()?);
    dependencies.push(skeleton.clone());

    let mut inverse_bind_matrices = Vec::new();
    for row in descriptor.get("inverse_bind_matrices")?.as_array()? {
        let flat = row.as_array()?;
        if flat.len() != 16 {
            LevkLog::warn(format!(
                "mesh '{uri}': inverse bind matrix did not have 16 components"
            ));
            return None;
        }
        let mut values = [0.0f32; 16];
        for (slot, v) in values.iter_mut().zip(flat) {
            *slot = v.as_f64()? as f32;
        }
        inverse_bind_matrices.push(Matrix4::from_row_slice(&values));
    }

    Some((
        SkinnedMesh {
            primitives,
            inverse_bind_matrices,
            skeleton,
        },
        dependencies,
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_geometry() -> Geometry {
        Geometry {
            positions: vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0)],
            rgbas: vec![Vector4::new(1.0, 1.0, 1.0, 1.0); 2],
            normals: vec![Vector3::new(0.0, 1.0, 0.0); 2],
            uvs: vec![Vector2::new(0.0, 0.0); 2],
            indices: vec![0, 1, 0],
            joints: vec![],
            weights: vec![],
        }
    }

    #[test]
    fn binary_round_trip_preserves_header_and_payload_s6() {
        let geometry = sample_geometry();
        let mut bytes = Vec::new();
        geometry.write_binary(&mut bytes).unwrap();
        let decoded = Geometry::read_binary(&bytes).unwrap();
        assert_eq!(decoded.positions.len(), 2);
        assert_eq!(decoded.indices.len(), 3);
        assert_eq!(decoded.joints.len(), 0);
        assert_eq!(decoded, geometry);
    }

    #[test]
    fn corrupted_payload_fails_hash_check() {
        let geometry = sample_geometry();
        let mut bytes = Vec::new();
        geometry.write_binary(&mut bytes).unwrap();
        *bytes.last_mut().unwrap() ^= 0xFF;
        assert!(Geometry::read_binary(&bytes).is_none());
    }

    #[test]
    fn skinned_geometry_round_trips_joints_and_weights() {
        let mut geometry = sample_geometry();
        geometry.joints = vec![[0, 0, 0, 0]; 2];
        geometry.weights = vec![Vector4::new(1.0, 0.0, 0.0, 0.0); 2];
        let mut bytes = Vec::new();
        geometry.write_binary(&mut bytes).unwrap();
        let decoded = Geometry::read_binary(&bytes).unwrap();
        assert_eq!(decoded.joints.len(), 2);
        assert_eq!(decoded.weights.len(), 2);
    }

    struct MapVfs(fxhash::FxHashMap<String, Vec<u8>>);
    impl DataSource for MapVfs {
        fn read(&self, uri: &Uri) -> Vec<u8> {
            self.0.get(uri.as_str()).cloned().unwrap_or_default()
        }
    }

    #[test]
    fn load_static_reads_descriptor_and_geometry_blobs() {
        let geometry = sample_geometry();
        let mut geometry_bytes = Vec::new();
        geometry.write_binary(&mut geometry_bytes).unwrap();

        let mut files = fxhash::FxHashMap::default();
        files.insert(
            "cube.mesh.json".to_string(),
            serde_json::to_vec(&serde_json::json!({
                "primitives": [{ "geometry": "cube.geom", "material": "mat.json" }]
            }))
            .unwrap(),
        );
        files.insert("cube.geom".to_string(), geometry_bytes);
        let vfs = MapVfs(files);

        let (mesh, deps) = load_static(&vfs, &Uri::new("cube.mesh.json")).unwrap();
        assert_eq!(mesh.primitives.len(), 1);
        assert_eq!(mesh.primitives[0].material, Uri::new("mat.json"));
        assert_eq!(mesh.primitives[0].primitive.geometry(), &geometry);
        assert!(deps.contains(&Uri::new("cube.geom")));
    }

    #[test]
    fn load_skinned_reads_skeleton_and_inverse_binds() {
        let mut geometry = sample_geometry();
        geometry.joints = vec![[0, 0, 0, 0]; 2];
        geometry.weights = vec![Vector4::new(1.0, 0.0, 0.0, 0.0); 2];
        let mut geometry_bytes = Vec::new();
        geometry.write_binary(&mut geometry_bytes).unwrap();

        let identity: Vec<f64> = Matrix4::<f32>::identity()
            .iter()
            .map(|v| *v as f64)
            .collect();

        let mut files = fxhash::FxHashMap::default();
        files.insert(
            "rig.mesh.json".to_string(),
            serde_json::to_vec(&serde_json::json!({
                "primitives": [{ "geometry": "rig.geom", "material": "mat.json" }],
                "skeleton": "rig.skeleton.json",
                "inverse_bind_matrices": [identity],
            }))
            .unwrap(),
        );
        files.insert("rig.geom".to_string(), geometry_bytes);
        let vfs = MapVfs(files);

        let (mesh, deps) = load_skinned(&vfs, &Uri::new("rig.mesh.json")).unwrap();
        assert_eq!(mesh.skeleton, Uri::new("rig.skeleton.json"));
        assert_eq!(mesh.inverse_bind_matrices.len(), 1);
        assert!(deps.contains(&Uri::new("rig.skeleton.json")));
    }

    #[test]
    fn load_static_of_missing_descriptor_is_none() {
        let vfs = MapVfs(fxhash::FxHashMap::default());
        assert!(load_static(&vfs, &Uri::new("missing.mesh.json")).is_none());
    }
}
