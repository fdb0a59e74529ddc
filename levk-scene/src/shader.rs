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

//! Raw SPIR-V pair for a material's vertex/fragment stages. Compilation to a
//! `VkPipeline` happens behind [`crate::device::Device`]; this module only
//! carries the bytes and the hash the pipeline cache keys on.

use fxhash::FxHasher64;
use levk_core::log::LevkLog;
use levk_core::Uri;
use levk_resource::vfs::DataSource;
use std::hash::Hasher;

#[derive(Clone)]
pub struct Shader {
    pub vertex_spirv: Vec<u8>,
    pub fragment_spirv: Vec<u8>,
}

impl Shader {
    pub fn new(vertex_spirv: Vec<u8>, fragment_spirv: Vec<u8>) -> Self {
        Self {
            vertex_spirv,
            fragment_spirv,
        }
    }

    /// A placeholder shader with empty stages, the fallback a shader provider
    /// hands back on a load miss (pipeline creation against it is expected to
    /// fail and log rather than panic).
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Derived from the SPIR-V byte contents of both stages. A pipeline cache
    /// key embeds this; reloading a shader with different bytes therefore
    /// invalidates every pipeline built against it transitively.
    pub fn hash(&self) -> u64 {
        let mut hasher = FxHasher64::default();
        hasher.write(&self.vertex_spirv);
        hasher.write(&self.fragment_spirv);
        hasher.finish()
    }
}

/// Loads a shader descriptor JSON (`{"vertex": "<uri>", "fragment": "<uri>"}`)
/// and the two SPIR-V blobs it names, for use as an [`levk_resource::AssetProvider::get`]
/// loader closure. The vertex and fragment uris are reported as dependencies so
/// edits to either blob invalidate the cached `Shader` built from them.
pub fn load(vfs: &dyn DataSource, uri: &Uri) -> Option<(Shader, Vec<Uri>)> {
    let descriptor_bytes = vfs.read(uri);
    if descriptor_bytes.is_empty() {
        return None;
    }
    let descriptor: serde_json::Value = match serde_json::from_slice(&descriptor_bytes) {
        Ok(value) => value,
        Err(err) => {
            LevkLog::warn(format!("shader {uri}: malformed descriptor JSON: {err}"));
            return None;
        }
    };
    let vertex_uri = Uri::new(descriptor.get("vertex")?.as_str()?);
    let fragment_uri = Uri::new(descriptor.get("fragment")?.as_str()?);

    let vertex_spirv = vfs.read(&vertex_uri);
    let fragment_spirv = vfs.read(&fragment_uri);
    if vertex_spirv.is_empty() || fragment_spirv.is_empty() {
        LevkLog::warn(format!("shader {uri}: missing spirv stage bytes"));
        return None;
    }

    Some((
        Shader::new(vertex_spirv, fragment_spirv),
        vec![vertex_uri, fragment_uri],
    ))
}

#[cfg(test)]
mod test {
    use super::*;
    use fxhash::FxHashMap;

    #[test]
    fn identical_bytes_hash_identically() {
        let a = Shader::new(vec![1, 2, 3], vec![4, 5, 6]);
        let b = Shader::new(vec![1, 2, 3], vec![4, 5, 6]);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn differing_fragment_stage_changes_hash() {
        let a = Shader::new(vec![1, 2, 3], vec![4, 5, 6]);
        let b = Shader::new(vec![1, 2, 3], vec![4, 5, 7]);
        assert_ne!(a.hash(), b.hash());
    }

    struct MapVfs(FxHashMap<String, Vec<u8>>);
    impl DataSource for MapVfs {
        fn read(&self, uri: &Uri) -> Vec<u8> {
            self.0.get(uri.as_str()).cloned().unwrap_or_default()
        }
    }

    #[test]
    fn load_reads_descriptor_and_both_stages() {
        let mut files = FxHashMap::default();
        files.insert(
            "unlit.shader.json".to_string(),
            br#"{"vertex":"unlit.vert.spv","fragment":"unlit.frag.spv"}"#.to_vec(),
        );
        files.insert("unlit.vert.spv".to_string(), vec![1, 2, 3]);
        files.insert("unlit.frag.spv".to_string(), vec![4, 5, 6]);
        let vfs = MapVfs(files);

        let (shader, deps) = load(&vfs, &Uri::new("unlit.shader.json")).unwrap();
        assert_eq!(shader.vertex_spirv, vec![1, 2, 3]);
        assert_eq!(shader.fragment_spirv, vec![4, 5, 6]);
        assert_eq!(deps.len(), 2);
    }

    #[test]
    fn load_missing_descriptor_returns_none() {
        let vfs = MapVfs(FxHashMap::default());
        assert!(load(&vfs, &Uri::new("missing.shader.json")).is_none());
    }
}
