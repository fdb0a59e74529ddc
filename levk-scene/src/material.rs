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

//! Materials are the one place the engine keeps runtime extensibility:
//! instead of an exhaustive enum, `Material` stays a trait object
//! registered in the [`levk_resource::TypeRegistry`] under a `type_name`
//! discriminator, with `Unlit`/`Lit` as the two shipped concrete kinds.

use crate::texture::Texture;
use levk_core::log::LevkLog;
use levk_core::Uri;
use levk_resource::registry::{Registerable, TypeRegistry, TypeTags};
use levk_resource::vfs::DataSource;
use levk_resource::AssetProvider;
use serde_json::{json, Value};
use std::any::Any;
use std::str::FromStr;
use std::sync::Arc;
use strum_macros::{AsRefStr, EnumString};

/// `"type": "fill"|"line"|"point"` in material JSON (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum FillMode {
    Fill,
    Line,
    Point,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderMode {
    pub fill_mode: FillMode,
    pub line_width: f32,
    pub depth_test: bool,
}

impl Default for RenderMode {
    fn default() -> Self {
        Self {
            fill_mode: FillMode::Fill,
            line_width: 1.0,
            depth_test: true,
        }
    }
}

impl RenderMode {
    fn to_json(self) -> Value {
        json!({
            "type": self.fill_mode.as_ref(),
            "line_width": self.line_width,
            "depth_test": self.depth_test,
        })
    }

    fn from_json(value: &Value) -> Option<Self> {
        let mut mode = RenderMode::default();
        if let Some(kind) = value.get("type").and_then(Value::as_str) {
            match FillMode::from_str(kind) {
                Ok(fill_mode) => mode.fill_mode = fill_mode,
                Err(_) => LevkLog::warn(format!("render_mode: unknown fill type '{kind}'")),
            }
        }
        if let Some(width) = value.get("line_width").and_then(Value::as_f64) {
            mode.line_width = width as f32;
        }
        if let Some(depth_test) = value.get("depth_test").and_then(Value::as_bool) {
            mode.depth_test = depth_test;
        }
        Some(mode)
    }
}

/// Binds texture samplers and writes uniform/storage bytes at known `(set,
/// binding)` slots. Implemented by the concrete device; materials only call
/// through this trait so they stay independent of the render backend.
pub trait ShaderWriter {
    fn write_texture(&mut self, set: u32, binding: u32, texture: &Texture);
    fn write_bytes(&mut self, set: u32, binding: u32, bytes: &[u8]);
}

/// Shader pipeline selection + uniform/sampler data for a draw.
pub trait Material: Registerable {
    fn shader_uri(&self) -> Uri;
    fn render_mode(&self) -> RenderMode;
    fn write_sets(&self, writer: &mut dyn ShaderWriter, textures: &AssetProvider<Texture>);
    fn clone_box(&self) -> Box<dyn Material>;
}

/// Flat-tinted, single-texture material.
#[derive(Debug, Clone)]
pub struct UnlitMaterial {
    pub shader: Uri,
    pub tint: [f32; 4],
    pub texture: Uri,
    pub render_mode: RenderMode,
}

impl Default for UnlitMaterial {
    fn default() -> Self {
        Self {
            shader: Uri::new("shaders/unlit.json"),
            tint: [1.0, 1.0, 1.0, 1.0],
            texture: Uri::empty(),
            render_mode: RenderMode::default(),
        }
    }
}

impl Registerable for UnlitMaterial {
    fn type_name(&self) -> &'static str {
        "UnlitMaterial"
    }

    fn serialize_fields(&self) -> Value {
        json!({
            "tint": self.tint,
            "textures": { "uris": [self.texture.as_str()] },
            "render_mode": self.render_mode.to_json(),
        })
    }

    fn deserialize_fields(&mut self, value: &Value) -> bool {
        let Some(tint) = value.get("tint").and_then(Value::as_array) else {
            return false;
        };
        if tint.len() != 4 {
            return false;
        }
        for (slot, component) in self.tint.iter_mut().zip(tint) {
            match component.as_f64() {
                Some(v) => *slot = v as f32,
                None => return false,
            }
        }
        if let Some(texture) = value
            .get("textures")
            .and_then(|t| t.get("uris"))
            .and_then(Value::as_array)
            .and_then(|uris| uris.first())
            .and_then(Value::as_str)
        {
            self.texture = Uri::new(texture);
        } else if let Some(texture) = value.get("texture").and_then(Value::as_str) {
            self.texture = Uri::new(texture);
        }
        if let Some(render_mode) = value.get("render_mode").and_then(RenderMode::from_json) {
            self.render_mode = render_mode;
        }
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl Material for UnlitMaterial {
    fn shader_uri(&self) -> Uri {
        self.shader.clone()
    }

    fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    fn write_sets(&self, writer: &mut dyn ShaderWriter, textures: &AssetProvider<Texture>) {
        let texture = textures
            .find(&self.texture)
            .unwrap_or_else(|| textures.fallback());
        writer.write_texture(0, 0, &texture);
        writer.write_bytes(0, 1, bytemuck::bytes_of(&self.tint));
    }

    fn clone_box(&self) -> Box<dyn Material> {
        Box::new(self.clone())
    }
}

/// Alpha-mode controlling whether `alpha_cutoff` is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum AlphaMode {
    Opaque,
    Mask,
    Blend,
}

/// Physically-based material with albedo/metallic-roughness/emissive inputs.
#[derive(Debug, Clone)]
pub struct LitMaterial {
    pub shader: Uri,
    pub albedo: Uri,
    pub metallic_roughness: Uri,
    pub emissive: Uri,
    pub metallic: f32,
    pub roughness: f32,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub render_mode: RenderMode,
}

impl Default for LitMaterial {
    fn default() -> Self {
        Self {
            shader: Uri::new("shaders/lit.json"),
            albedo: Uri::empty(),
            metallic_roughness: Uri::empty(),
            emissive: Uri::empty(),
            metallic: 1.0,
            roughness: 1.0,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            render_mode: RenderMode::default(),
        }
    }
}

impl Registerable for LitMaterial {
    fn type_name(&self) -> &'static str {
        "LitMaterial"
    }

    fn serialize_fields(&self) -> Value {
        json!({
            "textures": { "uris": [self.albedo.as_str(), self.metallic_roughness.as_str(), self.emissive.as_str()] },
            "metallic": self.metallic,
            "roughness": self.roughness,
            "alpha_mode": self.alpha_mode.as_ref(),
            "alpha_cutoff": self.alpha_cutoff,
            "render_mode": self.render_mode.to_json(),
        })
    }

    fn deserialize_fields(&mut self, value: &Value) -> bool {
        let Some(metallic) = value.get("metallic").and_then(Value::as_f64) else {
            return false;
        };
        let Some(roughness) = value.get("roughness").and_then(Value::as_f64) else {
            return false;
        };
        self.metallic = metallic as f32;
        self.roughness = roughness as f32;
        if let Some(cutoff) = value.get("alpha_cutoff").and_then(Value::as_f64) {
            self.alpha_cutoff = cutoff as f32;
        }
        if let Some(mode) = value.get("alpha_mode").and_then(Value::as_str) {
            match AlphaMode::from_str(mode) {
                Ok(alpha_mode) => self.alpha_mode = alpha_mode,
                Err(_) => LevkLog::warn(format!("LitMaterial: unknown alpha_mode '{mode}'")),
            }
        }
        if let Some(render_mode) = value.get("render_mode").and_then(RenderMode::from_json) {
            self.render_mode = render_mode;
        }
        let uris = value.get("textures").and_then(|t| t.get("uris")).and_then(Value::as_array);
        if let Some(uris) = uris {
            if let Some(albedo) = uris.first().and_then(Value::as_str) {
                self.albedo = Uri::new(albedo);
            }
            if let Some(metallic_roughness) = uris.get(1).and_then(Value::as_str) {
                self.metallic_roughness = Uri::new(metallic_roughness);
            }
            if let Some(emissive) = uris.get(2).and_then(Value::as_str) {
                self.emissive = Uri::new(emissive);
            }
        } else {
            if let Some(uri) = value.get("albedo").and_then(Value::as_str) {
                self.albedo = Uri::new(uri);
            }
            if let Some(uri) = value.get("metallic_roughness").and_then(Value::as_str) {
                self.metallic_roughness = Uri::new(uri);
            }
            if let Some(uri) = value.get("emissive").and_then(Value::as_str) {
                self.emissive = Uri::new(uri);
            }
        }
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl Material for LitMaterial {
    fn shader_uri(&self) -> Uri {
        self.shader.clone()
    }

    fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    fn write_sets(&self, writer: &mut dyn ShaderWriter, textures: &AssetProvider<Texture>) {
        let albedo = textures
            .find(&self.albedo)
            .unwrap_or_else(|| textures.fallback());
        let metallic_roughness = textures
            .find(&self.metallic_roughness)
            .unwrap_or_else(|| textures.fallback());
        let emissive = textures
            .find(&self.emissive)
            .unwrap_or_else(|| textures.fallback());
        writer.write_texture(0, 0, &albedo);
        writer.write_texture(0, 1, &metallic_roughness);
        writer.write_texture(0, 2, &emissive);
        writer.write_bytes(0, 3, bytemuck::bytes_of(&[self.metallic, self.roughness]));
    }

    fn clone_box(&self) -> Box<dyn Material> {
        Box::new(self.clone())
    }
}

/// `Uri` materials resolve to when there is no on-disk material at all (the
/// draw-list builder's "process-static default material").
pub const DEFAULT_MATERIAL_URI: &str = "materials/__default_unlit__.json";

/// The payload a material provider hands back on a load miss, and what
/// `DEFAULT_MATERIAL_URI` resolves to once pre-seeded via [`AssetProvider::add`].
pub fn default_unlit() -> Arc<dyn Material> {
    Arc::new(UnlitMaterial::default())
}

/// Binds the two shipped concrete material kinds into `registry`, so that
/// [`load`] (and anything else deserializing a `"type_name"`-tagged material
/// JSON) can resolve them.
pub fn register_materials(registry: &TypeRegistry) {
    registry.register("UnlitMaterial", TypeTags::MATERIAL, UnlitMaterial::default);
    registry.register("LitMaterial", TypeTags::MATERIAL, LitMaterial::default);
}

/// Reads a material JSON (`{"type_name": ..., ...fields}`, the wire format
/// [`TypeRegistry::serialize`] produces) and resolves it to one of the
/// concrete kinds bound to `registry` by [`register_materials`]. A
/// `type_name` the registry does not know resolves to `None` rather than the
/// fallback material, mirroring [`TypeRegistry::deserialize`]'s own
/// unknown-type handling — the asset provider applies the fallback from here.
pub fn load(
    registry: &TypeRegistry,
    vfs: &dyn DataSource,
    uri: &Uri,
) -> Option<(Arc<dyn Material>, Vec<Uri>)> {
    let bytes = vfs.read(uri);
    if bytes.is_empty() {
        return None;
    }
    let json: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => {
            LevkLog::warn(format!("material '{uri}' failed to parse: {err}"));
            return None;
        }
    };
    let deserialized = registry.deserialize(&json)?;
    let material: Box<dyn Material> = match deserialized.type_name {
        "UnlitMaterial" => Box::new(*deserialized.value.into_any().downcast::<UnlitMaterial>().ok()?),
        "LitMaterial" => Box::new(*deserialized.value.into_any().downcast::<LitMaterial>().ok()?),
        other => {
            LevkLog::warn(format!("material '{uri}': '{other}' is not a Material"));
            return None;
        }
    };
    Some((Arc::from(material), vec![uri.clone()]))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unlit_material_round_trips_through_json() {
        let original = UnlitMaterial {
            tint: [0.1, 0.2, 0.3, 1.0],
            texture: Uri::new("tex.png"),
            ..Default::default()
        };
        let json = original.serialize_fields();
        let mut restored = UnlitMaterial::default();
        assert!(restored.deserialize_fields(&json));
        assert_eq!(restored.tint, original.tint);
        assert_eq!(restored.texture, original.texture);
    }

    #[test]
    fn lit_material_rejects_missing_required_fields() {
        let mut material = LitMaterial::default();
        assert!(!material.deserialize_fields(&json!({})));
    }

    struct MapVfs(std::collections::HashMap<String, Vec<u8>>);
    impl DataSource for MapVfs {
        fn read(&self, uri: &Uri) -> Vec<u8> {
            self.0.get(uri.as_str()).cloned().unwrap_or_default()
        }
    }

    #[test]
    fn load_resolves_registered_unlit_material() {
        let registry = TypeRegistry::new();
        register_materials(&registry);

        let mut files = std::collections::HashMap::new();
        files.insert(
            "mat.json".to_string(),
            serde_json::to_vec(&json!({
                "type_name": "UnlitMaterial",
                "tint": [0.5, 0.5, 0.5, 1.0],
                "texture": "tex.png",
            }))
            .unwrap(),
        );
        let vfs = MapVfs(files);

        let (material, deps) = load(&registry, &vfs, &Uri::new("mat.json")).unwrap();
        assert_eq!(deps, vec![Uri::new("mat.json")]);
        let unlit = material.as_any().downcast_ref::<UnlitMaterial>().unwrap();
        assert_eq!(unlit.tint, [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(unlit.texture, Uri::new("tex.png"));
    }

    #[test]
    fn load_of_unregistered_type_name_is_none() {
        let registry = TypeRegistry::new();
        let mut files = std::collections::HashMap::new();
        files.insert(
            "mat.json".to_string(),
            serde_json::to_vec(&json!({ "type_name": "GhostMaterial" })).unwrap(),
        );
        let vfs = MapVfs(files);
        assert!(load(&registry, &vfs, &Uri::new("mat.json")).is_none());
    }
}
