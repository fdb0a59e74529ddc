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

//! The process-wide type registry that makes polymorphic (de)serialization
//! possible: a `type_name -> (factory, type_id, tags)` binding table, populated
//! once at startup by an explicit `register_types()` call from the runtime setup
//! rather than via global constructors with undefined ordering (see DESIGN.md).

use fxhash::FxHashMap;
use levk_core::log::LevkLog;
use parking_lot::Mutex;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::sync::Arc;

bitflags::bitflags! {
    /// Capability tags a registered type can carry. Kept as a bitset so
    /// future tags compose cheaply.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TypeTags: u32 {
        const COMPONENT  = 0b0001;
        const ATTACHMENT = 0b0010;
        const MATERIAL   = 0b0100;
    }
}

/// Implemented by every polymorphic type that can be registered with the type
/// registry: components, attachments, materials.
pub trait Registerable: Any + Send + Sync {
    fn type_name(&self) -> &'static str;
    fn serialize_fields(&self) -> Value;
    /// Applies `value`'s fields onto `self`. Returns `false` on any shape
    /// mismatch; the caller treats that as a failed deserialize.
    fn deserialize_fields(&mut self, value: &Value) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Surrenders ownership as `Box<dyn Any>`, so a caller holding the
    /// concrete type name (as every [`TypeRegistry::deserialize`] caller does)
    /// can downcast the owned value instead of only borrowing it.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// The result of a successful [`TypeRegistry::deserialize`] call.
pub struct Deserialized {
    pub value: Box<dyn Registerable>,
    pub type_name: &'static str,
    pub type_id: TypeId,
}

type Factory = Arc<dyn Fn() -> Box<dyn Registerable> + Send + Sync>;

struct Binding {
    factory: Factory,
    type_id: TypeId,
    tags: TypeTags,
}

#[derive(Default)]
struct RegistryState {
    bindings: FxHashMap<&'static str, Binding>,
}

/// Process-wide serializer / type registry.
#[derive(Default)]
pub struct TypeRegistry {
    state: Mutex<RegistryState>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `type_name` to a zero-arg constructor. Last bind for a given name
    /// wins; an empty name is refused with a warning and has no effect.
    pub fn register<T>(&self, type_name: &'static str, tags: TypeTags, factory: fn() -> T)
    where
        T: Registerable + 'static,
    {
        if type_name.is_empty() {
            LevkLog::warn("type registry: refusing to bind an empty type name");
            return;
        }
        let mut state = self.state.lock();
        state.bindings.insert(
            type_name,
            Binding {
                factory: Arc::new(move || Box::new(factory())),
                type_id: TypeId::of::<T>(),
                tags,
            },
        );
    }

    /// Writes `{"type_name": ..., ...value.serialize_fields()}`.
    pub fn serialize(&self, value: &dyn Registerable) -> Value {
        let mut object = match value.serialize_fields() {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        object.insert(
            "type_name".to_string(),
            Value::String(value.type_name().to_string()),
        );
        Value::Object(object)
    }

    /// Reads `type_name` from `json`, instantiates the matching factory, and
    /// applies the remaining fields. Returns `None` on any failure: missing or
    /// unknown `type_name`, or a shape mismatch during `deserialize_fields`.
    pub fn deserialize(&self, json: &Value) -> Option<Deserialized> {
        let type_name = json.get("type_name")?.as_str()?;
        let (factory, type_id) = {
            let state = self.state.lock();
            let binding = state.bindings.get(type_name);
            match binding {
                Some(binding) => (binding.factory.clone(), binding.type_id),
                None => {
                    LevkLog::warn(format!(
                        "type registry: unknown type_name '{type_name}', skipping"
                    ));
                    return None;
                }
            }
        };
        let mut value = factory();
        if !value.deserialize_fields(json) {
            LevkLog::warn(format!(
                "type registry: '{type_name}' failed to deserialize its fields"
            ));
            return None;
        }
        // `type_name` above borrowed from `json`; re-resolve a 'static str from
        // the binding table rather than leak the borrowed str.
        let type_name = {
            let state = self.state.lock();
            state
                .bindings
                .iter()
                .find(|(_, binding)| binding.type_id == type_id)
                .map(|(name, _)| *name)
                .unwrap_or("<unknown>")
        };
        Some(Deserialized {
            value,
            type_name,
            type_id,
        })
    }

    /// True if any binding carries `tag`.
    pub fn is_registered_with(&self, type_name: &str, tag: TypeTags) -> bool {
        self.state
            .lock()
            .bindings
            .get(type_name)
            .is_some_and(|binding| binding.tags.contains(tag))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Default)]
    struct Dummy {
        value: i32,
    }

    impl Registerable for Dummy {
        fn type_name(&self) -> &'static str {
            "Dummy"
        }

        fn serialize_fields(&self) -> Value {
            serde_json::json!({ "value": self.value })
        }

        fn deserialize_fields(&mut self, value: &Value) -> bool {
            match value.get("value").and_then(Value::as_i64) {
                Some(v) => {
                    self.value = v as i32;
                    true
                }
                None => false,
            }
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

    #[test]
    fn round_trips_through_serialize_deserialize() {
        let registry = TypeRegistry::new();
        registry.register("Dummy", TypeTags::COMPONENT, Dummy::default);

        let original = Dummy { value: 42 };
        let json = registry.serialize(&original);
        assert_eq!(json["type_name"], "Dummy");
        assert_eq!(json["value"], 42);

        let deserialized = registry.deserialize(&json).expect("should deserialize");
        assert_eq!(deserialized.type_name, "Dummy");
        let dummy = deserialized.value.as_any().downcast_ref::<Dummy>().unwrap();
        assert_eq!(dummy.value, 42);
    }

    #[test]
    fn unknown_type_name_returns_none() {
        let registry = TypeRegistry::new();
        let json = serde_json::json!({ "type_name": "Ghost" });
        assert!(registry.deserialize(&json).is_none());
    }

    #[test]
    fn empty_type_name_refused_at_bind_time() {
        let registry = TypeRegistry::new();
        registry.register("", TypeTags::COMPONENT, Dummy::default);
        assert!(!registry.is_registered_with("", TypeTags::COMPONENT));
    }

    #[test]
    fn last_bind_wins() {
        let registry = TypeRegistry::new();
        registry.register("Dummy", TypeTags::COMPONENT, Dummy::default);
        registry.register("Dummy", TypeTags::MATERIAL, Dummy::default);
        assert!(registry.is_registered_with("Dummy", TypeTags::MATERIAL));
        assert!(!registry.is_registered_with("Dummy", TypeTags::COMPONENT));
    }
}
