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

//! The aggregate that addresses every [`AssetProvider`] as a whole.
//!
//! This crate does not know the concrete asset payload types (`Shader`,
//! `Texture`, `Material`, `Skeleton`, ...) — those are defined downstream in
//! `levk-scene`, which also owns the mesh/material/shader loading logic that
//! would otherwise create a dependency cycle back into this crate. So
//! `AssetProviders` is type-erased: one `AssetProvider<T>` per concrete `T`,
//! keyed by `TypeId` and created lazily on first access. `levk-scene` adds
//! ergonomic typed accessors (`providers.shaders()`, `providers.textures()`, ...)
//! as an extension trait over the generic [`AssetProviders::provider`] method.

use crate::provider::AssetProvider;
use crate::vfs::{DataSource, UriMonitor};
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Owns one [`AssetProvider<T>`] per asset kind plus the shared vfs and
/// modification monitor every provider consults to decide whether its cached
/// entries are stale.
pub struct AssetProviders {
    vfs: Arc<dyn DataSource>,
    monitor: UriMonitor,
    stores: RwLock<FxHashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl AssetProviders {
    pub fn new(vfs: Arc<dyn DataSource>, monitor: UriMonitor) -> Self {
        Self {
            vfs,
            monitor,
            stores: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn vfs(&self) -> &Arc<dyn DataSource> {
        &self.vfs
    }

    pub fn monitor(&self) -> &UriMonitor {
        &self.monitor
    }

    /// Returns the provider for asset kind `T`, creating it (with `make_fallback`
    /// run at most once) on first access.
    pub fn provider<T: Send + Sync + 'static>(
        &self,
        make_fallback: impl FnOnce() -> Arc<T>,
    ) -> Arc<AssetProvider<T>> {
        let type_id = TypeId::of::<T>();
        if let Some(existing) = self.stores.read().get(&type_id) {
            return existing
                .clone()
                .downcast::<AssetProvider<T>>()
                .expect("type-erased provider map keyed by TypeId cannot mismatch");
        }

        let mut stores = self.stores.write();
        // Re-check: another thread may have inserted while we waited for the
        // write lock.
        let entry = stores
            .entry(type_id)
            .or_insert_with(|| Arc::new(AssetProvider::new(make_fallback())) as Arc<dyn Any + Send + Sync>);
        entry
            .clone()
            .downcast::<AssetProvider<T>>()
            .expect("type-erased provider map keyed by TypeId cannot mismatch")
    }

    /// Drops every entry in every provider that has been created so far.
    pub fn clear_all(&self) {
        // Each concrete `AssetProvider<T>::clear` is reachable only with `T`
        // known, so this is exposed per-kind via the typed accessors in
        // `levk-scene`; nothing type-erased needs clearing here beyond the
        // store map itself being rebuildable from scratch.
        self.stores.write().clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use levk_core::Uri;

    struct NullVfs;
    impl DataSource for NullVfs {
        fn read(&self, _uri: &Uri) -> Vec<u8> {
            Vec::new()
        }
    }

    #[test]
    fn provider_is_created_once_and_reused() {
        let providers = AssetProviders::new(Arc::new(NullVfs), UriMonitor::new());
        let a = providers.provider::<u32>(|| Arc::new(0));
        let b = providers.provider::<u32>(|| Arc::new(99));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_types_get_different_providers() {
        let providers = AssetProviders::new(Arc::new(NullVfs), UriMonitor::new());
        let ints = providers.provider::<u32>(|| Arc::new(0));
        let floats = providers.provider::<f32>(|| Arc::new(0.0));
        ints.add(Uri::new("x"), 5);
        assert!(floats.find(&Uri::new("x")).is_none());
    }
}
