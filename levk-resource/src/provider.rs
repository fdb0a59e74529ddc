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

//! A typed, concurrent, content-addressed cache for one asset kind.
//!
//! `load_payload` always runs with the map's lock released; the provider takes
//! the lock only to insert the finished entry. Two threads racing to load the
//! same uri may both parse the asset — the second insertion simply wins. This is
//! safe because loads are pure functions of their bytes, and it keeps recursive
//! dependency loading (a mesh loading its material, which loads its textures)
//! from ever taking two locks at once on the same provider.

use fxhash::FxHashMap;
use levk_core::Uri;
use parking_lot::Mutex;
use std::sync::Arc;

struct Entry<T> {
    payload: Arc<T>,
    dependencies: Vec<Uri>,
}

/// A typed asset cache keyed by [`Uri`]. See module docs for the concurrency
/// contract.
pub struct AssetProvider<T> {
    entries: Mutex<FxHashMap<Uri, Entry<T>>>,
    fallback: Arc<T>,
}

impl<T> AssetProvider<T> {
    pub fn new(fallback: Arc<T>) -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
            fallback,
        }
    }

    /// Returns the cached payload for `uri`, or loads it via `load` on miss.
    /// `load` returns the parsed payload plus every uri it transitively read in
    /// order to construct it (used later by [`AssetProvider::reload_out_of_date`]).
    /// On load failure the shared fallback is returned and nothing is cached, so
    /// a later `get` will retry the load.
    pub fn get(&self, uri: &Uri, load: impl FnOnce(&Uri) -> Option<(T, Vec<Uri>)>) -> Arc<T> {
        if let Some(entry) = self.entries.lock().get(uri) {
            return entry.payload.clone();
        }

        match load(uri) {
            Some((payload, dependencies)) => {
                let payload = Arc::new(payload);
                self.entries.lock().insert(
                    uri.clone(),
                    Entry {
                        payload: payload.clone(),
                        dependencies,
                    },
                );
                payload
            }
            None => self.fallback.clone(),
        }
    }

    /// Returns the cached payload without attempting to load it.
    pub fn find(&self, uri: &Uri) -> Option<Arc<T>> {
        self.entries.lock().get(uri).map(|entry| entry.payload.clone())
    }

    /// Inserts an externally constructed asset. Its only recorded dependency is
    /// the uri itself.
    pub fn add(&self, uri: Uri, asset: T) {
        self.entries.lock().insert(
            uri.clone(),
            Entry {
                payload: Arc::new(asset),
                dependencies: vec![uri],
            },
        );
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Evicts every entry that has at least one dependency for which
    /// `is_modified` returns true. A subsequent `get` re-runs the loader.
    pub fn reload_out_of_date(&self, is_modified: impl Fn(&Uri) -> bool) {
        self.entries
            .lock()
            .retain(|_, entry| !entry.dependencies.iter().any(&is_modified));
    }

    pub fn fallback(&self) -> Arc<T> {
        self.fallback.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn get_caches_across_calls() {
        let provider = AssetProvider::new(Arc::new(0u32));
        let loads = AtomicUsize::new(0);
        let uri = Uri::new("a.json");
        let load = |_: &Uri| {
            loads.fetch_add(1, Ordering::SeqCst);
            Some((7u32, vec![]))
        };
        let first = provider.get(&uri, load);
        let second = provider.get(&uri, load);
        assert_eq!(*first, 7);
        assert_eq!(*second, 7);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_load_returns_fallback_and_does_not_cache() {
        let provider: AssetProvider<u32> = AssetProvider::new(Arc::new(255));
        let uri = Uri::new("missing.json");
        let result = provider.get(&uri, |_| None);
        assert_eq!(*result, 255);
        assert!(provider.find(&uri).is_none());
    }

    #[test]
    fn reload_out_of_date_evicts_only_modified_dependencies() {
        let provider = AssetProvider::new(Arc::new(0u32));
        let stable = Uri::new("stable.json");
        let stale = Uri::new("stale.json");
        provider.get(&stable, |_| Some((1, vec![Uri::new("dep_a")])));
        provider.get(&stale, |_| Some((2, vec![Uri::new("dep_b")])));

        provider.reload_out_of_date(|dep| dep.as_str() == "dep_b");

        assert!(provider.find(&stable).is_some());
        assert!(provider.find(&stale).is_none());
    }

    #[test]
    fn add_inserts_with_self_as_only_dependency() {
        let provider = AssetProvider::new(Arc::new(0u32));
        let uri = Uri::new("manual.json");
        provider.add(uri.clone(), 9);
        assert_eq!(*provider.find(&uri).unwrap(), 9);
    }
}
