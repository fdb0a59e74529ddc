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

//! Tracks the last-known modification timestamp of every uri that has been read,
//! and fires subscribed callbacks for uris whose on-disk timestamp has advanced.
//!
//! Dispatch is always driven explicitly by [`UriMonitor::dispatch_modified`] on
//! the calling thread; there is no background watcher thread. Callbacks are
//! snapshotted under the lock and invoked outside it, so a callback is free to
//! subscribe or unsubscribe during dispatch without deadlocking or corrupting the
//! listener list mid-iteration.

use fxhash::FxHashMap;
use levk_core::Uri;
use parking_lot::Mutex;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::{
    sync::{Arc, Weak},
    time::SystemTime,
};

type Callback = Box<dyn FnMut() + Send>;

struct Listener {
    id: u64,
    uri: Uri,
    callback: Callback,
}

#[derive(Default)]
struct MonitorState {
    timestamps: FxHashMap<Uri, SystemTime>,
    listeners: Vec<Listener>,
    next_listener_id: u64,
}

/// Shared handle to the modification tracker. Cheap to clone; all clones observe
/// the same underlying state.
#[derive(Clone, Default)]
pub struct UriMonitor {
    state: Arc<Mutex<MonitorState>>,
}

/// Drops the associated callback registration when dropped.
pub struct Subscription {
    id: u64,
    state: Weak<Mutex<MonitorState>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            let mut state = state.lock();
            state.listeners.retain(|listener| listener.id != self.id);
        }
    }
}

impl UriMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the current timestamp for `uri` if this is the first time it has
    /// been read, or refreshes it to the given value. Called by the VFS after a
    /// successful read.
    pub fn note_read(&self, uri: &Uri, mtime: SystemTime) {
        let mut state = self.state.lock();
        state.timestamps.entry(uri.clone()).or_insert(mtime);
    }

    /// Subscribes a callback to fire whenever `uri`'s on-disk timestamp is
    /// observed to advance past its last recorded value. The callback stops
    /// firing once the returned [`Subscription`] is dropped.
    pub fn on_modified(&self, uri: Uri, callback: impl FnMut() + Send + 'static) -> Subscription {
        let mut state = self.state.lock();
        let id = state.next_listener_id;
        state.next_listener_id += 1;
        state.listeners.push(Listener {
            id,
            uri,
            callback: Box::new(callback),
        });
        Subscription {
            id,
            state: Arc::downgrade(&self.state),
        }
    }

    /// Probes the current on-disk timestamp of every tracked uri via `probe`,
    /// and fires every listener whose uri's timestamp advanced. `probe` returning
    /// `None` (file vanished) is treated as "no change" rather than a modification.
    ///
    /// The probes themselves (one syscall-bound `probe` call per tracked uri)
    /// run across `rayon`'s worker pool rather than the calling thread, since a
    /// large watch set makes this the same I/O-bound workload spec.md §5 calls
    /// out alongside asset pre-loading.
    pub fn dispatch_modified(&self, probe: impl Fn(&Uri) -> Option<SystemTime> + Sync) {
        let advanced: Vec<Uri> = {
            let mut state = self.state.lock();
            let uris: Vec<Uri> = state.timestamps.keys().cloned().collect();
            let fresh: Vec<(Uri, Option<SystemTime>)> = uris
                .into_par_iter()
                .map(|uri| {
                    let stamp = probe(&uri);
                    (uri, stamp)
                })
                .collect();

            let mut advanced = Vec::new();
            for (uri, stamp) in fresh {
                let Some(fresh) = stamp else { continue };
                let stale = state.timestamps.get(&uri).copied();
                let is_advanced = match stale {
                    Some(stale) => fresh > stale,
                    None => true,
                };
                if is_advanced {
                    state.timestamps.insert(uri.clone(), fresh);
                    advanced.push(uri);
                }
            }
            advanced
        };

        if advanced.is_empty() {
            return;
        }

        // Snapshot under the lock, then invoke outside it so a callback that
        // subscribes/unsubscribes does not deadlock or race the iteration.
        let mut to_invoke: Vec<&mut Callback> = Vec::new();
        let mut guard = self.state.lock();
        for listener in guard.listeners.iter_mut() {
            if advanced.contains(&listener.uri) {
                to_invoke.push(&mut listener.callback);
            }
        }
        for callback in to_invoke {
            callback();
        }
    }

    /// A change to the mount point invalidates every stored timestamp; the next
    /// dispatch treats every tracked uri as fresh (but does not itself fire
    /// callbacks — the next `dispatch_modified` with real probe results does).
    pub fn invalidate_all(&self) {
        let mut state = self.state.lock();
        state.timestamps.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[test]
    fn dispatch_fires_only_for_advanced_uris() {
        let monitor = UriMonitor::new();
        let base = SystemTime::UNIX_EPOCH;
        let a = Uri::new("a.json");
        let b = Uri::new("b.json");
        monitor.note_read(&a, base);
        monitor.note_read(&b, base);

        let fired = Arc::new(Mutex::new(Vec::new()));
        let fired_a = fired.clone();
        let _sub_a = monitor.on_modified(a.clone(), move || fired_a.lock().push("a"));
        let fired_b = fired.clone();
        let _sub_b = monitor.on_modified(b.clone(), move || fired_b.lock().push("b"));

        monitor.dispatch_modified(|uri| {
            if *uri == a {
                Some(base + Duration::from_secs(1))
            } else {
                Some(base)
            }
        });

        assert_eq!(*fired.lock(), vec!["a"]);
    }

    #[test]
    fn dropped_subscription_stops_firing() {
        let monitor = UriMonitor::new();
        let base = SystemTime::UNIX_EPOCH;
        let uri = Uri::new("a.json");
        monitor.note_read(&uri, base);

        let fired = Arc::new(Mutex::new(0));
        let fired2 = fired.clone();
        let subscription = monitor.on_modified(uri.clone(), move || *fired2.lock() += 1);
        drop(subscription);

        monitor.dispatch_modified(|_| Some(base + Duration::from_secs(1)));
        assert_eq!(*fired.lock(), 0);
    }

    #[test]
    fn invalidate_all_clears_timestamps() {
        let monitor = UriMonitor::new();
        let uri = Uri::new("a.json");
        monitor.note_read(&uri, SystemTime::UNIX_EPOCH);
        monitor.invalidate_all();
        assert!(monitor.state.lock().timestamps.is_empty());
    }
}
