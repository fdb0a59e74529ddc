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

//! A [`DataSource`]/[`DataSink`] rooted at a single directory on the host
//! filesystem, translating uris to paths underneath it.

use super::{monitor::UriMonitor, source::DataSink, source::DataSource};
use levk_core::{log::LevkLog, Uri};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::RwLock,
};

/// Disk-backed virtual file system, rooted at a mount point.
pub struct DiskVfs {
    root: RwLock<PathBuf>,
    monitor: UriMonitor,
}

impl DiskVfs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: RwLock::new(root.into()),
            monitor: UriMonitor::new(),
        }
    }

    pub fn monitor(&self) -> &UriMonitor {
        &self.monitor
    }

    pub fn root(&self) -> PathBuf {
        self.root.read().unwrap().clone()
    }

    /// Changes the mount point. Every previously recorded modification
    /// timestamp is invalidated since it was relative to the old root.
    pub fn remount(&self, new_root: impl Into<PathBuf>) {
        *self.root.write().unwrap() = new_root.into();
        self.monitor.invalidate_all();
    }

    fn path_for(&self, uri: &Uri) -> PathBuf {
        uri.absolute_path(self.root())
    }

    fn mtime(path: &Path) -> io::Result<std::time::SystemTime> {
        fs::metadata(path)?.modified()
    }

    /// Queries every tracked uri's current on-disk timestamp and fires any
    /// callbacks registered through [`UriMonitor::on_modified`] whose uri
    /// advanced.
    pub fn dispatch_modified(&self) {
        let root = self.root();
        self.monitor.dispatch_modified(|uri| {
            let path = uri.absolute_path(&root);
            Self::mtime(&path).ok()
        });
    }
}

impl DataSource for DiskVfs {
    fn read(&self, uri: &Uri) -> Vec<u8> {
        let path = self.path_for(uri);
        match fs::read(&path) {
            Ok(bytes) => {
                if let Ok(mtime) = Self::mtime(&path) {
                    self.monitor.note_read(uri, mtime);
                }
                bytes
            }
            Err(_) => {
                LevkLog::warn(format!("vfs: could not read '{uri}'"));
                Vec::new()
            }
        }
    }
}

impl DataSink for DiskVfs {
    fn write(&self, bytes: &[u8], uri: &Uri) -> bool {
        let path = self.path_for(uri);
        match fs::write(&path, bytes) {
            Ok(()) => true,
            Err(err) => {
                LevkLog::warn(format!("vfs: could not write '{uri}': {err}"));
                false
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn temp_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("levk-vfs-test-{}", std::process::id()));
        let _ = fs::create_dir_all(&dir);
        dir
    }

    #[test]
    fn missing_file_reads_empty() {
        let vfs = DiskVfs::new(temp_dir());
        let bytes = vfs.read(&Uri::new("does-not-exist.json"));
        assert!(bytes.is_empty());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = temp_dir();
        let vfs = DiskVfs::new(&dir);
        let uri = Uri::new("round_trip.bin");
        assert!(vfs.write(b"hello", &uri));
        assert_eq!(vfs.read(&uri), b"hello");
    }

    #[test]
    fn modification_dispatch_fires_after_rewrite() {
        let dir = temp_dir();
        let vfs = DiskVfs::new(&dir);
        let uri = Uri::new("watched.txt");
        let path = uri.absolute_path(&dir);
        fs::write(&path, b"v1").unwrap();
        let _ = vfs.read(&uri);

        let fired = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let fired2 = fired.clone();
        let _sub = vfs.monitor().on_modified(uri.clone(), move || {
            fired2.store(true, std::sync::atomic::Ordering::SeqCst);
        });

        // Ensure the new mtime is observably later on coarse-grained filesystems.
        std::thread::sleep(std::time::Duration::from_millis(20));
        let mut file = fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.write_all(b"v2-longer").unwrap();
        drop(file);

        vfs.dispatch_modified();
        assert!(fired.load(std::sync::atomic::Ordering::SeqCst));
    }
}
