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

//! Content-addressed uris used as asset keys throughout the engine.
//!
//! A [`Uri`] is an immutable `(String, hash)` pair. The hash is computed once at
//! construction and cached, so using a `Uri` as a hash map key never re-hashes the
//! underlying string. Path separators are normalized to `/` at construction so that
//! `Uri::new("a\\b")` and `Uri::new("a/b")` compare equal.

use fxhash::FxHasher64;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
};

fn normalize(raw: &str) -> String {
    raw.replace('\\', "/")
}

fn hash_of(s: &str) -> u64 {
    let mut hasher = FxHasher64::default();
    s.hash(&mut hasher);
    hasher.finish()
}

/// An immutable, pre-hashed string identifier for an asset.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Uri {
    value: String,
    #[serde(skip)]
    hash: u64,
}

impl Uri {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let value = normalize(raw.as_ref());
        let hash = hash_of(&value);
        Self { value, hash }
    }

    /// The empty uri, used as a "no asset" marker in places that cannot use
    /// `Option<Uri>` ergonomically (JSON payloads that always expect a string).
    pub fn empty() -> Self {
        Self::new("")
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Stable, precomputed hash. Safe to use for content-addressed caching.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Everything up to (excluding) the last `/` segment. Uris with no `/` have an
    /// empty parent.
    pub fn parent(&self) -> Uri {
        match self.value.rfind('/') {
            Some(idx) => Uri::new(&self.value[..idx]),
            None => Uri::new(""),
        }
    }

    /// Appends a path segment, inserting a single `/` separator.
    pub fn append(&self, segment: impl AsRef<str>) -> Uri {
        let segment = segment.as_ref();
        if self.value.is_empty() {
            return Uri::new(segment);
        }
        if segment.is_empty() {
            return self.clone();
        }
        Uri::new(format!("{}/{}", self.value, segment))
    }

    /// Concatenates a suffix directly onto the uri's string with no separator
    /// (e.g. appending a file extension).
    pub fn concat(&self, suffix: impl AsRef<str>) -> Uri {
        Uri::new(format!("{}{}", self.value, suffix.as_ref()))
    }

    /// Joins this uri onto a filesystem root using host path rules.
    pub fn absolute_path(&self, root: impl AsRef<Path>) -> PathBuf {
        let mut path = root.as_ref().to_path_buf();
        for segment in self.value.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }
}

impl From<String> for Uri {
    fn from(value: String) -> Self {
        Uri::new(value)
    }
}

impl From<Uri> for String {
    fn from(uri: Uri) -> Self {
        uri.value
    }
}

impl From<&str> for Uri {
    fn from(value: &str) -> Self {
        Uri::new(value)
    }
}

impl AsRef<str> for Uri {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl PartialEq for Uri {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.value == other.value
    }
}

impl Eq for Uri {}

impl Hash for Uri {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uri({:?})", self.value)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
