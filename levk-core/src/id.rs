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

//! Strongly-typed monotonic identifiers.
//!
//! Unlike the generational `Handle<T>`/`Pool<T>` pair used elsewhere in this family
//! of engines, `Id<T>` is deliberately simple: a non-zero integer stamped once at
//! insertion time by the owning store's monotonic counter, never reused. Stores
//! (`NodeTree`, the entity map, asset provider maps, ...) are free to keep using a
//! plain `HashMap<Id<T>, T>` because an id is never recycled, so a stale id simply
//! fails to resolve rather than aliasing a different live value.

use serde::{Deserialize, Serialize};
use std::{
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
};

/// A typed, non-zero, monotonically assigned identifier. `Id::NONE` (value `0`) is
/// the null sentinel and never resolves to a live value in any store.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T> {
    value: u64,
    #[serde(skip)]
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    /// The null sentinel. No store ever hands this value out.
    pub const NONE: Self = Self {
        value: 0,
        _marker: PhantomData,
    };

    /// Builds an id from a raw value. Intended for deserialization and for stores
    /// reconstructing ids that were previously handed out; does not itself claim
    /// a slot in any counter.
    pub const fn from_raw(value: u64) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    /// The raw integer value, `0` for `NONE`.
    pub const fn raw(self) -> u64 {
        self.value
    }

    pub const fn is_none(self) -> bool {
        self.value == 0
    }

    pub const fn is_some(self) -> bool {
        self.value != 0
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::NONE
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.value)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Per-store monotonic counter. Each call to [`IdSource::next`] hands out
/// `previous + 1`, starting at `1` (`0` is reserved for [`Id::NONE`]).
#[derive(Debug, Clone, Copy)]
pub struct IdSource<T> {
    last: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for IdSource<T> {
    fn default() -> Self {
        Self {
            last: 0,
            _marker: PhantomData,
        }
    }
}

impl<T> IdSource<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints the next id in sequence.
    pub fn next(&mut self) -> Id<T> {
        self.last += 1;
        Id::from_raw(self.last)
    }

    /// Highest id minted so far, `0` if none yet.
    pub fn last(&self) -> u64 {
        self.last
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct Node;

    #[test]
    fn none_is_zero_and_falsy() {
        let id: Id<Node> = Id::NONE;
        assert_eq!(id.raw(), 0);
        assert!(id.is_none());
        assert!(!id.is_some());
    }

    #[test]
    fn source_mints_increasing_nonzero_ids() {
        let mut source = IdSource::<Node>::new();
        let a = source.next();
        let b = source.next();
        assert_eq!(a.raw(), 1);
        assert_eq!(b.raw(), 2);
        assert!(a.is_some());
        assert_ne!(a, b);
    }

    #[test]
    fn ids_are_distinguished_by_phantom_type_at_compile_time() {
        struct Entity;
        let node_id: Id<Node> = Id::from_raw(5);
        let entity_id: Id<Entity> = Id::from_raw(5);
        assert_eq!(node_id.raw(), entity_id.raw());
    }
}
