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

//! A local spatial transform: position, orientation and scale, baked lazily into
//! a single matrix. Unlike the full FBX-derived pivot formula some engines in
//! this family carry, a `Transform` here is exactly the three properties the
//! spec calls for — setters mark the cached matrix dirty, and `matrix()`
//! recomputes it at most once per change.

use levk_core::math::{Matrix4, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::cell::Cell;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transform {
    position: Vector3<f32>,
    orientation: UnitQuaternion<f32>,
    scale: Vector3<f32>,
    #[serde(skip, default = "dirty_cell")]
    dirty: Cell<bool>,
    #[serde(skip, default = "identity_cell")]
    cached: Cell<Matrix4<f32>>,
}

fn dirty_cell() -> Cell<bool> {
    Cell::new(true)
}

fn identity_cell() -> Cell<Matrix4<f32>> {
    Cell::new(Matrix4::identity())
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            dirty: Cell::new(true),
            cached: Cell::new(Matrix4::identity()),
        }
    }
}

impl Transform {
    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn orientation(&self) -> UnitQuaternion<f32> {
        self.orientation
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    pub fn set_position(&mut self, position: Vector3<f32>) -> &mut Self {
        self.position = position;
        self.dirty.set(true);
        self
    }

    pub fn set_orientation(&mut self, orientation: UnitQuaternion<f32>) -> &mut Self {
        self.orientation = orientation;
        self.dirty.set(true);
        self
    }

    pub fn set_scale(&mut self, scale: Vector3<f32>) -> &mut Self {
        self.scale = scale;
        self.dirty.set(true);
        self
    }

    /// The local transform matrix. Recomputed only when a setter has run since
    /// the last call.
    pub fn matrix(&self) -> Matrix4<f32> {
        if self.dirty.get() {
            let translation = Matrix4::new_translation(&self.position);
            let rotation = self.orientation.to_homogeneous();
            let scale = Matrix4::new_nonuniform_scaling(&self.scale);
            self.cached.set(translation * rotation * scale);
            self.dirty.set(false);
        }
        self.cached.get()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_transform_is_identity() {
        let transform = Transform::default();
        assert_eq!(transform.matrix(), Matrix4::identity());
    }

    #[test]
    fn setter_marks_matrix_dirty_and_recomputes() {
        let mut transform = Transform::default();
        let identity = transform.matrix();
        transform.set_position(Vector3::new(1.0, 2.0, 3.0));
        let moved = transform.matrix();
        assert_ne!(identity, moved);
        assert_eq!((moved[(0, 3)], moved[(1, 3)], moved[(2, 3)]), (1.0, 2.0, 3.0));
    }

    #[test]
    fn repeated_matrix_calls_without_changes_return_cached_value() {
        let mut transform = Transform::default();
        transform.set_scale(Vector3::new(2.0, 2.0, 2.0));
        let a = transform.matrix();
        let b = transform.matrix();
        assert_eq!(a, b);
    }
}
