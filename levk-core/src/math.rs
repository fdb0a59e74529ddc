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

//! Math aliases shared by every crate in the workspace, built on top of `nalgebra`
//! rather than a hand-rolled vector/matrix/quaternion library.

pub use nalgebra::{Matrix3, Matrix4, Point3, UnitQuaternion, Vector2, Vector3, Vector4};

/// Linear interpolation, used by every scalar/vector [`Interpolator`](crate) in the
/// animation system.
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn lerp_vec3(a: Vector3<f32>, b: Vector3<f32>, t: f32) -> Vector3<f32> {
    a.lerp(&b, t)
}

pub fn slerp_quat(a: UnitQuaternion<f32>, b: UnitQuaternion<f32>, t: f32) -> UnitQuaternion<f32> {
    a.slerp(&b, t)
}

/// Decomposes an affine matrix built as `translation * rotation * non_uniform_scale`
/// (the exact composition `Transform::matrix` produces) back into its three
/// parts. Used to copy a followed entity's full global transform — not just
/// its position — onto a scene camera.
pub fn decompose_trs(matrix: &Matrix4<f32>) -> (Vector3<f32>, UnitQuaternion<f32>, Vector3<f32>) {
    let position = Vector3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]);
    let column = |i: usize| Vector3::new(matrix[(0, i)], matrix[(1, i)], matrix[(2, i)]);
    let (col0, col1, col2) = (column(0), column(1), column(2));
    let scale = Vector3::new(col0.norm(), col1.norm(), col2.norm());
    let rotation_matrix = Matrix3::from_columns(&[
        safe_normalize(col0, scale.x),
        safe_normalize(col1, scale.y),
        safe_normalize(col2, scale.z),
    ]);
    let orientation = UnitQuaternion::from_matrix(&rotation_matrix);
    (position, orientation, scale)
}

fn safe_normalize(v: Vector3<f32>, length: f32) -> Vector3<f32> {
    if length > 0.0 {
        v / length
    } else {
        Vector3::zeros()
    }
}

/// An axis-aligned bounding box defined by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn from_center_size(center: Vector3<f32>, size: Vector3<f32>) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn translated(&self, offset: Vector3<f32>) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Standard axis-overlap intersection test. A degenerate (zero-sized) box
    /// never intersects anything, including another degenerate box at the same
    /// position.
    pub fn intersects(&self, other: &Aabb) -> bool {
        if self.size().x <= 0.0
            || self.size().y <= 0.0
            || self.size().z <= 0.0
            || other.size().x <= 0.0
            || other.size().y <= 0.0
            || other.size().z <= 0.0
        {
            return false;
        }
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_sized_aabb_never_intersects() {
        let a = Aabb::from_center_size(Vector3::zeros(), Vector3::zeros());
        let b = Aabb::from_center_size(Vector3::zeros(), Vector3::new(1.0, 1.0, 1.0));
        assert!(!a.intersects(&b));
        assert!(!a.intersects(&a));
    }

    #[test]
    fn decompose_trs_recovers_position_orientation_and_scale() {
        let position = Vector3::new(1.0, 2.0, 3.0);
        let orientation =
            UnitQuaternion::from_axis_angle(&nalgebra::Vector3::y_axis(), std::f32::consts::FRAC_PI_2);
        let scale = Vector3::new(2.0, 1.0, 0.5);
        let matrix = Matrix4::new_translation(&position)
            * orientation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&scale);

        let (decoded_position, decoded_orientation, decoded_scale) = decompose_trs(&matrix);
        assert!((decoded_position - position).norm() < 1e-5);
        assert!((decoded_scale - scale).norm() < 1e-4);
        assert!(decoded_orientation.angle_to(&orientation) < 1e-4);
    }

    #[test]
    fn overlapping_boxes_intersect() {
        let a = Aabb::from_center_size(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        let b = Aabb::from_center_size(Vector3::new(0.5, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }
}
