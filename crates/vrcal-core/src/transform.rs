//! The three transform families fitted between matched point sets.
//!
//! - rigid: [`Iso3`] (translation + unit quaternion),
//! - scaled-rigid: [`ScaledRigid`] (rigid + independent x/y scale of the source),
//! - projective: [`Proj3`] (general 4×4 homogeneous matrix).
//!
//! [`PointTransform`] gives the fitting code a single way to map points and
//! export the homogeneous matrix regardless of the family.

use crate::{from_homogeneous, to_homogeneous, Iso3, Mat3, Mat4, Proj3, Pt3, Rot3, Vec2, Vec3};
use nalgebra::Translation3;
use serde::{Deserialize, Serialize};

/// A transform that can be applied to 3D points.
pub trait PointTransform {
    /// Map a source point into the target frame.
    fn apply(&self, p: &Pt3) -> Pt3;

    /// Homogeneous 4×4 matrix of the transform.
    fn to_matrix(&self) -> Mat4;
}

impl PointTransform for Iso3 {
    fn apply(&self, p: &Pt3) -> Pt3 {
        self.transform_point(p)
    }

    fn to_matrix(&self) -> Mat4 {
        self.to_homogeneous()
    }
}

impl PointTransform for Proj3 {
    fn apply(&self, p: &Pt3) -> Pt3 {
        from_homogeneous(&(self.matrix() * to_homogeneous(p)))
    }

    fn to_matrix(&self) -> Mat4 {
        *self.matrix()
    }
}

/// Rigid transform with independent scale factors on the source x and y axes.
///
/// A point `p` maps to `R · (sx·x, sy·y, z) + t`; the scale is applied in the
/// source frame, before the rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaledRigid {
    pub translation: Vec3,
    pub rotation: Rot3,
    /// `(sx, sy)`, non-negative for a valid transform.
    pub scale: Vec2,
}

impl Default for ScaledRigid {
    fn default() -> Self {
        Self::identity()
    }
}

impl ScaledRigid {
    pub fn new(translation: Vec3, rotation: Rot3, scale: Vec2) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn identity() -> Self {
        Self::new(Vec3::zeros(), Rot3::identity(), Vec2::new(1.0, 1.0))
    }

    /// The rigid part, dropping the scale.
    pub fn isometry(&self) -> Iso3 {
        Iso3::from_parts(Translation3::from(self.translation), self.rotation)
    }

    /// `diag(sx, sy, 1)`.
    pub fn scale_matrix(&self) -> Mat3 {
        Mat3::from_diagonal(&Vec3::new(self.scale.x, self.scale.y, 1.0))
    }

    pub fn transform_point(&self, p: &Pt3) -> Pt3 {
        let scaled = Vec3::new(self.scale.x * p.x, self.scale.y * p.y, p.z);
        Pt3::from(self.rotation * scaled + self.translation)
    }
}

impl PointTransform for ScaledRigid {
    fn apply(&self, p: &Pt3) -> Pt3 {
        self.transform_point(p)
    }

    fn to_matrix(&self) -> Mat4 {
        let linear = self.rotation.to_rotation_matrix().into_inner() * self.scale_matrix();
        let mut m = Mat4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&linear);
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        m
    }
}
