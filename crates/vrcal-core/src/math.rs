//! Scalar, point and matrix aliases shared by every fitting crate.
//!
//! Everything is computed in double precision; the aliases only exist so the
//! fitting code reads in terms of points and transforms rather than raw
//! `nalgebra` generics.

use nalgebra::{
    Isometry3, Matrix3, Matrix4, Point3, Projective3, Quaternion, UnitQuaternion, Vector2,
    Vector3, Vector4,
};

/// Scalar type used throughout the library (currently `f64`).
pub type Real = f64;

/// 2D vector with [`Real`] components.
pub type Vec2 = Vector2<Real>;
/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 4D vector with [`Real`] components.
pub type Vec4 = Vector4<Real>;
/// 3D point with [`Real`] coordinates.
pub type Pt3 = Point3<Real>;
/// 3×3 matrix with [`Real`] entries.
pub type Mat3 = Matrix3<Real>;
/// 4×4 matrix with [`Real`] entries.
pub type Mat4 = Matrix4<Real>;
/// Raw (not necessarily unit) quaternion.
pub type Quat = Quaternion<Real>;
/// Unit quaternion rotation.
pub type Rot3 = UnitQuaternion<Real>;
/// 3D rigid transform (rotation + translation).
pub type Iso3 = Isometry3<Real>;
/// General 3D projective transform (4×4 homogeneous matrix).
pub type Proj3 = Projective3<Real>;

/// Convert a 3D point into homogeneous coordinates `(x, y, z, 1)`.
pub fn to_homogeneous(p: &Pt3) -> Vec4 {
    Vec4::new(p.x, p.y, p.z, 1.0)
}

/// Convert a 4D homogeneous vector back to a 3D point.
///
/// The caller is responsible for ensuring that `w != 0`.
pub fn from_homogeneous(v: &Vec4) -> Pt3 {
    Pt3::new(v.x / v.w, v.y / v.w, v.z / v.w)
}

/// Centroid of a non-empty point set.
pub fn centroid(points: &[Pt3]) -> Option<Pt3> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(Vec3::zeros(), |acc, p| acc + p.coords);
    Some(Pt3::from(sum / points.len() as Real))
}
