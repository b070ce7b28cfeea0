//! Numerical conditioning helpers shared by the closed-form solvers.

use nalgebra::DMatrix;
use vrcal_core::{centroid, Mat4, Pt3, Real};

/// Hartley normalization for 3D points.
///
/// Centers points at the origin and scales so that the mean distance from
/// the origin is `√3`.
///
/// # Returns
///
/// * `Some((normalized_points, transform_matrix))` with `T` such that
///   `p_norm = T * p_homogeneous`
/// * `None` if the input is empty or all points coincide
///
/// # References
///
/// Hartley & Zisserman, "Multiple View Geometry in Computer Vision", 2nd ed.,
/// Algorithm 4.2 (Normalized DLT)
pub fn normalize_points_3d(points: &[Pt3]) -> Option<(Vec<Pt3>, Mat4)> {
    let c = centroid(points)?;

    let mean_dist =
        points.iter().map(|p| (p - c).norm()).sum::<Real>() / points.len() as Real;
    if mean_dist <= Real::EPSILON {
        return None;
    }

    let scale = (3.0_f64).sqrt() / mean_dist;
    let mut t = Mat4::identity() * scale;
    t[(3, 3)] = 1.0;
    t[(0, 3)] = -scale * c.x;
    t[(1, 3)] = -scale * c.y;
    t[(2, 3)] = -scale * c.z;

    let norm = points
        .iter()
        .map(|p| Pt3::from((p - c) * scale))
        .collect();

    Some((norm, t))
}

/// Right singular vector of `a` for its smallest singular value.
///
/// `a` must have at least as many rows as columns; pad with zero rows
/// otherwise.
pub fn smallest_right_singular_vector(a: DMatrix<Real>) -> Option<Vec<Real>> {
    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|lhs, rhs| lhs.1.total_cmp(rhs.1))?;
    Some(v_t.row(min_idx).iter().copied().collect())
}
