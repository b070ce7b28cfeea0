//! Direct linear transform for 3D projective (4×4) transforms.

use crate::{check_counts, math, LinearError};
use nalgebra::DMatrix;
use vrcal_core::{to_homogeneous, Mat4, Proj3, Pt3, Real};

/// Estimate `P` with `target ~ P · source` (homogeneous) from ≥ 5 pairs.
///
/// Each pair contributes three rows of the form
/// `t_x (p₃ · s) − p₀ · s = 0` (likewise for y and z), solved in the least
/// squares sense on Hartley-normalized points. The result is rescaled so that
/// its `(3, 3)` entry equals 1.
pub fn projective_from_correspondences(
    source: &[Pt3],
    target: &[Pt3],
) -> Result<Proj3, LinearError> {
    check_counts(source, target, 5)?;

    let (src_n, t_src) = math::normalize_points_3d(source)
        .ok_or(LinearError::Degenerate("source points coincide"))?;
    let (dst_n, t_dst) = math::normalize_points_3d(target)
        .ok_or(LinearError::Degenerate("target points coincide"))?;

    let n = source.len();
    // Pad to a square system so the SVD always exposes the null vector.
    let rows = (3 * n).max(16);
    let mut a = DMatrix::<Real>::zeros(rows, 16);

    for (i, (s, t)) in src_n.iter().zip(dst_n.iter()).enumerate() {
        let sh = to_homogeneous(s);
        for axis in 0..3 {
            let r = 3 * i + axis;
            for c in 0..4 {
                a[(r, 4 * axis + c)] = -sh[c];
                a[(r, 12 + c)] = t[axis] * sh[c];
            }
        }
    }

    let p = math::smallest_right_singular_vector(a).ok_or(LinearError::SvdFailed)?;
    let p_norm = Mat4::from_row_slice(&p);

    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or(LinearError::Degenerate("target normalization is singular"))?;
    let mut m = t_dst_inv * p_norm * t_src;

    let w = m[(3, 3)];
    if w.abs() <= Real::EPSILON * m.norm() {
        return Err(LinearError::Degenerate(
            "homogeneous scale entry vanished",
        ));
    }
    m /= w;

    Ok(Proj3::from_matrix_unchecked(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vrcal_core::synthetic::points::{random_points, transform_points};
    use vrcal_core::PointTransform;

    fn truth() -> Proj3 {
        Proj3::from_matrix_unchecked(Mat4::new(
            1.1, 0.1, -0.2, 0.5, //
            0.05, 0.9, 0.1, -0.3, //
            -0.1, 0.2, 1.2, 0.8, //
            0.02, -0.03, 0.01, 1.0,
        ))
    }

    #[test]
    fn recovers_exact_projective_transform() {
        let source = random_points(12, 1.0, 42);
        let target = transform_points(&source, &truth());

        let est = projective_from_correspondences(&source, &target).unwrap();

        assert!((est.matrix()[(3, 3)] - 1.0).abs() < 1e-12);
        let err = (est.matrix() - truth().matrix()).norm();
        assert!(err < 1e-8, "matrix error {}", err);
        for (s, t) in source.iter().zip(target.iter()) {
            assert!((est.apply(s) - t).norm() < 1e-8);
        }
    }

    #[test]
    fn needs_five_points() {
        let source = random_points(4, 1.0, 1);
        assert!(matches!(
            projective_from_correspondences(&source, &source),
            Err(LinearError::NotEnoughPoints { required: 5, got: 4 })
        ));
    }
}
