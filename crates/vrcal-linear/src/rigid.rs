//! Absolute orientation (Kabsch / Horn) between matched 3D point sets.

use crate::{check_counts, LinearError};
use log::debug;
use nalgebra::{Rotation3, Translation3};
use vrcal_core::{centroid, Iso3, Mat3, Pt3, Real, Rot3, ScaledRigid, Vec2, Vec3};

/// Relative singular value below which the cross-covariance is treated as rank 1.
const RANK_EPS: Real = 1e-12;

/// Least-squares rigid transform `T` with `target ≈ T(source)`.
///
/// Uses the SVD of the centred cross-covariance `H = Σ (s − s̄)(t − t̄)ᵀ`
/// with a reflection correction so the result is a proper rotation.
///
/// # Errors
///
/// Fewer than 3 pairs, mismatched lengths, or a collinear/coincident source
/// set (the rotation about the line is then undetermined).
pub fn rigid_from_correspondences(source: &[Pt3], target: &[Pt3]) -> Result<Iso3, LinearError> {
    check_counts(source, target, 3)?;
    let (rotation, cs, ct) = kabsch_rotation(source, target)?;
    let translation = ct.coords - rotation * cs.coords;
    Ok(Iso3::from_parts(Translation3::from(translation), rotation))
}

/// Rigid fit followed by a least-squares estimate of the source x/y scales.
///
/// The rotation comes from [`rigid_from_correspondences`]; with it fixed, each
/// scale is the 1D regression of the target (rotated back into the source
/// frame) on the centred source coordinate. Scales are clamped to be
/// non-negative and fall back to 1 along an axis with no source extent.
pub fn scaled_rigid_from_correspondences(
    source: &[Pt3],
    target: &[Pt3],
) -> Result<ScaledRigid, LinearError> {
    check_counts(source, target, 3)?;
    let (rotation, cs, ct) = kabsch_rotation(source, target)?;

    let mut num = Vec2::zeros();
    let mut den = Vec2::zeros();
    for (s, t) in source.iter().zip(target.iter()) {
        let sc = s - cs;
        let back = rotation.inverse() * (t - ct);
        num += Vec2::new(sc.x * back.x, sc.y * back.y);
        den += Vec2::new(sc.x * sc.x, sc.y * sc.y);
    }
    let axis_scale = |n: Real, d: Real| if d > RANK_EPS { (n / d).max(0.0) } else { 1.0 };
    let scale = Vec2::new(axis_scale(num.x, den.x), axis_scale(num.y, den.y));
    debug!("closed-form x/y scale estimate: ({:.6}, {:.6})", scale.x, scale.y);

    let scaled_cs = Vec3::new(scale.x * cs.x, scale.y * cs.y, cs.z);
    let translation = ct.coords - rotation * scaled_cs;
    Ok(ScaledRigid::new(translation, rotation, scale))
}

fn kabsch_rotation(source: &[Pt3], target: &[Pt3]) -> Result<(Rot3, Pt3, Pt3), LinearError> {
    let cs = centroid(source).ok_or(LinearError::NotEnoughPoints {
        required: 3,
        got: 0,
    })?;
    let ct = centroid(target).ok_or(LinearError::NotEnoughPoints {
        required: 3,
        got: 0,
    })?;

    let mut h = Mat3::zeros();
    for (s, t) in source.iter().zip(target.iter()) {
        h += (s - cs) * (t - ct).transpose();
    }

    let svd = h.svd(true, true);
    let u = svd.u.ok_or(LinearError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(LinearError::SvdFailed)?;

    let mut sv: Vec<Real> = svd.singular_values.iter().copied().collect();
    sv.sort_by(|a, b| b.total_cmp(a));
    if sv[0] <= RANK_EPS || sv[1] <= RANK_EPS * sv[0] {
        return Err(LinearError::Degenerate(
            "source points are collinear or coincident",
        ));
    }

    let v = v_t.transpose();
    let mut r = v * u.transpose();
    if r.determinant() < 0.0 {
        // Flip the axis of the smallest singular value.
        let (min_idx, _) = svd
            .singular_values
            .iter()
            .enumerate()
            .min_by(|lhs, rhs| lhs.1.total_cmp(rhs.1))
            .ok_or(LinearError::SvdFailed)?;
        let mut v_flipped = v;
        v_flipped.column_mut(min_idx).neg_mut();
        r = v_flipped * u.transpose();
    }

    let rotation = Rot3::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r));
    Ok((rotation, cs, ct))
}
