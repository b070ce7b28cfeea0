use super::{normalize_quat, quat_rotate, quat_rotate_gradient, residual};
use crate::{error::check_point_sets, Derivative, FitError, FitFunctor};
use nalgebra::Translation3;
use vrcal_core::{Iso3, Pt3, Quat, Real, Rot3, Vec3};

/// Fits a rigid transform `p ↦ R p + t` mapping `source` onto `target`.
///
/// Parameters: `[tx, ty, tz, qi, qj, qk, qw]`.
#[derive(Debug, Clone)]
pub struct RigidFunctor<'a> {
    source: &'a [Pt3],
    target: &'a [Pt3],
    translation: Vec3,
    rotation: Quat,
    saved: (Vec3, Quat),
}

impl<'a> RigidFunctor<'a> {
    /// Borrow a matched pair of point sets; the estimate starts at identity.
    pub fn new(source: &'a [Pt3], target: &'a [Pt3]) -> Result<Self, FitError> {
        check_point_sets(source, target)?;
        Ok(Self {
            source,
            target,
            translation: Vec3::zeros(),
            rotation: Quat::identity(),
            saved: (Vec3::zeros(), Quat::identity()),
        })
    }

    fn map(&self, p: &Pt3) -> Pt3 {
        Pt3::from(quat_rotate(&self.rotation, &p.coords) + self.translation)
    }
}

impl FitFunctor<7> for RigidFunctor<'_> {
    type Transform = Iso3;

    fn transform(&self) -> Iso3 {
        Iso3::from_parts(
            Translation3::from(self.translation),
            Rot3::new_normalize(self.rotation),
        )
    }

    fn set_transform(&mut self, transform: Iso3) {
        self.translation = transform.translation.vector;
        self.rotation = transform.rotation.into_inner();
    }

    fn num_points(&self) -> usize {
        self.source.len()
    }

    fn distance(&self, index: usize) -> Real {
        (self.map(&self.source[index]) - self.target[index]).norm()
    }

    fn distance_derivative(&self, index: usize) -> Derivative<7> {
        let s = &self.source[index];
        let (e, d) = residual(&self.map(s), &self.target[index]);
        let mut j = Derivative::<7>::zeros();
        if d == 0.0 {
            return j;
        }
        let (du, dw) = quat_rotate_gradient(&self.rotation, &s.coords, &e);
        j.fixed_rows_mut::<3>(0).copy_from(&e);
        j.fixed_rows_mut::<3>(3).copy_from(&du);
        j[6] = dw;
        j
    }

    fn magnitude(&self) -> Real {
        (self.translation.norm_squared() + 1.0).sqrt()
    }

    fn increment(&mut self, delta: &Derivative<7>) {
        self.translation -= delta.fixed_rows::<3>(0);
        self.rotation.coords -= delta.fixed_rows::<4>(3);
    }

    fn normalize(&mut self) {
        normalize_quat(&mut self.rotation);
    }

    fn save(&mut self) {
        self.saved = (self.translation, self.rotation);
    }

    fn restore(&mut self) {
        (self.translation, self.rotation) = self.saved;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functors::test_support::max_derivative_error;
    use vrcal_core::synthetic::points;

    fn sample_transform() -> Iso3 {
        Iso3::from_parts(
            Translation3::new(0.4, -1.2, 2.5),
            Rot3::from_euler_angles(0.3, -0.2, 1.1),
        )
    }

    #[test]
    fn construction_rejects_bad_point_sets() {
        let a = points::cube_corners(1.0);
        assert!(matches!(
            RigidFunctor::new(&a, &a[..3]),
            Err(FitError::LengthMismatch {
                source_len: 8,
                target_len: 3
            })
        ));
        assert!(matches!(
            RigidFunctor::new(&[], &[]),
            Err(FitError::EmptyPointSet)
        ));
    }

    #[test]
    fn starts_at_identity() {
        let a = points::cube_corners(1.0);
        let f = RigidFunctor::new(&a, &a).unwrap();
        assert_eq!(f.transform(), Iso3::identity());
        for i in 0..f.num_points() {
            assert_eq!(f.distance(i), 0.0);
            assert_eq!(f.distance_derivative(i), Derivative::<7>::zeros());
        }
    }

    #[test]
    fn distance_uses_current_estimate() {
        let source = points::random_points(6, 1.0, 3);
        let truth = sample_transform();
        let target = points::transform_points(&source, &truth);

        let mut f = RigidFunctor::new(&source, &target).unwrap();
        f.set_transform(truth);
        for i in 0..f.num_points() {
            assert!(f.distance(i) < 1e-12, "distance {} = {}", i, f.distance(i));
        }
    }

    #[test]
    fn derivative_matches_finite_differences() {
        let source = points::random_points(5, 1.0, 11);
        let target = points::random_points(5, 2.0, 12);
        let mut f = RigidFunctor::new(&source, &target).unwrap();
        f.set_transform(sample_transform());

        let err = max_derivative_error(&mut f);
        assert!(err < 1e-6, "max derivative error {}", err);
    }

    #[test]
    fn normalize_yields_unit_quaternion_and_is_idempotent() {
        let a = points::cube_corners(1.0);
        let mut f = RigidFunctor::new(&a, &a).unwrap();
        f.increment(&Derivative::<7>::from_column_slice(&[
            0.1, 0.2, 0.3, -0.4, 0.3, 0.2, 0.5,
        ]));
        f.normalize();
        assert!((f.rotation.norm() - 1.0).abs() < 1e-12);

        let once = f.transform();
        f.normalize();
        let twice = f.transform();
        assert!((once.to_homogeneous() - twice.to_homogeneous()).norm() < 1e-12);
    }

    #[test]
    fn restore_rolls_back_increment() {
        let a = points::cube_corners(1.0);
        let mut f = RigidFunctor::new(&a, &a).unwrap();
        f.set_transform(sample_transform());
        f.save();
        f.increment(&Derivative::<7>::repeat(0.25));
        f.normalize();
        f.restore();
        let diff = f.transform().to_homogeneous() - sample_transform().to_homogeneous();
        assert!(diff.norm() < 1e-12, "diff {}", diff.norm());
    }

    #[test]
    fn magnitude_tracks_translation() {
        let a = points::cube_corners(1.0);
        let mut f = RigidFunctor::new(&a, &a).unwrap();
        assert_eq!(f.magnitude(), 1.0);
        f.set_transform(Iso3::translation(3.0, 0.0, 4.0));
        assert!((f.magnitude() - 26.0_f64.sqrt()).abs() < 1e-12);
    }
}
