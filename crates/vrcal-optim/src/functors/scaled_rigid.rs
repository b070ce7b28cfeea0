use super::{normalize_quat, quat_rotate, quat_rotate_gradient, residual};
use crate::{error::check_point_sets, Derivative, FitError, FitFunctor};
use vrcal_core::{Pt3, Quat, Real, Rot3, ScaledRigid, Vec2, Vec3};

/// Fits `p ↦ R · (sx·x, sy·y, z) + t` mapping `source` onto `target`.
///
/// Parameters: `[tx, ty, tz, qi, qj, qk, qw, sx, sy]`. `normalize` keeps the
/// quaternion unit length and clamps negative scales to zero.
#[derive(Debug, Clone)]
pub struct ScaledRigidFunctor<'a> {
    source: &'a [Pt3],
    target: &'a [Pt3],
    translation: Vec3,
    rotation: Quat,
    scale: Vec2,
    saved: (Vec3, Quat, Vec2),
}

impl<'a> ScaledRigidFunctor<'a> {
    /// Borrow a matched pair of point sets; the estimate starts at identity
    /// with unit scale.
    pub fn new(source: &'a [Pt3], target: &'a [Pt3]) -> Result<Self, FitError> {
        check_point_sets(source, target)?;
        let unit = Vec2::new(1.0, 1.0);
        Ok(Self {
            source,
            target,
            translation: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: unit,
            saved: (Vec3::zeros(), Quat::identity(), unit),
        })
    }

    fn scaled(&self, p: &Pt3) -> Vec3 {
        Vec3::new(self.scale.x * p.x, self.scale.y * p.y, p.z)
    }

    fn map(&self, p: &Pt3) -> Pt3 {
        Pt3::from(quat_rotate(&self.rotation, &self.scaled(p)) + self.translation)
    }
}

impl FitFunctor<9> for ScaledRigidFunctor<'_> {
    type Transform = ScaledRigid;

    fn transform(&self) -> ScaledRigid {
        ScaledRigid::new(
            self.translation,
            Rot3::new_normalize(self.rotation),
            self.scale,
        )
    }

    fn set_transform(&mut self, transform: ScaledRigid) {
        self.translation = transform.translation;
        self.rotation = transform.rotation.into_inner();
        self.scale = transform.scale;
    }

    fn num_points(&self) -> usize {
        self.source.len()
    }

    fn distance(&self, index: usize) -> Real {
        (self.map(&self.source[index]) - self.target[index]).norm()
    }

    fn distance_derivative(&self, index: usize) -> Derivative<9> {
        let s = &self.source[index];
        let (e, d) = residual(&self.map(s), &self.target[index]);
        let mut j = Derivative::<9>::zeros();
        if d == 0.0 {
            return j;
        }
        let (du, dw) = quat_rotate_gradient(&self.rotation, &self.scaled(s), &e);
        j.fixed_rows_mut::<3>(0).copy_from(&e);
        j.fixed_rows_mut::<3>(3).copy_from(&du);
        j[6] = dw;
        j[7] = s.x * e.dot(&quat_rotate(&self.rotation, &Vec3::x()));
        j[8] = s.y * e.dot(&quat_rotate(&self.rotation, &Vec3::y()));
        j
    }

    fn magnitude(&self) -> Real {
        (self.translation.norm_squared() + 1.0 + self.scale.norm_squared()).sqrt()
    }

    fn increment(&mut self, delta: &Derivative<9>) {
        self.translation -= delta.fixed_rows::<3>(0);
        self.rotation.coords -= delta.fixed_rows::<4>(3);
        self.scale -= delta.fixed_rows::<2>(7);
    }

    fn normalize(&mut self) {
        normalize_quat(&mut self.rotation);
        self.scale = self.scale.map(|s| s.max(0.0));
    }

    fn save(&mut self) {
        self.saved = (self.translation, self.rotation, self.scale);
    }

    fn restore(&mut self) {
        (self.translation, self.rotation, self.scale) = self.saved;
    }
}
