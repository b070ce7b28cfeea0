use crate::{error::check_point_sets, Derivative, FitError, FitFunctor};
use log::warn;
use vrcal_core::{to_homogeneous, Mat4, Proj3, Pt3, Real, Vec3, Vec4};

/// Fits a general 3D projective transform `p ↦ π(P · (p, 1))`, where `π`
/// divides by the homogeneous coordinate.
///
/// Parameters: the 16 entries of `P`, row-major. `normalize` rescales `P` so
/// that its bottom-right entry is 1.
#[derive(Debug, Clone)]
pub struct ProjectiveFunctor<'a> {
    source: &'a [Pt3],
    target: &'a [Pt3],
    matrix: Mat4,
    saved: Mat4,
}

impl<'a> ProjectiveFunctor<'a> {
    pub fn new(source: &'a [Pt3], target: &'a [Pt3]) -> Result<Self, FitError> {
        check_point_sets(source, target)?;
        Ok(Self {
            source,
            target,
            matrix: Mat4::identity(),
            saved: Mat4::identity(),
        })
    }

    /// Homogeneous image of source point `index` and its residual vector.
    ///
    /// `None` when the point maps to infinity.
    fn project(&self, index: usize) -> Option<(Vec4, Vec3)> {
        let h = self.matrix * to_homogeneous(&self.source[index]);
        if h.w == 0.0 {
            return None;
        }
        let mapped = h.xyz() / h.w;
        Some((h, mapped - self.target[index].coords))
    }
}

impl FitFunctor<16> for ProjectiveFunctor<'_> {
    type Transform = Proj3;

    fn transform(&self) -> Proj3 {
        Proj3::from_matrix_unchecked(self.matrix)
    }

    fn set_transform(&mut self, transform: Proj3) {
        self.matrix = transform.into_inner();
    }

    fn num_points(&self) -> usize {
        self.source.len()
    }

    fn distance(&self, index: usize) -> Real {
        match self.project(index) {
            Some((_, e)) => e.norm(),
            None => Real::INFINITY,
        }
    }

    fn distance_derivative(&self, index: usize) -> Derivative<16> {
        let mut j = Derivative::<16>::zeros();
        let Some((h, e)) = self.project(index) else {
            return j;
        };
        let d = e.norm();
        if d == 0.0 {
            return j;
        }
        let e = e / d;
        let s = to_homogeneous(&self.source[index]);
        let w = h.w;
        let along = e.dot(&h.xyz()) / (w * w);
        for c in 0..4 {
            for r in 0..3 {
                j[r * 4 + c] = e[r] * s[c] / w;
            }
            j[12 + c] = -along * s[c];
        }
        j
    }

    fn magnitude(&self) -> Real {
        self.matrix.norm()
    }

    fn increment(&mut self, delta: &Derivative<16>) {
        for r in 0..4 {
            for c in 0..4 {
                self.matrix[(r, c)] -= delta[r * 4 + c];
            }
        }
    }

    fn normalize(&mut self) {
        let m33 = self.matrix[(3, 3)];
        if m33 == 0.0 || !m33.is_finite() {
            warn!("projective estimate has (3,3) entry {}, leaving unnormalized", m33);
            return;
        }
        if m33 != 1.0 {
            self.matrix /= m33;
        }
    }

    fn save(&mut self) {
        self.saved = self.matrix;
    }

    fn restore(&mut self) {
        self.matrix = self.saved;
    }
}
