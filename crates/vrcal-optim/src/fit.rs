//! One-call fitting: seed, minimize, retry from turned starts, summarize.
//!
//! The helpers wrap the functor + [`minimize_with_report`] loop for callers
//! that only have two matched point sets. The seed comes from the closed-form
//! solvers in `vrcal-linear` (or identity), and up to `restarts` extra runs
//! start from the seed composed with 90° turns about x, y and z. The run with
//! the lowest final cost wins.

use crate::{
    minimize_with_report, FitError, FitFunctor, LmOptions, LmReport, ProjectiveFunctor,
    RigidFunctor, ScaledRigidFunctor,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use vrcal_core::{
    residual_distances, DistanceStats, Iso3, PointTransform, Proj3, Pt3, Real, Rot3, ScaledRigid,
    Vec3,
};
use vrcal_linear::{
    projective_from_correspondences, rigid_from_correspondences, scaled_rigid_from_correspondences,
};

/// Where the first minimization starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitStrategy {
    /// Identity transform (unit scale for scaled-rigid).
    Identity,
    /// Closed-form estimate; falls back to identity when the point
    /// configuration does not support it.
    #[default]
    ClosedForm,
}

/// Options of the `fit_*` helpers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FitOptions {
    pub lm: LmOptions,
    pub init: InitStrategy,
    /// Extra runs from turned starting rotations after the seeded run.
    pub restarts: usize,
}

/// Result of a `fit_*` call.
#[derive(Debug, Clone)]
pub struct FitReport<T> {
    /// Best transform over all attempts.
    pub transform: T,
    /// `½ Σ dᵢ²` at `transform`.
    pub cost: Real,
    /// Per-pair distance statistics at `transform`.
    pub stats: DistanceStats,
    /// Minimizer report of the winning attempt.
    pub lm: LmReport,
    /// Number of minimizations run.
    pub attempts: usize,
}

/// Rigid fit of `target ≈ R · source + t`.
///
/// # Example
///
/// ```
/// use nalgebra::Translation3;
/// use vrcal_core::{synthetic::points, Iso3, Rot3};
/// use vrcal_optim::{fit_rigid, FitOptions};
///
/// let truth = Iso3::from_parts(
///     Translation3::new(1.0, 2.0, 3.0),
///     Rot3::from_euler_angles(0.1, 0.2, 0.3),
/// );
/// let source = points::grid_points_3d(3, 3, 2, 0.5);
/// let target = points::transform_points(&source, &truth);
///
/// let report = fit_rigid(&source, &target, &FitOptions::default()).unwrap();
/// assert!(report.stats.max < 1e-8);
/// ```
pub fn fit_rigid(
    source: &[Pt3],
    target: &[Pt3],
    options: &FitOptions,
) -> Result<FitReport<Iso3>, FitError> {
    let functor = RigidFunctor::new(source, target)?;
    options.lm.validate()?;
    let seed = match options.init {
        InitStrategy::Identity => Iso3::identity(),
        InitStrategy::ClosedForm => rigid_from_correspondences(source, target)
            .unwrap_or_else(|err| {
                warn!("closed-form rigid seed unavailable ({}), starting at identity", err);
                Iso3::identity()
            }),
    };
    Ok(run_attempts(functor, seed, source, target, options))
}

/// Rigid fit with independent scale on the source x and y axes.
pub fn fit_scaled_rigid(
    source: &[Pt3],
    target: &[Pt3],
    options: &FitOptions,
) -> Result<FitReport<ScaledRigid>, FitError> {
    let functor = ScaledRigidFunctor::new(source, target)?;
    options.lm.validate()?;
    let seed = match options.init {
        InitStrategy::Identity => ScaledRigid::identity(),
        InitStrategy::ClosedForm => scaled_rigid_from_correspondences(source, target)
            .unwrap_or_else(|err| {
                warn!(
                    "closed-form scaled-rigid seed unavailable ({}), starting at identity",
                    err
                );
                ScaledRigid::identity()
            }),
    };
    Ok(run_attempts(functor, seed, source, target, options))
}

/// General projective fit; the closed-form seed needs at least 5 pairs.
pub fn fit_projective(
    source: &[Pt3],
    target: &[Pt3],
    options: &FitOptions,
) -> Result<FitReport<Proj3>, FitError> {
    let functor = ProjectiveFunctor::new(source, target)?;
    options.lm.validate()?;
    let seed = match options.init {
        InitStrategy::Identity => Proj3::identity(),
        InitStrategy::ClosedForm => projective_from_correspondences(source, target)
            .unwrap_or_else(|err| {
                warn!(
                    "closed-form projective seed unavailable ({}), starting at identity",
                    err
                );
                Proj3::identity()
            }),
    };
    Ok(run_attempts(functor, seed, source, target, options))
}

/// A transform that can be re-started from a turned rotation.
trait TurnedStart: Sized {
    /// `self` applied after rotating the source by `turn`.
    fn turned(&self, turn: &Rot3) -> Self;
}

impl TurnedStart for Iso3 {
    fn turned(&self, turn: &Rot3) -> Self {
        Iso3::from_parts(self.translation, self.rotation * turn)
    }
}

impl TurnedStart for ScaledRigid {
    fn turned(&self, turn: &Rot3) -> Self {
        ScaledRigid::new(self.translation, self.rotation * turn, self.scale)
    }
}

impl TurnedStart for Proj3 {
    fn turned(&self, turn: &Rot3) -> Self {
        Proj3::from_matrix_unchecked(self.matrix() * turn.to_homogeneous())
    }
}

/// The `k`-th restart turn: 90°, 180°, 270° about x, then y, then z, cycling.
fn restart_turn(k: usize) -> Rot3 {
    let axes = [Vec3::x_axis(), Vec3::y_axis(), Vec3::z_axis()];
    let quarter_turns = (k / 3) % 3 + 1;
    Rot3::from_axis_angle(
        &axes[k % 3],
        quarter_turns as Real * std::f64::consts::FRAC_PI_2,
    )
}

fn run_attempts<F, const D: usize>(
    mut functor: F,
    seed: F::Transform,
    source: &[Pt3],
    target: &[Pt3],
    options: &FitOptions,
) -> FitReport<F::Transform>
where
    F: FitFunctor<D>,
    F::Transform: TurnedStart + PointTransform + Clone,
{
    let attempts = options.restarts + 1;
    let mut run = |start: F::Transform, attempt: usize| {
        functor.set_transform(start);
        functor.normalize();
        let report = minimize_with_report(&mut functor, &options.lm);
        debug!(
            "fit attempt {}/{}: cost {:.6e} ({:?}, {} iterations)",
            attempt,
            attempts,
            report.cost,
            report.termination,
            report.iterations
        );
        (functor.transform(), report)
    };

    let (mut transform, mut lm) = run(seed.clone(), 1);
    for k in 0..options.restarts {
        let (candidate, report) = run(seed.turned(&restart_turn(k)), k + 2);
        if report.cost < lm.cost {
            transform = candidate;
            lm = report;
        }
    }

    let stats = DistanceStats::from_distances(&residual_distances(source, target, &transform));
    FitReport {
        transform,
        cost: lm.cost,
        stats,
        lm,
        attempts,
    }
}
