//! Levenberg–Marquardt minimization of summed squared point distances.
//!
//! Minimizes `F = ½ Σᵢ dᵢ²` over the parameters of a [`FitFunctor`] using
//! damped Gauss–Newton steps on the normal equations
//! `(A + μI) h = g` with `A = Σ JᵢJᵢᵀ` and `g = Σ Jᵢdᵢ`.
//!
//! Damping follows Nielsen's update: on an accepted step
//! `μ ← μ · max(1/3, 1 − (2ρ − 1)³)` and `ν ← 2`, on a rejected step
//! `μ ← μν` and `ν ← 2ν`, where `ρ` is the ratio of actual to predicted
//! cost decrease.
//!
//! The minimizer never fails: it stops on a small gradient, a small step, or
//! the iteration cap, and reports which through [`LmReport::termination`].

use crate::{Derivative, FitError, FitFunctor};
use log::{debug, trace};
use nalgebra::SMatrix;
use serde::{Deserialize, Serialize};
use vrcal_core::Real;

/// Tunables of the Levenberg–Marquardt loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmOptions {
    /// Initial damping relative to the largest diagonal entry of `A`.
    pub tau: Real,
    /// Stop once `max |g_k|` drops to this value.
    pub gradient_tolerance: Real,
    /// Stop once `‖h‖ ≤ step_tolerance · (magnitude + step_tolerance)`.
    pub step_tolerance: Real,
    /// Hard cap on loop iterations (accepted and rejected steps alike).
    pub max_iterations: usize,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            tau: 1.0e-3,
            gradient_tolerance: 1.0e-20,
            step_tolerance: 1.0e-20,
            max_iterations: 1000,
        }
    }
}

impl LmOptions {
    /// Check that the options describe a runnable minimization.
    pub fn validate(&self) -> Result<(), FitError> {
        if !(self.tau.is_finite() && self.tau > 0.0) {
            return Err(FitError::InvalidOptions(format!(
                "tau must be finite and positive, got {}",
                self.tau
            )));
        }
        if !(self.gradient_tolerance.is_finite() && self.gradient_tolerance >= 0.0) {
            return Err(FitError::InvalidOptions(format!(
                "gradient_tolerance must be finite and non-negative, got {}",
                self.gradient_tolerance
            )));
        }
        if !(self.step_tolerance.is_finite() && self.step_tolerance >= 0.0) {
            return Err(FitError::InvalidOptions(format!(
                "step_tolerance must be finite and non-negative, got {}",
                self.step_tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(FitError::InvalidOptions(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Why the minimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// `max |g_k|` fell to the gradient tolerance (also before the first step).
    GradientConverged,
    /// The proposed step became negligible relative to the estimate.
    StepConverged,
    /// The iteration cap was reached.
    MaxIterations,
    /// The damped normal equations could not be factorized and the damping
    /// could not be raised further.
    SolveFailed,
}

/// Outcome of one [`minimize_with_report`] run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmReport {
    /// Final objective `½ Σ dᵢ²`.
    pub cost: Real,
    /// Objective at the caller-provided estimate.
    pub initial_cost: Real,
    /// Loop iterations executed.
    pub iterations: usize,
    /// Iterations whose step was accepted.
    pub accepted_steps: usize,
    pub termination: Termination,
    /// Initial cost followed by the cost after every accepted step.
    pub cost_history: Vec<Real>,
    /// Damping factor μ when the loop ended.
    pub final_damping: Real,
}

impl LmReport {
    /// True when the run stopped on a tolerance rather than on the iteration
    /// cap or a failed solve.
    pub fn converged(&self) -> bool {
        matches!(
            self.termination,
            Termination::GradientConverged | Termination::StepConverged
        )
    }
}

/// Normal equations `A = Σ JᵢJᵢᵀ`, `g = Σ Jᵢdᵢ` and cost `½ Σ dᵢ²` at the
/// current estimate.
struct NormalEquations<const D: usize> {
    a: SMatrix<Real, D, D>,
    g: Derivative<D>,
    cost: Real,
}

impl<const D: usize> NormalEquations<D> {
    fn evaluate<F: FitFunctor<D>>(functor: &F) -> Self {
        let mut a = SMatrix::<Real, D, D>::zeros();
        let mut g = Derivative::<D>::zeros();
        let mut sum_sq = 0.0;
        for i in 0..functor.num_points() {
            let d = functor.distance(i);
            if !d.is_finite() {
                // Point mapped to infinity: it counts in the cost but gives no
                // usable direction.
                sum_sq = Real::INFINITY;
                continue;
            }
            let j = functor.distance_derivative(i);
            a.ger(1.0, &j, &j, 1.0);
            g.axpy(d, &j, 1.0);
            sum_sq += d * d;
        }
        Self {
            a,
            g,
            cost: 0.5 * sum_sq,
        }
    }

    /// Solve `(A + μI) h = g` by Cholesky.
    fn solve_damped(&self, mu: Real) -> Option<Derivative<D>> {
        let mut h = self.a;
        for k in 0..D {
            h[(k, k)] += mu;
        }
        let step = h.cholesky()?.solve(&self.g);
        step.iter().all(|v| v.is_finite()).then_some(step)
    }
}

fn cost_only<F: FitFunctor<D>, const D: usize>(functor: &F) -> Real {
    0.5 * (0..functor.num_points())
        .map(|i| {
            let d = functor.distance(i);
            d * d
        })
        .sum::<Real>()
}

/// Minimize with the given options and return the final objective `½ Σ dᵢ²`.
///
/// The functor's estimate is updated in place; read it back with
/// [`FitFunctor::transform`].
pub fn minimize<F: FitFunctor<D>, const D: usize>(functor: &mut F, options: &LmOptions) -> Real {
    minimize_with_report(functor, options).cost
}

/// Minimize with the given options and report how the run ended.
///
/// # Example
///
/// ```
/// use vrcal_core::{synthetic::points, Iso3};
/// use vrcal_optim::{minimize_with_report, FitFunctor, LmOptions, RigidFunctor};
///
/// let source = points::cube_corners(1.0);
/// let target = points::transform_points(&source, &Iso3::translation(0.5, 0.0, -1.0));
///
/// let mut functor = RigidFunctor::new(&source, &target).unwrap();
/// let report = minimize_with_report(&mut functor, &LmOptions::default());
///
/// assert!(report.cost < 1e-10);
/// assert!((functor.transform().translation.vector.x - 0.5).abs() < 1e-6);
/// ```
pub fn minimize_with_report<F: FitFunctor<D>, const D: usize>(
    functor: &mut F,
    options: &LmOptions,
) -> LmReport {
    let mut eq = NormalEquations::evaluate(functor);
    let initial_cost = eq.cost;
    let mut cost_history = vec![initial_cost];

    let max_diag = (0..D).map(|k| eq.a[(k, k)]).fold(0.0, Real::max);
    let mut mu = options.tau * max_diag;
    let mut nu = 2.0;

    let mut iterations = 0;
    let mut accepted_steps = 0;

    let termination = if eq.g.amax() <= options.gradient_tolerance {
        Termination::GradientConverged
    } else {
        let mut termination = Termination::MaxIterations;
        while iterations < options.max_iterations {
            iterations += 1;

            let Some(h) = eq.solve_damped(mu) else {
                if !(mu.is_finite() && mu > 0.0) {
                    termination = Termination::SolveFailed;
                    break;
                }
                // Not positive definite at this damping: treat as a rejected step.
                trace!(
                    "lm iter {}: damped system not positive definite at mu {:.3e}",
                    iterations,
                    mu
                );
                mu *= nu;
                nu *= 2.0;
                continue;
            };

            let threshold = options.step_tolerance * (functor.magnitude() + options.step_tolerance);
            if h.norm() <= threshold {
                termination = Termination::StepConverged;
                break;
            }

            functor.save();
            functor.increment(&h);
            functor.normalize();

            let new_cost = cost_only(functor);
            let predicted = 0.5 * h.dot(&(h * mu + eq.g));
            let rho = (eq.cost - new_cost) / predicted;
            trace!(
                "lm iter {}: mu {:.3e} cost {:.6e} -> {:.6e} rho {:.3}",
                iterations,
                mu,
                eq.cost,
                new_cost,
                rho
            );

            if rho > 0.0 {
                eq = NormalEquations::evaluate(functor);
                // Keep the cost from the trial evaluation so the history is
                // exactly the sequence compared against during acceptance.
                eq.cost = new_cost;
                cost_history.push(new_cost);
                accepted_steps += 1;

                let r = 2.0 * rho - 1.0;
                mu *= (1.0 / 3.0_f64).max(1.0 - r * r * r);
                nu = 2.0;

                if eq.g.amax() <= options.gradient_tolerance {
                    termination = Termination::GradientConverged;
                    break;
                }
            } else {
                functor.restore();
                mu *= nu;
                nu *= 2.0;
            }
        }
        termination
    };

    debug!(
        "lm finished: {:?} after {} iterations ({} accepted), cost {:.6e} -> {:.6e}",
        termination, iterations, accepted_steps, initial_cost, eq.cost
    );

    LmReport {
        cost: eq.cost,
        initial_cost,
        iterations,
        accepted_steps,
        termination,
        cost_history,
        final_damping: mu,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::SVector;

    /// Fits a point `x` to the centroid of a fixed set; the distance is
    /// `‖x − pᵢ‖` so the optimum is the centroid.
    struct CentroidFunctor {
        points: Vec<SVector<Real, 2>>,
        x: SVector<Real, 2>,
        saved: SVector<Real, 2>,
        normalize_calls: usize,
    }

    impl CentroidFunctor {
        fn new(points: Vec<SVector<Real, 2>>, start: SVector<Real, 2>) -> Self {
            Self {
                points,
                x: start,
                saved: start,
                normalize_calls: 0,
            }
        }
    }

    impl FitFunctor<2> for CentroidFunctor {
        type Transform = SVector<Real, 2>;

        fn transform(&self) -> Self::Transform {
            self.x
        }

        fn set_transform(&mut self, transform: Self::Transform) {
            self.x = transform;
        }

        fn num_points(&self) -> usize {
            self.points.len()
        }

        fn distance(&self, index: usize) -> Real {
            (self.x - self.points[index]).norm()
        }

        fn distance_derivative(&self, index: usize) -> Derivative<2> {
            let e = self.x - self.points[index];
            let d = e.norm();
            if d == 0.0 {
                return Derivative::zeros();
            }
            e / d
        }

        fn magnitude(&self) -> Real {
            (self.x.norm_squared() + 1.0).sqrt()
        }

        fn increment(&mut self, delta: &Derivative<2>) {
            self.x -= delta;
        }

        fn normalize(&mut self) {
            self.normalize_calls += 1;
        }

        fn save(&mut self) {
            self.saved = self.x;
        }

        fn restore(&mut self) {
            self.x = self.saved;
        }
    }

    fn square() -> Vec<SVector<Real, 2>> {
        vec![
            SVector::from([0.0, 0.0]),
            SVector::from([2.0, 0.0]),
            SVector::from([2.0, 2.0]),
            SVector::from([0.0, 2.0]),
        ]
    }

    #[test]
    fn default_options_match_reference_constants() {
        let opts = LmOptions::default();
        assert_eq!(opts.tau, 1e-3);
        assert_eq!(opts.gradient_tolerance, 1e-20);
        assert_eq!(opts.step_tolerance, 1e-20);
        assert_eq!(opts.max_iterations, 1000);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn invalid_options_are_rejected() {
        let bad_tau = LmOptions {
            tau: 0.0,
            ..LmOptions::default()
        };
        assert!(bad_tau.validate().is_err());

        let bad_iters = LmOptions {
            max_iterations: 0,
            ..LmOptions::default()
        };
        assert!(bad_iters.validate().is_err());

        let bad_tol = LmOptions {
            step_tolerance: -1.0,
            ..LmOptions::default()
        };
        assert!(bad_tol.validate().is_err());
    }

    #[test]
    fn options_deserialize_partial_json() {
        let opts: LmOptions = serde_json::from_str(r#"{ "max_iterations": 50 }"#).unwrap();
        assert_eq!(opts.max_iterations, 50);
        assert_eq!(opts.tau, 1e-3);
    }

    #[test]
    fn converges_to_centroid() {
        let mut f = CentroidFunctor::new(square(), SVector::from([5.0, -3.0]));
        let report = minimize_with_report(&mut f, &LmOptions::default());

        let x = f.transform();
        assert!((x[0] - 1.0).abs() < 1e-6, "x {}", x);
        assert!((x[1] - 1.0).abs() < 1e-6, "x {}", x);
        assert!(report.converged(), "termination {:?}", report.termination);
        // At the centroid every distance is √2.
        assert!((report.cost - 4.0).abs() < 1e-9, "cost {}", report.cost);
        assert!(report.accepted_steps > 0);
        assert!(f.normalize_calls >= report.accepted_steps);
    }

    #[test]
    fn accepted_costs_never_increase() {
        let mut f = CentroidFunctor::new(square(), SVector::from([40.0, 25.0]));
        let report = minimize_with_report(&mut f, &LmOptions::default());

        assert_eq!(report.cost_history.len(), report.accepted_steps + 1);
        assert_eq!(report.cost_history[0], report.initial_cost);
        for pair in report.cost_history.windows(2) {
            assert!(pair[1] <= pair[0], "cost rose: {} -> {}", pair[0], pair[1]);
        }
        assert_eq!(*report.cost_history.last().unwrap(), report.cost);
    }

    #[test]
    fn stationary_start_terminates_immediately() {
        let start = SVector::from([1.0, 1.0]);
        let mut f = CentroidFunctor::new(square(), start);
        let report = minimize_with_report(&mut f, &LmOptions::default());

        assert_eq!(report.termination, Termination::GradientConverged);
        assert_eq!(report.iterations, 0);
        assert_eq!(f.transform(), start);
        assert_eq!(f.normalize_calls, 0);
    }

    #[test]
    fn iteration_cap_is_reported() {
        let mut f = CentroidFunctor::new(square(), SVector::from([100.0, 100.0]));
        let opts = LmOptions {
            max_iterations: 1,
            ..LmOptions::default()
        };
        let report = minimize_with_report(&mut f, &opts);

        assert_eq!(report.iterations, 1);
        assert_eq!(report.termination, Termination::MaxIterations);
        assert!(!report.converged());
        assert!(report.cost < report.initial_cost);
    }

    #[test]
    fn minimize_returns_report_cost() {
        let mut a = CentroidFunctor::new(square(), SVector::from([3.0, 4.0]));
        let mut b = CentroidFunctor::new(square(), SVector::from([3.0, 4.0]));
        let cost = minimize(&mut a, &LmOptions::default());
        let report = minimize_with_report(&mut b, &LmOptions::default());
        assert_eq!(cost, report.cost);
    }
}
