use nalgebra::SVector;
use vrcal_core::Real;

/// Gradient of one point-to-point distance with respect to the `D` parameters.
pub type Derivative<const D: usize> = SVector<Real, D>;

/// A point-set fitting problem the Levenberg–Marquardt minimizer can drive.
///
/// The functor owns a transform estimate with `D` raw parameters and borrows
/// two matched point slices. The minimizer only sees distances, their
/// derivatives and the operations that move the estimate around.
///
/// `increment` **subtracts** its argument: the minimizer passes the solution
/// `h` of `(A + μI) h = g`, and the Gauss–Newton step is `−h`.
pub trait FitFunctor<const D: usize> {
    /// The transform family being fitted.
    type Transform;

    /// Snapshot of the current estimate.
    fn transform(&self) -> Self::Transform;

    /// Overwrite the current estimate, e.g. with an initial guess.
    fn set_transform(&mut self, transform: Self::Transform);

    /// Number of point pairs in the residual set.
    fn num_points(&self) -> usize;

    /// `‖T(source[index]) − target[index]‖` under the current estimate.
    fn distance(&self, index: usize) -> Real;

    /// Gradient of [`FitFunctor::distance`]; zero where the distance is exactly zero.
    fn distance_derivative(&self, index: usize) -> Derivative<D>;

    /// Strictly positive scale of the estimate, used by the step-size test.
    fn magnitude(&self) -> Real;

    /// Subtract `delta` from the raw parameters and rebuild the estimate.
    fn increment(&mut self, delta: &Derivative<D>);

    /// Project the raw parameters back onto the transform family. Idempotent.
    fn normalize(&mut self);

    /// Remember the current estimate.
    fn save(&mut self);

    /// Roll back to the estimate stored by the last [`FitFunctor::save`].
    fn restore(&mut self);
}
