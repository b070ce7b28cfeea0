//! Levenberg–Marquardt fitting of transforms between matched 3D point sets.
//!
//! The minimizer in [`lm`] works on any [`FitFunctor`]: a problem object that
//! borrows the point sets, owns the transform estimate and exposes per-pair
//! distances with their closed-form derivatives. Three functors are provided:
//! - [`RigidFunctor`] (7 parameters: translation + quaternion),
//! - [`ScaledRigidFunctor`] (9 parameters: rigid + x/y scale),
//! - [`ProjectiveFunctor`] (16 parameters: 4×4 matrix).
//!
//! [`fit`] wraps seeding, minimization and restarts into single calls.

mod error;
pub mod fit;
pub mod functors;
pub mod lm;
mod traits;

pub use error::FitError;
pub use fit::{fit_projective, fit_rigid, fit_scaled_rigid, FitOptions, FitReport, InitStrategy};
pub use functors::{ProjectiveFunctor, RigidFunctor, ScaledRigidFunctor};
pub use lm::{minimize, minimize_with_report, LmOptions, LmReport, Termination};
pub use traits::{Derivative, FitFunctor};
