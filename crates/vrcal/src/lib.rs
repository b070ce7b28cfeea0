//! High-level entry crate for the `vrcal` point-set fitting toolbox.
//!
//! `vrcal` estimates the transform between two matched sets of 3D points,
//! e.g. tracker-space positions and their surveyed world positions. Three
//! transform families are supported: rigid, rigid with x/y scale, and
//! general projective.
//!
//! ## 1. One-call fitting
//!
//! ```
//! use vrcal::prelude::*;
//!
//! let source = vrcal::core::synthetic::points::grid_points_3d(3, 3, 2, 0.5);
//! let target: Vec<Pt3> = source.iter().map(|p| Pt3::new(p.x + 1.0, p.y, p.z)).collect();
//!
//! let report = fit_rigid(&source, &target, &FitOptions::default()).unwrap();
//! assert!(report.stats.rms < 1e-8);
//! ```
//!
//! ## 2. Driving the minimizer directly
//!
//! Build a functor over the two point slices, optionally seed it, minimize
//! and read the estimate back:
//!
//! ```
//! use vrcal::prelude::*;
//!
//! let source = vrcal::core::synthetic::points::cube_corners(1.0);
//! let target: Vec<Pt3> = source.iter().map(|p| Pt3::new(-p.y, p.x, p.z)).collect();
//!
//! let mut functor = RigidFunctor::new(&source, &target).unwrap();
//! if let Ok(seed) = vrcal::linear::rigid_from_correspondences(&source, &target) {
//!     functor.set_transform(seed);
//! }
//! let cost = minimize(&mut functor, &LmOptions::default());
//! assert!(cost < 1e-10);
//! ```
//!
//! ## Module Organization
//!
//! - **[`core`]**: Math aliases, transform families, point pairs, synthetic data
//! - **[`linear`]**: Closed-form initial transforms
//! - **[`optim`]**: Functors, Levenberg–Marquardt minimizer, fit helpers
//! - **[`prelude`]**: Convenient re-exports for common use cases

/// Core math types, transform families and point-pair utilities.
pub mod core {
    pub use vrcal_core::*;
}

/// Closed-form initialization (absolute orientation, 3D DLT).
pub mod linear {
    pub use vrcal_linear::*;
}

/// Levenberg–Marquardt fitting of point-to-point transforms.
pub mod optim {
    pub use vrcal_optim::*;
}

/// Import with `use vrcal::prelude::*;` to get started quickly.
pub mod prelude {
    pub use crate::core::{
        DistanceStats, Iso3, PointPairs, PointTransform, Proj3, Pt3, Rot3, ScaledRigid, Vec2,
        Vec3,
    };

    pub use crate::optim::{
        fit_projective, fit_rigid, fit_scaled_rigid, minimize, minimize_with_report, FitFunctor,
        FitOptions, FitReport, InitStrategy, LmOptions, LmReport, ProjectiveFunctor,
        RigidFunctor, ScaledRigidFunctor, Termination,
    };
}
