//! Core math and data primitives for `vrcal`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Pt3`, `Iso3`, ...),
//! - the three fitted transform families and the [`PointTransform`] trait,
//! - matched point-pair sets and residual statistics,
//! - deterministic synthetic data for tests and examples.

/// Linear algebra type aliases and helpers.
pub mod math;
/// Matched point sets and distance statistics.
pub mod pairs;
/// Synthetic point clouds and noise.
pub mod synthetic;
/// Rigid, scaled-rigid and projective transforms.
pub mod transform;

pub use math::*;
pub use pairs::*;
pub use transform::*;
