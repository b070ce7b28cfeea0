//! Deterministic synthetic data generation helpers.
//!
//! Building blocks for constructing synthetic fitting problems used in tests
//! and examples:
//! - fixed point layouts (cube corners, 3D grids) and seeded random clouds,
//! - mapping a point set through any [`crate::PointTransform`],
//! - seeded isotropic Gaussian noise.
//!
//! All helpers are deterministic (explicit seeds; stable point ordering).
//!
//! # Example
//!
//! ```
//! use vrcal_core::{synthetic::{noise, points}, Iso3};
//!
//! let source = points::grid_points_3d(3, 3, 2, 0.5);
//! let truth = Iso3::translation(5.0, 0.0, 0.0);
//! let clean = points::transform_points(&source, &truth);
//! let noisy = noise::add_gaussian_noise(&clean, 1e-4, 7).unwrap();
//! assert_eq!(noisy.len(), 18);
//! ```

pub mod noise;
pub mod points;
