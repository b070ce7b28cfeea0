//! Seeded measurement noise.

use crate::{Pt3, Real, Vec3};
use anyhow::{ensure, Result};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Perturb each coordinate with independent `N(0, sigma²)` noise.
///
/// # Errors
///
/// Returns an error if `sigma` is negative or not finite.
pub fn add_gaussian_noise(points: &[Pt3], sigma: Real, seed: u64) -> Result<Vec<Pt3>> {
    ensure!(
        sigma.is_finite() && sigma >= 0.0,
        "noise sigma must be finite and non-negative, got {}",
        sigma
    );
    let normal = Normal::new(0.0, sigma)?;
    let mut rng = StdRng::seed_from_u64(seed);

    Ok(points
        .iter()
        .map(|p| {
            let n = Vec3::new(
                normal.sample(&mut rng),
                normal.sample(&mut rng),
                normal.sample(&mut rng),
            );
            p + n
        })
        .collect())
}
