//! Synthetic point layouts.

use crate::{PointPairs, PointTransform, Pt3, Real};
use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// The 8 corners of an axis-aligned cube of edge `size` with one corner at the origin.
pub fn cube_corners(size: Real) -> Vec<Pt3> {
    grid_points_3d(2, 2, 2, size)
}

/// Generate a regular 3D grid with `nx * ny * nz` points.
///
/// Points are ordered deterministically with x varying fastest, then y, then z.
pub fn grid_points_3d(nx: usize, ny: usize, nz: usize, spacing: Real) -> Vec<Pt3> {
    let mut points = Vec::with_capacity(nx.saturating_mul(ny).saturating_mul(nz));
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                points.push(Pt3::new(
                    i as Real * spacing,
                    j as Real * spacing,
                    k as Real * spacing,
                ));
            }
        }
    }
    points
}

/// `n` points drawn uniformly from the cube `[-half_extent, half_extent]³`.
pub fn random_points(n: usize, half_extent: Real, seed: u64) -> Vec<Pt3> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            Pt3::new(
                rng.random_range(-half_extent..=half_extent),
                rng.random_range(-half_extent..=half_extent),
                rng.random_range(-half_extent..=half_extent),
            )
        })
        .collect()
}

/// `n` points evenly spaced on the segment from `start` to `end` (inclusive).
pub fn collinear_points(n: usize, start: Pt3, end: Pt3) -> Vec<Pt3> {
    if n <= 1 {
        return vec![start; n];
    }
    (0..n)
        .map(|i| start + (end - start) * (i as Real / (n - 1) as Real))
        .collect()
}

/// Map every point through `transform`.
pub fn transform_points<T: PointTransform>(points: &[Pt3], transform: &T) -> Vec<Pt3> {
    points.iter().map(|p| transform.apply(p)).collect()
}

/// Exact pair set `target[i] = T(source[i])`.
pub fn pairs_from_transform<T: PointTransform>(
    source: &[Pt3],
    transform: &T,
) -> Result<PointPairs> {
    PointPairs::new(source.to_vec(), transform_points(source, transform))
}
