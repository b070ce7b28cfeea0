//! Matched source/target point sets.
//!
//! [`PointPairs`] is the owned, serializable form of a fitting problem's
//! residual set. Functors borrow its two vectors for their whole lifetime.

use crate::{PointTransform, Pt3};
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Matched point pairs: `source[i]` should map onto `target[i]`.
///
/// # Example
///
/// ```
/// use vrcal_core::{PointPairs, Pt3};
///
/// let source = vec![Pt3::new(0.0, 0.0, 0.0), Pt3::new(1.0, 0.0, 0.0)];
/// let target = vec![Pt3::new(5.0, 0.0, 0.0), Pt3::new(5.0, 1.0, 0.0)];
/// let pairs = PointPairs::new(source, target).unwrap();
///
/// assert_eq!(pairs.len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointPairs {
    /// Points in the source frame (e.g. tracker space).
    pub source: Vec<Pt3>,
    /// Matching points in the target frame (e.g. surveyed world space).
    pub target: Vec<Pt3>,
}

impl PointPairs {
    /// Build a pair set.
    ///
    /// # Errors
    ///
    /// Returns an error if the sets are empty or their lengths differ.
    pub fn new(source: Vec<Pt3>, target: Vec<Pt3>) -> Result<Self> {
        let pairs = Self { source, target };
        pairs.validate()?;
        Ok(pairs)
    }

    /// Check the invariants of a deserialized pair set.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.source.len() == self.target.len(),
            "source / target point counts must match: {} vs {}",
            self.source.len(),
            self.target.len()
        );
        ensure!(!self.source.is_empty(), "need at least one point pair");
        ensure!(
            self.source
                .iter()
                .chain(self.target.iter())
                .all(|p| p.coords.iter().all(|c| c.is_finite())),
            "point coordinates must be finite"
        );
        Ok(())
    }

    /// Number of point pairs.
    #[inline]
    pub fn len(&self) -> usize {
        self.source.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Per-pair distances `‖T(source[i]) − target[i]‖`.
    pub fn distances<T: PointTransform>(&self, transform: &T) -> Vec<f64> {
        residual_distances(&self.source, &self.target, transform)
    }
}

/// Per-pair distances `‖T(source[i]) − target[i]‖` over two matched slices.
pub fn residual_distances<T: PointTransform>(
    source: &[Pt3],
    target: &[Pt3],
    transform: &T,
) -> Vec<f64> {
    source
        .iter()
        .zip(target.iter())
        .map(|(s, t)| (transform.apply(s) - t).norm())
        .collect()
}

/// How far a fitted transform leaves each source point from its target.
///
/// `rms` relates to the minimizer's objective by `½ · count · rms² = F`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DistanceStats {
    pub mean: f64,
    pub rms: f64,
    /// Worst single pair.
    pub max: f64,
    pub count: usize,
}

impl DistanceStats {
    /// Summarize per-pair distances; an empty slice gives all zeros.
    pub fn from_distances(distances: &[f64]) -> Self {
        if distances.is_empty() {
            return Self {
                mean: 0.0,
                rms: 0.0,
                max: 0.0,
                count: 0,
            };
        }

        let sum: f64 = distances.iter().sum();
        let sum_sq: f64 = distances.iter().map(|d| d * d).sum();
        let max = distances.iter().cloned().fold(0.0_f64, f64::max);
        let n = distances.len() as f64;

        Self {
            mean: sum / n,
            rms: (sum_sq / n).sqrt(),
            max,
            count: distances.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Iso3, Rot3, Vec3};
    use nalgebra::Translation3;

    fn square() -> Vec<Pt3> {
        vec![
            Pt3::new(0.0, 0.0, 0.0),
            Pt3::new(1.0, 0.0, 0.0),
            Pt3::new(1.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn point_pairs_rejects_mismatch() {
        let mut target = square();
        target.pop();
        assert!(PointPairs::new(square(), target).is_err());
    }

    #[test]
    fn point_pairs_rejects_empty() {
        assert!(PointPairs::new(Vec::new(), Vec::new()).is_err());
    }

    #[test]
    fn point_pairs_rejects_non_finite() {
        let mut target = square();
        target[1].y = f64::NAN;
        assert!(PointPairs::new(square(), target).is_err());
    }

    #[test]
    fn distances_under_translation() {
        let source = square();
        let target: Vec<Pt3> = source.iter().map(|p| p + Vec3::x()).collect();
        let pairs = PointPairs::new(source, target).unwrap();

        let identity = pairs.distances(&Iso3::identity());
        assert!(identity.iter().all(|d| (d - 1.0).abs() < 1e-12));

        let shift = Iso3::from_parts(Translation3::new(1.0, 0.0, 0.0), Rot3::identity());
        assert!(pairs.distances(&shift).iter().all(|d| d.abs() < 1e-12));
    }

    #[test]
    fn distance_stats_empty() {
        let stats = DistanceStats::from_distances(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, 0.0);
    }

    #[test]
    fn distance_stats_computation() {
        let stats = DistanceStats::from_distances(&[1.0, 2.0, 3.0]);

        assert_eq!(stats.count, 3);
        assert!((stats.mean - 2.0).abs() < 1e-10);
        assert!((stats.rms - (14.0_f64 / 3.0).sqrt()).abs() < 1e-10);
        assert!((stats.max - 3.0).abs() < 1e-10);
    }

    #[test]
    fn point_pairs_serde_roundtrip() {
        let pairs = PointPairs::new(square(), square()).unwrap();

        let json = serde_json::to_string(&pairs).unwrap();
        let restored: PointPairs = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.len(), pairs.len());
        assert_eq!(restored.target[2], pairs.target[2]);
    }
}
