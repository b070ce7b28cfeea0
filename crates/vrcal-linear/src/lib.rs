//! Closed-form initial transforms between matched 3D point sets.
//!
//! These solvers give the Levenberg–Marquardt refinement in `vrcal-optim` a
//! starting point close to the optimum:
//! - [`rigid_from_correspondences`]: Kabsch/Horn absolute orientation,
//! - [`scaled_rigid_from_correspondences`]: absolute orientation plus x/y scale,
//! - [`projective_from_correspondences`]: normalized 3D DLT.

pub mod math;
mod projective;
mod rigid;

pub use projective::*;
pub use rigid::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinearError {
    #[error("need at least {required} point correspondences, got {got}")]
    NotEnoughPoints { required: usize, got: usize },
    #[error("source / target point counts differ: {source_len} vs {target_len}")]
    LengthMismatch {
        source_len: usize,
        target_len: usize,
    },
    #[error("degenerate point configuration: {0}")]
    Degenerate(&'static str),
    #[error("svd failed")]
    SvdFailed,
}

fn check_counts(
    source: &[vrcal_core::Pt3],
    target: &[vrcal_core::Pt3],
    required: usize,
) -> Result<(), LinearError> {
    if source.len() != target.len() {
        return Err(LinearError::LengthMismatch {
            source_len: source.len(),
            target_len: target.len(),
        });
    }
    if source.len() < required {
        return Err(LinearError::NotEnoughPoints {
            required,
            got: source.len(),
        });
    }
    Ok(())
}
