use thiserror::Error;

#[derive(Debug, Error)]
pub enum FitError {
    #[error("need at least one point pair")]
    EmptyPointSet,
    #[error("source / target point counts differ: {source_len} vs {target_len}")]
    LengthMismatch {
        source_len: usize,
        target_len: usize,
    },
    #[error("invalid minimizer options: {0}")]
    InvalidOptions(String),
}

pub(crate) fn check_point_sets<P>(source: &[P], target: &[P]) -> Result<(), FitError> {
    if source.len() != target.len() {
        return Err(FitError::LengthMismatch {
            source_len: source.len(),
            target_len: target.len(),
        });
    }
    if source.is_empty() {
        return Err(FitError::EmptyPointSet);
    }
    Ok(())
}
