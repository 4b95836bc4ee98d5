//! Error types for contraction operations.

use thiserror::Error;

/// Errors raised while planning or executing a contraction.
///
/// Every variant aborts the call that produced it; no partial result is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// Operands that must share a rank do not.
    #[error("number of dimensions must match: expected {expected}, got {actual}")]
    RankMismatch { expected: usize, actual: usize },

    /// A dimension index appears twice after wrapping negative indices.
    #[error("dim {dim} appears multiple times in the list of dims")]
    RepeatedDim { dim: usize },

    /// A dimension index lies outside `[-rank, rank)`.
    #[error("dimension out of range (expected to be in range of [{min}, {max}], but got {dim})")]
    DimOutOfRange { dim: isize, min: isize, max: isize },

    /// Dimension sets only cover tensors up to a fixed rank.
    #[error("tensor dimension must be <= {max} for multiple dims, got {rank}")]
    TooManyDims { rank: usize, max: usize },

    /// A summed dimension is real on both sides but the extents differ.
    #[error("sum indexes must match at dim {dim}: {left} vs {right}")]
    SumSizeMismatch { dim: usize, left: usize, right: usize },

    /// A kept dimension is real on both sides but the extents differ.
    #[error("non-broadcast dimensions must match at dim {dim}: {left} vs {right}")]
    BroadcastSizeMismatch { dim: usize, left: usize, right: usize },

    /// Input, weight or bias shapes of a bilinear layer disagree.
    #[error("bilinear(): {0}")]
    BilinearShape(String),

    /// Operand shapes are incompatible for an elementwise or matrix operation.
    #[error("shape mismatch in {op}: {lhs:?} vs {rhs:?}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Vec<usize>,
        rhs: Vec<usize>,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ContractError>;
