//! Dimension-list normalization.
//!
//! Contractions and multi-dimension reductions take their dimensions as a
//! sparse list of possibly negative indices. [`dim_list_to_set`] turns such a
//! list into a [`DimSet`] membership set over the tensor's rank, and
//! [`dim_list_to_remaining`] produces the shifted positions needed when the
//! dimensions are eliminated one at a time.

use crate::error::{ContractError, Result};

/// Maximum rank a [`DimSet`] can describe.
pub const MAX_DIMS: usize = 64;

/// Membership set over the dimensions of a tensor of rank at most [`MAX_DIMS`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DimSet {
    bits: u64,
    rank: usize,
}

impl DimSet {
    /// Empty set over a tensor of the given rank.
    pub fn empty(rank: usize) -> Result<Self> {
        if rank > MAX_DIMS {
            return Err(ContractError::TooManyDims {
                rank,
                max: MAX_DIMS,
            });
        }
        Ok(Self { bits: 0, rank })
    }

    /// Rank of the tensor this set ranges over.
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    #[inline]
    pub fn contains(&self, dim: usize) -> bool {
        dim < self.rank && self.bits & (1u64 << dim) != 0
    }

    /// Number of dimensions in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.rank).filter(move |&d| self.contains(d))
    }

    /// Insert `dim`, returning `false` if it was already present.
    fn insert(&mut self, dim: usize) -> bool {
        let mask = 1u64 << dim;
        let fresh = self.bits & mask == 0;
        self.bits |= mask;
        fresh
    }
}

/// Wrap a possibly negative dimension index into `0..rank`.
pub fn wrap_dim(dim: isize, rank: usize) -> Result<usize> {
    let r = rank as isize;
    let wrapped = if dim < 0 { dim + r } else { dim };
    if wrapped < 0 || wrapped >= r {
        return Err(ContractError::DimOutOfRange {
            dim,
            min: -r,
            max: r - 1,
        });
    }
    Ok(wrapped as usize)
}

/// Build the set of dimensions referenced by `dims` over a tensor of `rank`.
///
/// Fails if `rank` exceeds [`MAX_DIMS`], if an index is out of range, or if
/// an index is referenced twice after wrapping.
pub fn dim_list_to_set(dims: &[isize], rank: usize) -> Result<DimSet> {
    let mut seen = DimSet::empty(rank)?;
    for &d in dims {
        let dim = wrap_dim(d, rank)?;
        if !seen.insert(dim) {
            return Err(ContractError::RepeatedDim { dim });
        }
    }
    Ok(seen)
}

/// Positions of `dims` when they are eliminated one after another.
///
/// Entry `i` is the rank of `dims[i]` among the original dimensions that are
/// still present once `dims[..i]` have been removed, i.e. the index to pass
/// to a rank-reducing operation at step `i`.
///
/// ```
/// use tensor_contract::dims::dim_list_to_remaining;
///
/// // Dropping dim 2 first leaves dim 0 at position 0.
/// assert_eq!(dim_list_to_remaining(&[2, 0], 3).unwrap(), vec![2, 0]);
/// // Dropping dim 0 first shifts dim 2 down to position 1.
/// assert_eq!(dim_list_to_remaining(&[0, -1], 3).unwrap(), vec![0, 1]);
/// ```
pub fn dim_list_to_remaining(dims: &[isize], rank: usize) -> Result<Vec<usize>> {
    let mut seen = DimSet::empty(rank)?;
    let mut positions = Vec::with_capacity(dims.len());
    for &d in dims {
        let dim = wrap_dim(d, rank)?;
        if !seen.insert(dim) {
            return Err(ContractError::RepeatedDim { dim });
        }
        // Everything consumed before `dim` has already shifted it left.
        let consumed_below = (0..dim).filter(|&lower| seen.contains(lower)).count();
        positions.push(dim - consumed_below);
    }
    Ok(positions)
}
