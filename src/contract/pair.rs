//! Pairwise contraction planned as a single batched matrix multiply.

use log::debug;

use crate::algebra::Scalar;
use crate::backend::Backend;
use crate::dims::dim_list_to_set;
use crate::error::{ContractError, Result};
use crate::tensor::Tensor;

/// How a dimension of the shared rank takes part in a pairwise contraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DimRole {
    /// Summed away.
    Sum,
    /// Kept, real on both sides (acts as the batch dimension).
    Lro,
    /// Kept, real only on the left.
    Lo,
    /// Kept, real only on the right or on neither side.
    Ro,
}

/// A dimension is real unless it is a size-1 broadcast placeholder.
#[inline]
fn is_real(extent: usize) -> bool {
    extent != 1
}

/// Execution plan for one pairwise contraction, derived from shapes alone.
///
/// Building the plan performs every check, so a plan that exists can only
/// fail at execution if it is handed operands of different shapes.
///
/// # Example
///
/// ```rust
/// use tensor_contract::contract::{DimRole, PairPlan};
///
/// // [2, 3] × [1, 3], summing dim 1: matrix-vector product
/// let plan = PairPlan::new(&[2, 3], &[1, 3], &[1], false).unwrap();
/// assert_eq!(plan.roles(), &[DimRole::Lo, DimRole::Sum]);
/// assert_eq!(plan.output_shape(), vec![2]);
/// ```
#[derive(Clone, Debug)]
pub struct PairPlan {
    left_shape: Vec<usize>,
    right_shape: Vec<usize>,
    roles: Vec<DimRole>,
    /// Sum dimensions real only on the left, reduced before the multiply.
    reduce_left: Vec<usize>,
    /// Sum dimensions real only on the right.
    reduce_right: Vec<usize>,
    sum_dims: Vec<usize>,
    lro_size: usize,
    lo_size: usize,
    sum_size: usize,
    ro_size: usize,
    left_perm: Vec<usize>,
    right_perm: Vec<usize>,
    /// Extents of the multiply result, grouped `[lro, lo, ro]`.
    grouped_shape: Vec<usize>,
    /// Permutation from the grouped result back to ascending dimension order.
    out_perm: Vec<usize>,
    keepdim: bool,
}

impl PairPlan {
    /// Classify every dimension and derive permutations and group sizes.
    pub fn new(
        left_shape: &[usize],
        right_shape: &[usize],
        sum_dims: &[isize],
        keepdim: bool,
    ) -> Result<Self> {
        if left_shape.len() != right_shape.len() {
            return Err(ContractError::RankMismatch {
                expected: left_shape.len(),
                actual: right_shape.len(),
            });
        }

        let rank = left_shape.len();
        let summed = dim_list_to_set(sum_dims, rank)?;

        let mut roles = Vec::with_capacity(rank);
        let (mut lro, mut lo, mut ro) = (Vec::new(), Vec::new(), Vec::new());
        let (mut reduce_left, mut reduce_right) = (Vec::new(), Vec::new());
        let (mut lro_size, mut lo_size, mut ro_size, mut sum_size) = (1, 1, 1, 1);

        for (i, (&l, &r)) in left_shape.iter().zip(right_shape).enumerate() {
            let (sl, sr) = (is_real(l), is_real(r));
            let role = if summed.contains(i) {
                match (sl, sr) {
                    (true, true) if l != r => {
                        return Err(ContractError::SumSizeMismatch {
                            dim: i,
                            left: l,
                            right: r,
                        })
                    }
                    (true, true) => sum_size *= l,
                    (true, false) => reduce_left.push(i),
                    (false, true) => reduce_right.push(i),
                    (false, false) => {}
                }
                DimRole::Sum
            } else if sl && sr {
                if l != r {
                    return Err(ContractError::BroadcastSizeMismatch {
                        dim: i,
                        left: l,
                        right: r,
                    });
                }
                lro.push(i);
                lro_size *= l;
                DimRole::Lro
            } else if sl {
                lo.push(i);
                lo_size *= l;
                DimRole::Lo
            } else {
                ro.push(i);
                ro_size *= r;
                DimRole::Ro
            };
            roles.push(role);
        }

        let sum_dims: Vec<usize> = summed.iter().collect();
        let left_perm = [lro.as_slice(), lo.as_slice(), sum_dims.as_slice(), ro.as_slice()].concat();
        let right_perm = [lro.as_slice(), sum_dims.as_slice(), ro.as_slice(), lo.as_slice()].concat();

        let grouped = [lro.as_slice(), lo.as_slice(), ro.as_slice()].concat();
        let grouped_shape = grouped
            .iter()
            .map(|&d| match roles[d] {
                DimRole::Ro => right_shape[d],
                _ => left_shape[d],
            })
            .collect();
        let out_perm = (0..rank)
            .filter(|&d| !summed.contains(d))
            .filter_map(|d| grouped.iter().position(|&g| g == d))
            .collect();

        debug!(
            "pair plan {:?} x {:?}: roles {:?}, [lro={}, lo={}, sum={}, ro={}]",
            left_shape, right_shape, roles, lro_size, lo_size, sum_size, ro_size
        );

        Ok(Self {
            left_shape: left_shape.to_vec(),
            right_shape: right_shape.to_vec(),
            roles,
            reduce_left,
            reduce_right,
            sum_dims,
            lro_size,
            lo_size,
            sum_size,
            ro_size,
            left_perm,
            right_perm,
            grouped_shape,
            out_perm,
            keepdim,
        })
    }

    /// Role of each dimension, in dimension order.
    pub fn roles(&self) -> &[DimRole] {
        &self.roles
    }

    /// Shape of the contraction result.
    pub fn output_shape(&self) -> Vec<usize> {
        let mut shape: Vec<usize> = self.out_perm.iter().map(|&p| self.grouped_shape[p]).collect();
        if self.keepdim {
            for &d in &self.sum_dims {
                shape.insert(d, 1);
            }
        }
        shape
    }

    /// Run the plan on operands whose shapes match the planned ones.
    pub fn execute<T: Scalar, B: Backend>(
        &self,
        left: &Tensor<T, B>,
        right: &Tensor<T, B>,
    ) -> Result<Tensor<T, B>> {
        if left.shape() != self.left_shape.as_slice() || right.shape() != self.right_shape.as_slice()
        {
            return Err(ContractError::ShapeMismatch {
                op: "sumproduct_pair",
                lhs: left.shape().to_vec(),
                rhs: right.shape().to_vec(),
            });
        }

        if self.sum_dims.is_empty() {
            return left.mul(right);
        }

        let mut left = left.clone();
        for &d in &self.reduce_left {
            left = left.sum_dim(d, true);
        }
        let mut right = right.clone();
        for &d in &self.reduce_right {
            right = right.sum_dim(d, true);
        }

        let left = left
            .permute(&self.left_perm)
            .reshape(&[self.lro_size, self.lo_size, self.sum_size]);
        let right = right
            .permute(&self.right_perm)
            .reshape(&[self.lro_size, self.sum_size, self.ro_size]);

        let mut result = left
            .bmm(&right)?
            .reshape(&self.grouped_shape)
            .permute(&self.out_perm);

        if self.keepdim {
            for &d in &self.sum_dims {
                result = result.unsqueeze(d);
            }
        }
        Ok(result)
    }
}

/// Multiply `left` and `right` elementwise and sum over `sum_dims`.
///
/// Both operands must have the same rank; a size-1 dimension broadcasts
/// against the other side. Kept dimensions appear in their original order.
/// With `keepdim`, every summed dimension stays as extent 1 so the result has
/// the operands' rank. An empty `sum_dims` is a plain broadcasting product.
///
/// # Example
///
/// ```rust
/// use tensor_contract::{sumproduct_pair, Cpu, Tensor};
///
/// let a = Tensor::<f64, Cpu>::from_data(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3, 1]);
/// let b = Tensor::<f64, Cpu>::from_data(&[1.0, 0.0, 0.0, 1.0, 1.0, 1.0], &[1, 3, 2]);
///
/// // C[i, k] = Σ_j A[i, j] × B[j, k]
/// let c = sumproduct_pair(&a, &b, &[1], false).unwrap();
/// assert_eq!(c.shape(), &[2, 2]);
/// assert_eq!(c.to_vec(), vec![4.0, 5.0, 10.0, 11.0]);
/// ```
pub fn sumproduct_pair<T: Scalar, B: Backend>(
    left: &Tensor<T, B>,
    right: &Tensor<T, B>,
    sum_dims: &[isize],
    keepdim: bool,
) -> Result<Tensor<T, B>> {
    if sum_dims.is_empty() {
        if left.ndim() != right.ndim() {
            return Err(ContractError::RankMismatch {
                expected: left.ndim(),
                actual: right.ndim(),
            });
        }
        return left.mul(right);
    }
    PairPlan::new(left.shape(), right.shape(), sum_dims, keepdim)?.execute(left, right)
}
