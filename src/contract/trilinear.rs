//! Three-operand contraction driven by two pairwise contractions.

use log::{debug, trace};

use super::pair::sumproduct_pair;
use crate::algebra::Scalar;
use crate::backend::Backend;
use crate::dims::{dim_list_to_set, DimSet};
use crate::error::{ContractError, Result};
use crate::tensor::Tensor;

/// Dimension iterated explicitly unless configured otherwise.
pub const DEFAULT_UNROLL_DIM: usize = 1;

/// Configuration of a trilinear contraction.
///
/// Each operand is unsqueezed at the positions of its expand list so that
/// all three share one total rank. The product of the three is then summed
/// over `sum_dims`. The first pairwise contraction (`i1 × i2`) sums the
/// dimensions absent from `i3`; the second (`buf × i3`) sums the rest. The
/// unroll dimension is excluded from both and handled one index at a time.
///
/// # Example
///
/// ```rust
/// use tensor_contract::{Cpu, Tensor, Trilinear};
///
/// // out[b, o] = Σ_{i,j} x[b, i] w[o, i, j] y[b, j]
/// let x = Tensor::<f64, Cpu>::from_data(&[1.0, 2.0], &[1, 2]);
/// let w = Tensor::<f64, Cpu>::from_data(&[1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0], &[2, 2, 2]);
/// let y = Tensor::<f64, Cpu>::from_data(&[3.0, 4.0], &[1, 2]);
///
/// let out = Trilinear::new(&[1, 3], &[0], &[1, 2], &[2, 3])
///     .unroll_dim(1)
///     .execute(&x, &w, &y)
///     .unwrap();
/// assert_eq!(out.shape(), &[1, 2]);
/// assert_eq!(out.to_vec(), vec![11.0, 10.0]);
/// ```
#[derive(Clone, Debug)]
pub struct Trilinear {
    expand: [Vec<isize>; 3],
    sum_dims: Vec<isize>,
    unroll_dim: usize,
}

impl Trilinear {
    /// Create a contraction with the default unroll dimension.
    pub fn new(expand1: &[isize], expand2: &[isize], expand3: &[isize], sum_dims: &[isize]) -> Self {
        Self {
            expand: [expand1.to_vec(), expand2.to_vec(), expand3.to_vec()],
            sum_dims: sum_dims.to_vec(),
            unroll_dim: DEFAULT_UNROLL_DIM,
        }
    }

    /// Set the dimension iterated explicitly.
    ///
    /// A dimension beyond the total rank disables unrolling.
    pub fn unroll_dim(mut self, dim: usize) -> Self {
        self.unroll_dim = dim;
        self
    }

    /// Contract the three operands.
    pub fn execute<T: Scalar, B: Backend>(
        &self,
        i1: &Tensor<T, B>,
        i2: &Tensor<T, B>,
        i3: &Tensor<T, B>,
    ) -> Result<Tensor<T, B>> {
        let total = i1.ndim() + self.expand[0].len();
        let summed = dim_list_to_set(&self.sum_dims, total)?;

        let (i1, _) = expand_operand(i1, &self.expand[0], total)?;
        let (i2, _) = expand_operand(i2, &self.expand[1], total)?;
        let (i3, expanded3) = expand_operand(i3, &self.expand[2], total)?;

        let extents = common_extents([i1.shape(), i2.shape(), i3.shape()])?;
        let output_shape: Vec<usize> = (0..total)
            .filter(|&d| !summed.contains(d))
            .map(|d| extents[d])
            .collect();

        let (mut sum_12, mut sum_23) = (Vec::new(), Vec::new());
        for d in summed.iter().filter(|&d| d != self.unroll_dim) {
            if expanded3.contains(d) {
                sum_12.push(d as isize);
            } else {
                sum_23.push(d as isize);
            }
        }

        debug!(
            "trilinear rank {}: output {:?}, first pair sums {:?}, second pair sums {:?}",
            total, output_shape, sum_12, sum_23
        );

        let contract = |a: &Tensor<T, B>, b: &Tensor<T, B>, c: &Tensor<T, B>| -> Result<Tensor<T, B>> {
            let buf = sumproduct_pair(a, b, &sum_12, true)?;
            sumproduct_pair(&buf, c, &sum_23, true)
        };

        let mut output = Tensor::zeros_with_backend(&output_shape, i1.backend().clone());

        if self.unroll_dim >= total {
            let buf = contract(&i1, &i2, &i3)?;
            output.add_(&buf.reshape(&output_shape))?;
            return Ok(output);
        }

        let u_dim = self.unroll_dim;
        let unroll_size = extents[u_dim];
        let unroll_summed = summed.contains(u_dim);
        // Position of the unroll dimension once summed dimensions are dropped
        let out_dim = (0..u_dim).filter(|&d| !summed.contains(d)).count();
        let mut slice_shape = output_shape.clone();
        if !unroll_summed {
            slice_shape[out_dim] = 1;
        }

        let at = |t: &Tensor<T, B>, u: usize| {
            if t.shape()[u_dim] == 1 {
                t.clone()
            } else {
                t.narrow(u_dim, u, 1)
            }
        };

        for u in 0..unroll_size {
            trace!("trilinear unroll dim {} index {}/{}", u_dim, u, unroll_size);

            let buf = contract(&at(&i1, u), &at(&i2, u), &at(&i3, u))?.reshape(&slice_shape);
            if unroll_summed {
                output.add_(&buf)?;
            } else {
                output.slice_add_(out_dim, u, &buf)?;
            }
        }

        Ok(output)
    }
}

/// Unsqueeze `tensor` at every position of `expand`, in ascending order.
fn expand_operand<T: Scalar, B: Backend>(
    tensor: &Tensor<T, B>,
    expand: &[isize],
    total: usize,
) -> Result<(Tensor<T, B>, DimSet)> {
    let actual = tensor.ndim() + expand.len();
    if actual != total {
        return Err(ContractError::RankMismatch {
            expected: total,
            actual,
        });
    }

    let expanded = dim_list_to_set(expand, total)?;
    let tensor = expanded
        .iter()
        .fold(tensor.clone(), |t, d| t.unsqueeze(d));
    Ok((tensor, expanded))
}

/// Extent of every position across the operands, treating 1 as a broadcast.
fn common_extents(shapes: [&[usize]; 3]) -> Result<Vec<usize>> {
    let total = shapes[0].len();
    let mut extents = vec![1; total];
    for (d, extent) in extents.iter_mut().enumerate() {
        for shape in shapes {
            let n = shape[d];
            if n == 1 {
                continue;
            }
            if *extent != 1 && *extent != n {
                return Err(ContractError::BroadcastSizeMismatch {
                    dim: d,
                    left: *extent,
                    right: n,
                });
            }
            *extent = n;
        }
    }
    Ok(extents)
}

/// Contract three operands with the default unroll dimension.
///
/// See [`Trilinear`] for the meaning of the arguments.
pub fn trilinear<T: Scalar, B: Backend>(
    i1: &Tensor<T, B>,
    i2: &Tensor<T, B>,
    i3: &Tensor<T, B>,
    expand1: &[isize],
    expand2: &[isize],
    expand3: &[isize],
    sum_dims: &[isize],
) -> Result<Tensor<T, B>> {
    Trilinear::new(expand1, expand2, expand3, sum_dims).execute(i1, i2, i3)
}
